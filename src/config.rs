use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use url::Url;

use crate::error::AppError;

#[derive(Parser, Debug, Clone)]
#[command(name = "stagescout", about = "Internship and job listing scraper")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://data/offres.db")]
    pub database_url: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP API (default when no subcommand given)
    Serve {
        /// Listen address
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
        listen_addr: String,

        /// Per-request timeout in seconds for scrapes and email discovery
        #[arg(long, env = "REQUEST_TIMEOUT", default_value = "10")]
        timeout_secs: u64,
    },
    /// Scrape one source and store the new listings
    Scrape {
        /// Source adapter name (hellowork, indeed)
        #[arg(long, default_value = "hellowork")]
        source: String,

        /// Search URL with the desired filters already applied
        #[arg(long)]
        base_url: String,

        #[command(flatten)]
        session: SessionArgs,
    },
    /// Discover likely contact emails for an employer
    Emails {
        /// Employer name
        #[arg(long)]
        entreprise: String,

        /// Employer website root
        #[arg(long)]
        site: Option<String>,

        /// Write the ranked emails to this file, one per line
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Export stored offers as CSV
    Export {
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        filters: crate::query::FilterCriteria,

        /// Sort key (date, entreprise, titre, domaine, ville, type_contrat, remuneration)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, default_value = "false")]
        desc: bool,
    },
    /// Print summary statistics of the stored offers as JSON
    Stats,
    /// Delete offers added more than N days ago
    Purge {
        #[arg(long, default_value = "90")]
        older_than_days: i64,
    },
}

/// Pagination and politeness knobs supplied by whoever launches a session.
#[derive(clap::Args, Debug, Clone)]
pub struct SessionArgs {
    /// Maximum number of pages to fetch
    #[arg(long, env = "MAX_PAGES", default_value = "5")]
    pub max_pages: u32,

    /// Lower bound of the delay between two page fetches, in milliseconds
    #[arg(long, env = "DELAY_MIN_MS", default_value = "1000")]
    pub delay_min_ms: u64,

    /// Upper bound of the delay between two page fetches, in milliseconds
    #[arg(long, env = "DELAY_MAX_MS", default_value = "3000")]
    pub delay_max_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "10")]
    pub timeout_secs: u64,

    #[command(flatten)]
    pub defaults: ListingDefaults,
}

/// Values stored for a listing whose page does not show the field, such as
/// the domain of a search that was already narrowed to one sector.
#[derive(clap::Args, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ListingDefaults {
    /// Domain recorded for listings of this session
    #[arg(long = "default-domaine")]
    pub domaine: Option<String>,

    /// Contract type recorded when a listing shows none
    #[arg(long = "default-type-contrat")]
    pub type_contrat: Option<String>,

    /// City recorded when a listing shows no location
    #[arg(long = "default-ville")]
    pub ville: Option<String>,

    /// Department recorded when a listing shows none
    #[arg(long = "default-departement")]
    pub departement: Option<String>,
}

impl ListingDefaults {
    /// Trimmed copy with blank values dropped.
    fn cleaned(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            domaine: clean(self.domaine),
            type_contrat: clean(self.type_contrat),
            ville: clean(self.ville),
            departement: clean(self.departement),
        }
    }
}

impl Config {
    /// Resolve the command, defaulting to Serve if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or_else(|| Command::Serve {
            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            timeout_secs: std::env::var("REQUEST_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayBounds {
    pub min: Duration,
    pub max: Duration,
}

impl DelayBounds {
    #[cfg(test)]
    pub const NONE: DelayBounds = DelayBounds {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub fn new(min: Duration, max: Duration) -> Result<Self, AppError> {
        if min > max {
            return Err(AppError::InvalidInput(format!(
                "delay lower bound {min:?} exceeds upper bound {max:?}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Pick a delay uniformly within the bounds.
    pub fn sample(&self) -> Duration {
        use rand::Rng;
        if self.min == self.max {
            return self.min;
        }
        let (lo, hi) = (self.min.as_millis() as u64, self.max.as_millis() as u64);
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

/// Validated configuration for one scraping session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    pub max_pages: u32,
    pub delay: DelayBounds,
    pub request_timeout: Duration,
    pub defaults: ListingDefaults,
}

impl SessionConfig {
    pub fn new(
        base_url: &str,
        max_pages: u32,
        delay: DelayBounds,
        request_timeout: Duration,
    ) -> Result<Self, AppError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(AppError::InvalidInput("base URL is empty".to_string()));
        }
        let parsed = Url::parse(base_url)
            .map_err(|e| AppError::InvalidInput(format!("invalid base URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::InvalidInput(format!(
                "base URL must be http(s), got '{}'",
                parsed.scheme()
            )));
        }
        if max_pages == 0 {
            return Err(AppError::InvalidInput(
                "max pages must be at least 1".to_string(),
            ));
        }
        if request_timeout.is_zero() {
            return Err(AppError::InvalidInput(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            max_pages,
            delay,
            request_timeout,
            defaults: ListingDefaults::default(),
        })
    }

    pub fn with_defaults(mut self, defaults: ListingDefaults) -> Self {
        self.defaults = defaults.cleaned();
        self
    }

    pub fn from_args(base_url: &str, args: &SessionArgs) -> Result<Self, AppError> {
        let delay = DelayBounds::new(
            Duration::from_millis(args.delay_min_ms),
            Duration::from_millis(args.delay_max_ms),
        )?;
        Ok(Self::new(
            base_url,
            args.max_pages,
            delay,
            Duration::from_secs(args.timeout_secs),
        )?
        .with_defaults(args.defaults.clone()))
    }
}

/// Knobs for the email discovery engine.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub delay: Duration,
    pub max_contact_pages: usize,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_contact_pages: 10,
        }
    }
}
