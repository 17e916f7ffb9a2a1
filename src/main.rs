mod collectors;
mod config;
mod db;
mod emails;
mod error;
mod export;
mod fetch;
mod gate;
mod models;
mod normalize;
mod query;
mod routes;
#[cfg(test)]
mod testing;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::collectors::get_collector;
use crate::collectors::runner::spawn_session;
use crate::config::{Command, Config, EmailConfig, SessionArgs, SessionConfig};
use crate::emails::EmailDiscovery;
use crate::fetch::HttpFetcher;
use crate::models::offer::JobOffer;
use crate::query::{FilterCriteria, OfferStats, sort_offers};
use crate::routes::api::AppState;

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(pool: SqlitePool) -> impl IntoResponse {
    let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&pool).await;
    match result {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stagescout=info,tower_http=info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }

    match config.resolved_command() {
        Command::Serve {
            listen_addr,
            timeout_secs,
        } => serve(pool, &listen_addr, Duration::from_secs(timeout_secs)).await,
        Command::Scrape {
            source,
            base_url,
            session,
        } => scrape(pool, &source, &base_url, &session).await,
        Command::Emails {
            entreprise,
            site,
            output,
        } => find_emails(&entreprise, site.as_deref(), output.as_deref()).await,
        Command::Export {
            output,
            filters,
            sort,
            desc,
        } => export(&pool, &output, &filters, sort.as_deref(), desc).await,
        Command::Stats => {
            let offers = JobOffer::list_recent(&pool).await?;
            let stats = OfferStats::compute(&offers);
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::Purge { older_than_days } => {
            let max_age = chrono::Duration::try_days(older_than_days)
                .filter(|d| *d >= chrono::Duration::zero())
                .with_context(|| format!("invalid age: {older_than_days} days"))?;
            let deleted =
                JobOffer::delete_older_than(&pool, max_age, chrono::Utc::now().naive_utc())
                    .await?;
            let remaining = JobOffer::count(&pool).await?;
            tracing::info!(deleted, remaining, older_than_days, "Purged offers");
            Ok(())
        }
    }
}

async fn serve(pool: SqlitePool, listen_addr: &str, request_timeout: Duration) -> anyhow::Result<()> {
    anyhow::ensure!(!request_timeout.is_zero(), "request timeout must be positive");
    let state = AppState {
        pool: pool.clone(),
        fetcher: Arc::new(HttpFetcher::new(request_timeout)?),
        email_config: EmailConfig::default(),
        request_timeout,
    };

    let readyz_pool = pool.clone();
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(move || readyz(readyz_pool.clone())))
        .merge(routes::api::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Listening on {}", listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run one session in the foreground. Ctrl-C raises the stop flag; the
/// session then ends before its next page and still persists what it has.
async fn scrape(
    pool: SqlitePool,
    source: &str,
    base_url: &str,
    args: &SessionArgs,
) -> anyhow::Result<()> {
    let adapter =
        get_collector(source).with_context(|| format!("unknown source '{source}'"))?;
    let session_config = SessionConfig::from_args(base_url, args)?;
    let fetcher = Arc::new(HttpFetcher::new(session_config.request_timeout)?);

    let mut handle = spawn_session(pool, adapter, fetcher, session_config);

    let stop = handle.stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current page");
            stop.store(true, Ordering::Relaxed);
        }
    });

    while let Some(event) = handle.events.recv().await {
        tracing::debug!(event = ?event.event, "Session progress");
    }

    let summary = handle.task.await.context("scrape task panicked")??;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn find_emails(
    entreprise: &str,
    site: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let email_config = EmailConfig::default();
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(10))?);
    let discovery = EmailDiscovery::new(fetcher, email_config)
        .discover(entreprise, site)
        .await?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            export::write_emails(BufWriter::new(file), discovery.emails())?;
            tracing::info!(
                count = discovery.candidates.len(),
                path = %path.display(),
                "Wrote candidate emails"
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&discovery)?),
    }
    Ok(())
}

async fn export(
    pool: &SqlitePool,
    output: &Path,
    filters: &FilterCriteria,
    sort: Option<&str>,
    desc: bool,
) -> anyhow::Result<()> {
    let offers = JobOffer::list_recent(pool).await?;
    if !filters.is_empty() {
        tracing::debug!(?filters, "Applying export filters");
    }
    let mut selected = filters.apply(&offers);
    if let Some(key) = sort {
        sort_offers(&mut selected, key, desc);
    }

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let rows = export::write_csv(BufWriter::new(file), selected)?;
    tracing::info!(rows, path = %output.display(), "Exported offers");
    Ok(())
}
