// Email Discovery Engine.
//
// Crawls an employer's site for contact pages, collects the addresses they
// publish, adds conventional recruiting mailboxes for the site's domain and
// ranks the lot. Nothing here guarantees deliverability.

pub mod heuristics;
pub mod page;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::config::EmailConfig;
use crate::error::AppError;
use crate::fetch::PageFetcher;
use crate::models::offer::JobOffer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    Found { page: String },
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactCandidate {
    pub email: String,
    pub entreprise: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Discovery {
    /// Ranked, unique, lower-cased.
    pub candidates: Vec<ContactCandidate>,
    /// Pages that yielded at least one found address.
    pub sources: Vec<String>,
    pub contact_pages: Vec<String>,
}

impl Discovery {
    pub fn emails(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.email.as_str()).collect()
    }
}

/// `scheme://host[:port]` of an http(s) URL.
pub fn site_root_for(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(parsed.origin().ascii_serialization())
}

/// Merge found then generated addresses, keeping the first occurrence of each
/// address, and stable-sort by priority.
pub fn rank(entreprise: &str, found: Vec<(String, String)>, generated: Vec<String>) -> Vec<ContactCandidate> {
    let mut seen = HashSet::new();
    let found = found.into_iter().map(|(email, page)| (email, Provenance::Found { page }));
    let generated = generated.into_iter().map(|email| (email, Provenance::Generated));

    let mut candidates: Vec<ContactCandidate> = found
        .chain(generated)
        .filter_map(|(email, provenance)| {
            let email = email.to_lowercase();
            seen.insert(email.clone()).then(|| ContactCandidate {
                email,
                entreprise: entreprise.to_string(),
                provenance,
            })
        })
        .collect();

    candidates.sort_by_key(|c| heuristics::priority(&c.email));
    candidates
}

pub struct EmailDiscovery {
    fetcher: Arc<dyn PageFetcher>,
    config: EmailConfig,
}

impl EmailDiscovery {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: EmailConfig) -> Self {
        Self { fetcher, config }
    }

    /// Without a site root there is nothing to crawl or derive a domain
    /// from, so the result is empty.
    pub async fn discover(
        &self,
        entreprise: &str,
        site_root: Option<&str>,
    ) -> Result<Discovery, AppError> {
        let Some(site_root) = site_root.map(str::trim).filter(|s| !s.is_empty()) else {
            tracing::info!(%entreprise, "No site root, skipping email discovery");
            return Ok(Discovery::default());
        };
        let root = Url::parse(site_root)
            .map_err(|e| AppError::InvalidInput(format!("invalid site root '{site_root}': {e}")))?;
        let Some(host) = root.host_str().filter(|_| matches!(root.scheme(), "http" | "https"))
        else {
            return Err(AppError::InvalidInput(format!(
                "site root must be an http(s) URL, got '{site_root}'"
            )));
        };

        tracing::info!(%entreprise, root = %root, "Discovering contact emails");
        let mut fetches = 0;

        let root_body = self.fetch_body(root.as_str(), &mut fetches).await;
        let contact_pages = root_body
            .as_deref()
            .map(|body| page::find_contact_pages(&root, body, self.config.max_contact_pages))
            .unwrap_or_default();

        let mut found = Vec::new();
        let mut sources = Vec::new();
        for url in &contact_pages {
            let Some(body) = self.fetch_body(url, &mut fetches).await else {
                continue;
            };
            let emails = page::extract_emails(&body);
            if !emails.is_empty() {
                sources.push(url.clone());
                found.extend(emails.into_iter().map(|e| (e, url.clone())));
            }
        }
        if let Some(body) = root_body.as_deref() {
            let emails = page::extract_emails(body);
            if !emails.is_empty() {
                sources.push(root.to_string());
                found.extend(emails.into_iter().map(|e| (e, root.to_string())));
            }
        }

        let generated = heuristics::generate_candidates(entreprise, heuristics::bare_domain(host));
        let candidates = rank(entreprise, found, generated);
        tracing::info!(
            %entreprise,
            candidates = candidates.len(),
            sources = sources.len(),
            "Email discovery finished"
        );

        Ok(Discovery {
            candidates,
            sources,
            contact_pages,
        })
    }

    pub async fn discover_for_offer(&self, offer: &JobOffer) -> Result<Discovery, AppError> {
        let root = site_root_for(&offer.url);
        self.discover(&offer.entreprise, root.as_deref()).await
    }

    /// Fetch one page, waiting out the politeness delay first unless it is
    /// the first request. Any failure yields `None`.
    async fn fetch_body(&self, url: &str, fetches: &mut usize) -> Option<String> {
        if *fetches > 0 && !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
        *fetches += 1;

        match self.fetcher.fetch(url).await {
            Ok(page) if page.is_success() => Some(page.body),
            Ok(page) => {
                tracing::warn!(%url, status = page.status, "Contact page answered with a non-success status");
                None
            }
            Err(e) => {
                tracing::warn!(%url, "Contact page fetch failed: {e}");
                None
            }
        }
    }
}
