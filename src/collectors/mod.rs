// Source adapters and the crawl pipeline built on them.
// Each adapter knows how to page through one site and where the fields of a
// listing live; everything else is shared.

pub mod extract;
pub mod hellowork;
pub mod indeed;
pub mod runner;
pub mod session;

use std::sync::Arc;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::error::AppError;

/// Raw text fragments of one listing, before normalization.
/// Only `url` is required; every other field may be missing from the markup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawListing {
    pub url: String,
    pub titre: Option<String>,
    pub entreprise: Option<String>,
    pub location: Option<String>,
    pub type_contrat: Option<String>,
    pub remuneration: Option<String>,
    pub duration: Option<String>,
    pub date: Option<String>,
    pub domaine: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("listing has no {0}")]
    MissingElement(&'static str),

    #[error("cannot resolve link '{href}': {reason}")]
    InvalidLink { href: String, reason: String },
}

/// Trait that all listing sources must implement.
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier, stored as the offer's `source`.
    fn name(&self) -> &str;

    /// URL of the 1-based `page` of the search described by `base_url`.
    fn page_url(&self, base_url: &str, page: u32) -> Result<String, AppError>;

    /// Matches one block per listing on a result page.
    fn listing_selector(&self) -> &Selector;

    /// Pull the raw fields out of one listing block.
    fn parse_listing(&self, listing: ElementRef<'_>) -> Result<RawListing, ExtractError>;
}

/// Look up an adapter by name.
pub fn get_collector(name: &str) -> Option<Arc<dyn SourceAdapter>> {
    match name.to_ascii_lowercase().as_str() {
        "hellowork" => Some(Arc::new(hellowork::HelloWork)),
        "indeed" => Some(Arc::new(indeed::Indeed)),
        _ => None,
    }
}

/// Set `key=value` on `base_url`, replacing any existing value for `key`.
pub(crate) fn with_query_param(base_url: &str, key: &str, value: &str) -> Result<String, AppError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| AppError::InvalidInput(format!("invalid base URL '{base_url}': {e}")))?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(key, value);
    Ok(url.to_string())
}

/// Resolve a listing href against the site root.
pub(crate) fn resolve_link(site_root: &str, href: &str) -> Result<String, ExtractError> {
    let invalid = |reason: String| ExtractError::InvalidLink {
        href: href.to_string(),
        reason,
    };
    let base = Url::parse(site_root).map_err(|e| invalid(e.to_string()))?;
    let url = base.join(href.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url.to_string())
}

/// Trimmed text of the first match of `selector` under `scope`, if non-empty.
pub(crate) fn select_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(element_text).filter(|t| !t.is_empty())
}

/// Text content with each fragment trimmed and joined by single spaces.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
