pub mod emails;
pub mod offres;
pub mod scrape;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use sqlx::SqlitePool;

use crate::config::EmailConfig;
use crate::fetch::PageFetcher;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub fetcher: Arc<dyn PageFetcher>,
    pub email_config: EmailConfig,
    /// Per-request timeout recorded on sessions started over HTTP.
    pub request_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Offers
        .route("/offres", get(offres::list).delete(offres::purge))
        .route("/offres/stats", get(offres::stats))
        .route("/offres/export.csv", get(offres::export_csv))
        .route("/offres/lookup", get(offres::lookup))
        // Email discovery
        .route("/emails", get(emails::discover))
        // Scraping
        .route("/scrape", post(scrape::start))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}
