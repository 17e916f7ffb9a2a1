use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::AppState;
use crate::collectors::get_collector;
use crate::collectors::runner::spawn_session;
use crate::config::{DelayBounds, ListingDefaults, SessionConfig};
use crate::error::AppError;

fn default_max_pages() -> u32 {
    5
}

fn default_delay_min_ms() -> u64 {
    1000
}

fn default_delay_max_ms() -> u64 {
    3000
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub source: String,
    pub base_url: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,
    /// `domaine`, `type_contrat`, `ville`, `departement` for listings that lack them.
    #[serde(flatten)]
    pub defaults: ListingDefaults,
}

/// POST /api/v1/scrape
///
/// Validates the request, then runs the session on a background task.
/// Progress and the final counts go to the log under the returned session id.
pub async fn start(
    State(state): State<AppState>,
    Json(input): Json<ScrapeRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let adapter = get_collector(&input.source)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown source '{}'", input.source)))?;
    let delay = DelayBounds::new(
        Duration::from_millis(input.delay_min_ms),
        Duration::from_millis(input.delay_max_ms),
    )?;
    let config = SessionConfig::new(
        &input.base_url,
        input.max_pages,
        delay,
        state.request_timeout,
    )?
    .with_defaults(input.defaults);

    let handle = spawn_session(state.pool.clone(), adapter, state.fetcher.clone(), config);
    tracing::info!(session = %handle.session_id, source = %input.source, "Scrape session queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "started",
            "session_id": handle.session_id,
            "source": input.source,
        })),
    ))
}
