use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Deserialize;

use super::AppState;
use crate::error::AppError;
use crate::export::write_csv;
use crate::models::offer::JobOffer;
use crate::query::{FilterCriteria, OfferStats, sort_offers};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SortParams {
    pub sort: Option<String>,
    pub desc: bool,
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PurgeParams {
    pub older_than_days: i64,
}

/// Filtered and sorted snapshot of the store. Without a sort key the store
/// order (most recently added first) is kept.
async fn snapshot(
    state: &AppState,
    filters: &FilterCriteria,
    order: &SortParams,
) -> Result<Vec<JobOffer>, AppError> {
    let offers = JobOffer::list_recent(&state.pool).await?;
    let mut selected = filters.apply(&offers);
    if let Some(key) = order.sort.as_deref() {
        sort_offers(&mut selected, key, order.desc);
    }
    Ok(selected.into_iter().cloned().collect())
}

/// GET /api/v1/offres
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<FilterCriteria>,
    Query(order): Query<SortParams>,
) -> Result<Json<Vec<JobOffer>>, AppError> {
    let offers = snapshot(&state, &filters, &order).await?;
    Ok(Json(offers))
}

/// GET /api/v1/offres/stats
pub async fn stats(
    State(state): State<AppState>,
    Query(filters): Query<FilterCriteria>,
) -> Result<Json<OfferStats>, AppError> {
    let offers = JobOffer::list_recent(&state.pool).await?;
    Ok(Json(OfferStats::compute(filters.apply(&offers))))
}

/// GET /api/v1/offres/export.csv
pub async fn export_csv(
    State(state): State<AppState>,
    Query(filters): Query<FilterCriteria>,
    Query(order): Query<SortParams>,
) -> Result<impl IntoResponse, AppError> {
    let offers = snapshot(&state, &filters, &order).await?;
    let mut body = Vec::new();
    write_csv(&mut body, &offers)
        .map_err(|e| AppError::Internal(format!("Failed to write CSV: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"offres.csv\"",
            ),
        ],
        body,
    ))
}

/// GET /api/v1/offres/lookup?url=...
pub async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<JobOffer>, AppError> {
    let offer = JobOffer::get_by_url(&state.pool, &params.url)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No offer with url '{}'", params.url)))?;
    Ok(Json(offer))
}

/// DELETE /api/v1/offres?older_than_days=N
pub async fn purge(
    State(state): State<AppState>,
    Query(params): Query<PurgeParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    if params.older_than_days < 0 {
        return Err(AppError::InvalidInput(
            "older_than_days must not be negative".to_string(),
        ));
    }
    let max_age = chrono::Duration::try_days(params.older_than_days).ok_or_else(|| {
        AppError::InvalidInput(format!("{} days is out of range", params.older_than_days))
    })?;
    let deleted =
        JobOffer::delete_older_than(&state.pool, max_age, Utc::now().naive_utc()).await?;
    tracing::info!(deleted, older_than_days = params.older_than_days, "Purged offers");
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
