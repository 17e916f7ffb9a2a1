use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use super::AppState;
use crate::emails::{Discovery, EmailDiscovery};
use crate::error::AppError;
use crate::models::offer::JobOffer;

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
    pub entreprise: Option<String>,
    pub site: Option<String>,
    /// Url of a stored offer; its employer and site root are used instead.
    pub offer_url: Option<String>,
}

/// GET /api/v1/emails?entreprise=..&site=..
/// GET /api/v1/emails?offer_url=..
pub async fn discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverParams>,
) -> Result<Json<Discovery>, AppError> {
    let engine = EmailDiscovery::new(state.fetcher.clone(), state.email_config.clone());

    if let Some(url) = params.offer_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let offer = JobOffer::get_by_url(&state.pool, url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No offer with url '{url}'")))?;
        return Ok(Json(engine.discover_for_offer(&offer).await?));
    }

    let entreprise = params.entreprise.as_deref().map(str::trim).unwrap_or_default();
    if entreprise.is_empty() {
        return Err(AppError::InvalidInput(
            "entreprise or offer_url is required".to_string(),
        ));
    }
    let discovery = engine.discover(entreprise, params.site.as_deref()).await?;
    Ok(Json(discovery))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::models::offer::fixtures::new_offer;
    use crate::routes::api::test_support::{get_json, state_with};
    use crate::testing::StaticFetcher;

    #[tokio::test]
    async fn test_discover_over_http() {
        let fetcher = StaticFetcher::new().with_page(
            "https://acme.fr/",
            r#"<a href="mailto:jeanne.rh@acme.fr">Jeanne</a>"#,
        );
        let state = state_with(fetcher, &[]).await;

        let (status, body) =
            get_json(&state, "/api/v1/emails?entreprise=Acme&site=https://acme.fr").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candidates"][0]["email"], "recrutement@acme.fr");
        assert_eq!(body["sources"][0], "https://acme.fr/");

        let found = body["candidates"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["email"] == "jeanne.rh@acme.fr")
            .unwrap();
        assert_eq!(found["provenance"]["kind"], "found");
    }

    #[tokio::test]
    async fn test_discover_requires_entreprise() {
        let state = state_with(StaticFetcher::new(), &[]).await;
        let (status, _) = get_json(&state, "/api/v1/emails?entreprise=%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            get_json(&state, "/api/v1/emails?entreprise=Acme&site=not%20a%20url").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_discover_for_stored_offer() {
        let fetcher = StaticFetcher::new().with_page(
            "https://careers.chronofresh.fr/",
            "<p>Écrire à stages@chronofresh.fr</p>",
        );
        let offer = new_offer("https://careers.chronofresh.fr/offres/42");
        let state = state_with(fetcher, &[offer]).await;

        let (status, body) = get_json(
            &state,
            "/api/v1/emails?offer_url=https%3A%2F%2Fcareers.chronofresh.fr%2Foffres%2F42",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["candidates"][0]["email"],
            "recrutement@careers.chronofresh.fr"
        );
        assert_eq!(body["candidates"][0]["entreprise"], "Chronofresh");
        assert_eq!(body["sources"][0], "https://careers.chronofresh.fr/");

        let (status, _) = get_json(&state, "/api/v1/emails?offer_url=https://nope.fr/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
