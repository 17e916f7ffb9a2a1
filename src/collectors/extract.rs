// Listing Extractor: one fetched page in, ordered candidates out.

use chrono::NaiveDateTime;
use scraper::Html;

use crate::collectors::{RawListing, SourceAdapter};
use crate::config::ListingDefaults;
use crate::models::offer::NewOffer;
use crate::normalize::{
    UNKNOWN, extract_duration, format_timestamp, normalize_relative_date, split_location,
};

pub const UNKNOWN_TITLE: &str = "Unknown title";
pub const UNKNOWN_COMPANY: &str = "Unknown company";
pub const UNKNOWN_CONTRACT: &str = "Unknown type";

/// Parse every listing block of `body` in page order.
///
/// A listing that fails to parse is logged and skipped; its siblings are
/// still extracted.
pub fn extract_page(
    adapter: &dyn SourceAdapter,
    body: &str,
    defaults: &ListingDefaults,
    now: NaiveDateTime,
) -> Vec<NewOffer> {
    let document = Html::parse_document(body);
    let mut offers = Vec::new();

    for (index, block) in document.select(adapter.listing_selector()).enumerate() {
        match adapter.parse_listing(block) {
            Ok(raw) => offers.push(build_offer(raw, adapter.name(), defaults, now)),
            Err(e) => {
                tracing::warn!(source = adapter.name(), index, "Skipping listing: {e}");
            }
        }
    }

    tracing::debug!(source = adapter.name(), count = offers.len(), "Extracted listings");
    offers
}

/// Normalize raw fragments into a candidate. Gaps take the session default
/// when one is set and a sentinel otherwise.
pub fn build_offer(
    raw: RawListing,
    source: &str,
    defaults: &ListingDefaults,
    now: NaiveDateTime,
) -> NewOffer {
    let titre = raw.titre.unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let entreprise = raw.entreprise.unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
    let (ville, departement) = match raw.location.as_deref() {
        Some(location) => split_location(location),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    };
    let ville = or_default(ville, &defaults.ville);
    let departement = or_default(departement, &defaults.departement);
    let type_contrat = raw
        .type_contrat
        .or_else(|| defaults.type_contrat.clone())
        .unwrap_or_else(|| UNKNOWN_CONTRACT.to_string());
    let domaine = raw
        .domaine
        .or_else(|| defaults.domaine.clone())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let date_publication = match raw.date.as_deref() {
        Some(text) => normalize_relative_date(text, now),
        None => now,
    };
    let duree = raw.duration.as_deref().and_then(extract_duration);
    let mots_cles = format!("{entreprise},{titre},{ville},{type_contrat}");

    NewOffer {
        entreprise,
        titre,
        url: raw.url,
        email: None,
        ville,
        departement,
        domaine,
        type_contrat,
        remuneration: raw.remuneration,
        date_publication: format_timestamp(date_publication),
        duree,
        mots_cles,
        description: raw.description,
        source: source.to_string(),
        date_ajout: format_timestamp(now),
    }
}

fn or_default(value: String, default: &Option<String>) -> String {
    match default {
        Some(d) if value == UNKNOWN => d.clone(),
        _ => value,
    }
}
