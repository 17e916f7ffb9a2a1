use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use crate::collectors::{
    ExtractError, RawListing, SourceAdapter, resolve_link, select_text, with_query_param,
};
use crate::error::AppError;

const SITE_ROOT: &str = "https://fr.indeed.com";
const PAGE_SIZE: u32 = 10;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid indeed selector")
}

static LISTING: LazyLock<Selector> = LazyLock::new(|| selector("div.job_seen_beacon"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector(".jobTitle a[href], a[href]"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".jobTitle"));
static COMPANY: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[data-testid="company-name"]"#));
static LOCATION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[data-testid="text-location"]"#));
static SALARY: LazyLock<Selector> =
    LazyLock::new(|| selector(".salary-snippet-container, [data-testid='attribute_snippet_testid']"));
static DATE: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-testid="myJobsStateDate"], span.date"#));
static SNIPPET: LazyLock<Selector> = LazyLock::new(|| selector(".job-snippet"));

/// Indeed France result cards. Pages are offsets of ten results (`start`).
///
/// Only the static markup is read; pages behind an anti-bot challenge simply
/// come back without cards and end the session as an empty page.
pub struct Indeed;

impl SourceAdapter for Indeed {
    fn name(&self) -> &str {
        "indeed"
    }

    fn page_url(&self, base_url: &str, page: u32) -> Result<String, AppError> {
        let start = page.saturating_sub(1) * PAGE_SIZE;
        with_query_param(base_url, "start", &start.to_string())
    }

    fn listing_selector(&self) -> &Selector {
        &LISTING
    }

    fn parse_listing(&self, listing: ElementRef<'_>) -> Result<RawListing, ExtractError> {
        let href = listing
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or(ExtractError::MissingElement("link"))?;

        Ok(RawListing {
            url: resolve_link(SITE_ROOT, href)?,
            titre: select_text(listing, &TITLE),
            entreprise: select_text(listing, &COMPANY),
            location: select_text(listing, &LOCATION),
            type_contrat: None,
            remuneration: select_text(listing, &SALARY),
            duration: None,
            date: select_text(listing, &DATE),
            domaine: None,
            description: select_text(listing, &SNIPPET),
        })
    }
}
