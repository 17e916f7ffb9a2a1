use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use crate::collectors::{
    ExtractError, RawListing, SourceAdapter, resolve_link, select_text, with_query_param,
};
use crate::error::AppError;

const SITE_ROOT: &str = "https://www.hellowork.com";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid hellowork selector")
}

static LISTING: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"li[data-id-storage-target="item"]"#));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(r#"h3 p[class*="tw-typo-l"]"#));
static COMPANY: LazyLock<Selector> = LazyLock::new(|| selector(r#"h3 p[class*="tw-typo-s"]"#));
static LOCATION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[data-cy="localisationCard"]"#));
static CONTRACT: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-cy="contractCard"]"#));
static SALARY: LazyLock<Selector> =
    LazyLock::new(|| selector("div.tw-readonly.tw-tag-attractive-s.tw-w-fit.tw-border-0"));
static DURATION: LazyLock<Selector> = LazyLock::new(|| selector(r#"div[data-cy="contractTag"]"#));
static DATE: LazyLock<Selector> = LazyLock::new(|| selector("div.tw-typo-s.tw-text-grey"));

/// HelloWork search results (`/fr-fr/emploi/recherche.html?...`), paged with `p`.
pub struct HelloWork;

impl SourceAdapter for HelloWork {
    fn name(&self) -> &str {
        "hellowork"
    }

    fn page_url(&self, base_url: &str, page: u32) -> Result<String, AppError> {
        with_query_param(base_url, "p", &page.to_string())
    }

    fn listing_selector(&self) -> &Selector {
        &LISTING
    }

    fn parse_listing(&self, listing: ElementRef<'_>) -> Result<RawListing, ExtractError> {
        let link = listing
            .select(&LINK)
            .next()
            .ok_or(ExtractError::MissingElement("link"))?;
        let href = link
            .value()
            .attr("href")
            .ok_or(ExtractError::MissingElement("href"))?;

        Ok(RawListing {
            url: resolve_link(SITE_ROOT, href)?,
            // Title and company live in the <h3> of the link.
            titre: select_text(link, &TITLE),
            entreprise: select_text(link, &COMPANY),
            location: select_text(listing, &LOCATION),
            type_contrat: select_text(listing, &CONTRACT),
            remuneration: select_text(listing, &SALARY),
            duration: select_text(listing, &DURATION),
            date: select_text(listing, &DATE),
            domaine: None,
            description: None,
        })
    }
}
