// Reading contact links and email addresses out of one fetched page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::heuristics::{is_generic_email, is_valid_email_format};

/// Tokens that mark a link as a likely contact or careers page, matched
/// against the resolved path and query and against the anchor text.
pub const CONTACT_KEYWORDS: &[&str] = &[
    "contact",
    "nous-contacter",
    "about",
    "equipe",
    "team",
    "recrutement",
    "jobs",
    "careers",
    "carrieres",
    "rh",
    "hr",
    "ressources-humaines",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
});
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Same-site links of `body` that look like contact pages, in document order,
/// without duplicates and without the site root itself. At most `limit` pages.
pub fn find_contact_pages(root: &Url, body: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(body);
    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    for link in document.select(&LINK) {
        if pages.len() >= limit {
            break;
        }
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = root.join(href) else {
            tracing::debug!(%href, "Skipping unresolvable link");
            continue;
        };
        resolved.set_fragment(None);
        if resolved.host_str() != root.host_str() || resolved.port() != root.port() {
            continue;
        }
        if resolved == *root {
            continue;
        }

        // Keywords never match against the host.
        let target = format!("{}?{}", resolved.path(), resolved.query().unwrap_or_default())
            .to_lowercase();
        let text = link.text().collect::<String>().to_lowercase();
        let is_contact = CONTACT_KEYWORDS
            .iter()
            .any(|k| target.contains(k) || text.contains(k));
        if !is_contact {
            continue;
        }

        if seen.insert(resolved.to_string()) {
            pages.push(resolved.to_string());
        }
    }
    pages
}

/// Lower-cased, non-generic addresses from the visible text and the
/// `mailto:` links of `body`, in order of first appearance.
pub fn extract_emails(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let mut seen = HashSet::new();
    let mut emails = Vec::new();
    let mut keep = |email: String| {
        if !is_generic_email(&email) && seen.insert(email.clone()) {
            emails.push(email);
        }
    };

    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    for m in EMAIL_RE.find_iter(&text) {
        keep(m.as_str().to_lowercase());
    }

    for link in document.select(&LINK) {
        let Some(href) = link.value().attr("href").map(str::trim) else {
            continue;
        };
        let Some(target) = href
            .get(..7)
            .filter(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
            .map(|_| &href[7..])
        else {
            continue;
        };
        let address = target
            .split('?')
            .next()
            .unwrap_or_default()
            .trim();
        if is_valid_email_format(address) {
            keep(address.to_lowercase());
        }
    }
    emails
}
