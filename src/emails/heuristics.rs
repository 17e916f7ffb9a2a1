use std::sync::LazyLock;

use regex::Regex;

/// Substrings that mark a found address as a shared mailbox nobody reads.
const GENERIC_PATTERNS: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "admin@",
    "webmaster@",
    "info@",
    "contact@",
    "support@",
    "help@",
    "test@",
    "example@",
];

const LOCAL_PARTS: &[&str] = &[
    "contact",
    "info",
    "recrutement",
    "rh",
    "jobs",
    "carrieres",
    "contact.rh",
    "recrutement.rh",
];

const NAMED_LOCAL_PARTS: &[&str] = &["contact", "info", "recrutement"];

/// Earlier keywords rank first.
pub const PRIORITY_KEYWORDS: &[&str] = &[
    "recrutement",
    "rh",
    "jobs",
    "carrieres",
    "contact.rh",
    "recrutement.rh",
    "contact",
    "info",
];

static VALID_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

pub fn is_generic_email(email: &str) -> bool {
    let email = email.to_lowercase();
    GENERIC_PATTERNS.iter().any(|p| email.contains(p))
}

pub fn is_valid_email_format(email: &str) -> bool {
    VALID_EMAIL.is_match(email)
}

/// Host of `site_root` without a leading `www.`.
pub fn bare_domain(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// First word of the employer name, lower-cased with anything but ASCII
/// letters, digits and spaces removed.
fn name_token(entreprise: &str) -> Option<String> {
    let cleaned: String = entreprise
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().next().map(str::to_string)
}

/// Conventional recruiting mailboxes at `domain`, plus variants qualified by
/// the employer's first name token.
pub fn generate_candidates(entreprise: &str, domain: &str) -> Vec<String> {
    let domain = domain.to_lowercase();
    let mut emails: Vec<String> = LOCAL_PARTS
        .iter()
        .map(|local| format!("{local}@{domain}"))
        .collect();

    if let Some(token) = name_token(entreprise) {
        emails.extend(
            NAMED_LOCAL_PARTS
                .iter()
                .map(|local| format!("{local}.{token}@{domain}")),
        );
    }
    emails
}

/// Index of the first priority keyword contained in `email`; addresses
/// matching none rank after all others.
pub fn priority(email: &str) -> usize {
    let email = email.to_lowercase();
    PRIORITY_KEYWORDS
        .iter()
        .position(|k| email.contains(k))
        .unwrap_or(PRIORITY_KEYWORDS.len())
}
