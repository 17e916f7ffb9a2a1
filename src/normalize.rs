// Pure conversions from raw listing text to structured fields.
//
// Nothing in here fails: unrecognised input falls back to a documented
// default.

use std::sync::LazyLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

/// Placeholder for a city or department that could not be determined.
pub const UNKNOWN: &str = "Unknown";

/// Storage format of every timestamp written by the pipeline.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static RELATIVE_DATE_PATTERNS: LazyLock<[(Regex, RelativeUnit); 4]> = LazyLock::new(|| {
    let re = |unit: &str| {
        Regex::new(&format!(r"(?i)il y a (\d+)\s+{unit}")).expect("valid relative date regex")
    };
    [
        (re("minute"), RelativeUnit::Minute),
        (re("heure"), RelativeUnit::Hour),
        (re("jour"), RelativeUnit::Day),
        (re("mois"), RelativeUnit::Month),
    ]
});

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*) - (\d{2,3})$").expect("valid location regex"));

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(mois|semaines|semaine|jours|jour|heures|heure)")
        .expect("valid duration regex")
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number regex"));

#[derive(Debug, Clone, Copy)]
enum RelativeUnit {
    Minute,
    Hour,
    Day,
    Month,
}

impl RelativeUnit {
    fn span(self, n: i64) -> Option<Duration> {
        match self {
            RelativeUnit::Minute => Duration::try_minutes(n),
            RelativeUnit::Hour => Duration::try_hours(n),
            RelativeUnit::Day => Duration::try_days(n),
            // A month is approximated as 30 days.
            RelativeUnit::Month => n.checked_mul(30).and_then(Duration::try_days),
        }
    }
}

/// Resolve "il y a N minutes/heures/jours/mois" against `now`.
///
/// Patterns are tried minute, hour, day, month; the first one that matches
/// wins. Anything else, including an out-of-range count, yields `now`.
pub fn normalize_relative_date(text: &str, now: NaiveDateTime) -> NaiveDateTime {
    for (re, unit) in RELATIVE_DATE_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            return caps[1]
                .parse::<i64>()
                .ok()
                .and_then(|n| unit.span(n))
                .and_then(|span| now.checked_sub_signed(span))
                .unwrap_or(now);
        }
    }
    now
}

/// Split "Paris - 75" into city and department.
///
/// A purely numeric text is a department on its own; anything else is taken
/// as a city with an unknown department.
pub fn split_location(text: &str) -> (String, String) {
    let text = text.trim();
    if text.is_empty() {
        return (UNKNOWN.to_string(), UNKNOWN.to_string());
    }
    if let Some(caps) = LOCATION_RE.captures(text) {
        return (caps[1].trim().to_string(), caps[2].to_string());
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        return (UNKNOWN.to_string(), text.to_string());
    }
    (text.to_string(), UNKNOWN.to_string())
}

/// A contract length such as `6 mois`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duree {
    pub valeur: i64,
    pub unite: String,
}

/// First "<integer> <unit>" in the text, unit lower-cased.
pub fn extract_duration(text: &str) -> Option<Duree> {
    let caps = DURATION_RE.captures(text)?;
    let valeur = caps[1].parse().ok()?;
    Some(Duree {
        valeur,
        unite: caps[2].to_lowercase(),
    })
}

/// First numeric token, with comma decimal separators read as dots.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let text = text.replace(',', ".");
    NUMBER_RE
        .find(&text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Like [`parse_numeric`] but 0.0 when there is no number at all. Filters
/// compare against this value, so "no amount" and "zero" look the same.
pub fn extract_numeric(text: &str) -> f64 {
    parse_numeric(text).unwrap_or(0.0)
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_relative_date_hours_is_exact() {
        let now = reference();
        assert_eq!(
            normalize_relative_date("il y a 2 heures", now),
            now - Duration::hours(2)
        );
    }

    #[test]
    fn test_relative_date_units() {
        let now = reference();
        assert_eq!(
            normalize_relative_date("Il y a 15 minutes", now),
            now - Duration::minutes(15)
        );
        assert_eq!(
            normalize_relative_date("publiée il y a 3 jours", now),
            now - Duration::days(3)
        );
        assert_eq!(
            normalize_relative_date("il y a 1 mois", now),
            now - Duration::days(30)
        );
    }

    #[test]
    fn test_relative_date_unrecognised_returns_now() {
        let now = reference();
        assert_eq!(normalize_relative_date("hier", now), now);
        assert_eq!(normalize_relative_date("", now), now);
        assert_eq!(
            normalize_relative_date("il y a 99999999999999999999 jours", now),
            now
        );
    }

    #[test]
    fn test_split_location() {
        assert_eq!(
            split_location("Paris - 75"),
            ("Paris".to_string(), "75".to_string())
        );
        assert_eq!(
            split_location("75"),
            ("Unknown".to_string(), "75".to_string())
        );
        assert_eq!(
            split_location("Lyon"),
            ("Lyon".to_string(), "Unknown".to_string())
        );
        assert_eq!(
            split_location("Saint-Denis - 974"),
            ("Saint-Denis".to_string(), "974".to_string())
        );
        assert_eq!(
            split_location("Paris - 7501"),
            ("Paris - 7501".to_string(), "Unknown".to_string())
        );
    }

    #[test]
    fn test_extract_duration() {
        assert_eq!(
            extract_duration("Stage - 6 Mois"),
            Some(Duree {
                valeur: 6,
                unite: "mois".to_string()
            })
        );
        assert_eq!(
            extract_duration("CDD 12 semaines"),
            Some(Duree {
                valeur: 12,
                unite: "semaines".to_string()
            })
        );
        assert_eq!(extract_duration("Temps plein"), None);
    }

    #[test]
    fn test_extract_numeric() {
        assert_eq!(extract_numeric("832 - 1868 € / mois"), 832.0);
        assert_eq!(extract_numeric("12,5 € / heure"), 12.5);
        assert_eq!(extract_numeric("Selon profil"), 0.0);
        assert_eq!(parse_numeric("Selon profil"), None);
        assert_eq!(parse_numeric("0 €"), Some(0.0));
    }
}
