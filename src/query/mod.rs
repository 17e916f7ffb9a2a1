// Filter/Sort/Aggregation Engine over an in-memory snapshot of stored offers.

pub mod filter;
pub mod sort;
pub mod stats;

use chrono::{NaiveDate, NaiveDateTime};

pub use filter::FilterCriteria;
pub use sort::{SortKey, sort_offers};
pub use stats::OfferStats;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Day of a stored date string, trying ISO date, ISO datetime, day/month/year
/// then month/day/year. The first format that parses wins.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMATS[0]) {
        return Some(date);
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts.date());
        }
    }
    DATE_FORMATS[1..]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}
