use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::parse_date;
use crate::models::offer::JobOffer;
use crate::normalize::parse_numeric;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> Range<T> {
    fn empty() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    fn include(&mut self, value: T) {
        if self.min.is_none_or(|m| value < m) {
            self.min = Some(value);
        }
        if self.max.is_none_or(|m| value > m) {
            self.max = Some(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferStats {
    pub total: usize,
    pub domaines: BTreeMap<String, usize>,
    pub villes: BTreeMap<String, usize>,
    pub types_contrat: BTreeMap<String, usize>,
    pub sources: BTreeMap<String, usize>,
    pub avec_email: usize,
    pub avec_url: usize,
    /// Over offers whose `date_ajout` parses.
    pub date_range: Range<NaiveDate>,
    /// Over offers whose remuneration holds a number.
    pub remuneration_range: Range<f64>,
}

impl OfferStats {
    pub fn compute<'a>(offers: impl IntoIterator<Item = &'a JobOffer>) -> Self {
        let mut stats = OfferStats {
            total: 0,
            domaines: BTreeMap::new(),
            villes: BTreeMap::new(),
            types_contrat: BTreeMap::new(),
            sources: BTreeMap::new(),
            avec_email: 0,
            avec_url: 0,
            date_range: Range::empty(),
            remuneration_range: Range::empty(),
        };

        for offer in offers {
            stats.total += 1;
            *stats.domaines.entry(offer.domaine.clone()).or_default() += 1;
            *stats.villes.entry(offer.ville.clone()).or_default() += 1;
            *stats.types_contrat.entry(offer.type_contrat.clone()).or_default() += 1;
            *stats.sources.entry(offer.source.clone()).or_default() += 1;

            if offer.email.as_deref().is_some_and(|e| !e.trim().is_empty()) {
                stats.avec_email += 1;
            }
            if !offer.url.trim().is_empty() {
                stats.avec_url += 1;
            }
            if let Some(value) = offer.remuneration.as_deref().and_then(parse_numeric) {
                stats.remuneration_range.include(value);
            }
            if let Some(date) = parse_date(&offer.date_ajout) {
                stats.date_range.include(date);
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures::offer;

    #[test]
    fn test_stats_over_mixed_offers() {
        let mut a = offer(1, "https://ex.org/a");
        a.remuneration = Some("832 - 1868 € / mois".to_string());
        a.email = Some("rh@chronofresh.fr".to_string());
        let mut b = offer(2, "https://ex.org/b");
        b.ville = "Lyon".to_string();
        b.source = "indeed".to_string();
        b.remuneration = Some("Selon profil".to_string());
        b.date_ajout = "2025-03-10 09:00:00".to_string();
        let mut c = offer(3, "https://ex.org/c");
        c.remuneration = Some("1200".to_string());
        c.date_ajout = "inconnue".to_string();

        let offers = [a, b, c];
        let stats = OfferStats::compute(&offers);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.villes["Paris"], 2);
        assert_eq!(stats.villes["Lyon"], 1);
        assert_eq!(stats.sources["hellowork"], 2);
        assert_eq!(stats.domaines["Logistique"], 3);
        assert_eq!(stats.avec_email, 1);
        assert_eq!(stats.avec_url, 3);
        assert_eq!(stats.remuneration_range.min, Some(832.0));
        assert_eq!(stats.remuneration_range.max, Some(1200.0));
        assert_eq!(stats.date_range.min, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(stats.date_range.max, NaiveDate::from_ymd_opt(2025, 3, 10));
    }

    #[test]
    fn test_stats_of_nothing() {
        let stats = OfferStats::compute(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.villes.is_empty());
        assert_eq!(stats.remuneration_range, Range::empty());
        assert_eq!(stats.date_range.max, None);
    }
}
