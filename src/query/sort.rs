use std::cmp::Ordering;

use crate::models::offer::JobOffer;
use crate::normalize::extract_numeric;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    DateAjout,
    DatePublication,
    Entreprise,
    Titre,
    Domaine,
    Ville,
    TypeContrat,
    Remuneration,
}

impl SortKey {
    /// `date` is an alias of `date_ajout`. Unknown names give `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let key = match name.trim().to_lowercase().as_str() {
            "date" | "date_ajout" => SortKey::DateAjout,
            "date_publication" => SortKey::DatePublication,
            "entreprise" => SortKey::Entreprise,
            "titre" => SortKey::Titre,
            "domaine" => SortKey::Domaine,
            "ville" => SortKey::Ville,
            "type_contrat" => SortKey::TypeContrat,
            "remuneration" => SortKey::Remuneration,
            _ => return None,
        };
        Some(key)
    }

    fn compare(self, a: &JobOffer, b: &JobOffer) -> Ordering {
        let text = |x: &str, y: &str| x.to_lowercase().cmp(&y.to_lowercase());
        match self {
            // Stored timestamps share one fixed-width format.
            SortKey::DateAjout => a.date_ajout.cmp(&b.date_ajout),
            SortKey::DatePublication => a.date_publication.cmp(&b.date_publication),
            SortKey::Entreprise => text(&a.entreprise, &b.entreprise),
            SortKey::Titre => text(&a.titre, &b.titre),
            SortKey::Domaine => text(&a.domaine, &b.domaine),
            SortKey::Ville => text(&a.ville, &b.ville),
            SortKey::TypeContrat => text(&a.type_contrat, &b.type_contrat),
            SortKey::Remuneration => {
                let value = |o: &JobOffer| extract_numeric(o.remuneration.as_deref().unwrap_or_default());
                value(a).total_cmp(&value(b))
            }
        }
    }
}

/// Stable sort by the named key. Equal keys keep their input order in both
/// directions; an unknown key leaves the slice untouched.
pub fn sort_offers(offers: &mut [&JobOffer], key: &str, descending: bool) {
    let Some(key) = SortKey::parse(key) else {
        tracing::debug!(%key, "Unknown sort key, keeping input order");
        return;
    };
    if descending {
        offers.sort_by(|a, b| key.compare(b, a));
    } else {
        offers.sort_by(|a, b| key.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures::offer;

    fn ids(offers: &[&JobOffer]) -> Vec<i64> {
        offers.iter().map(|o| o.id).collect()
    }

    fn sample() -> Vec<JobOffer> {
        let names = ["beta", "Alpha", "alpha", "Gamma", "ALPHA"];
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut o = offer(i as i64 + 1, &format!("https://ex.org/{i}"));
                o.entreprise = name.to_string();
                o
            })
            .collect()
    }

    #[test]
    fn test_sort_is_case_insensitive_and_stable() {
        let offers = sample();
        let mut view: Vec<&JobOffer> = offers.iter().collect();

        sort_offers(&mut view, "entreprise", false);
        assert_eq!(ids(&view), [2, 3, 5, 1, 4]);

        let mut view: Vec<&JobOffer> = offers.iter().collect();
        sort_offers(&mut view, "entreprise", true);
        assert_eq!(ids(&view), [4, 1, 2, 3, 5]);
    }

    #[test]
    fn test_unknown_key_keeps_order() {
        let offers = sample();
        let mut view: Vec<&JobOffer> = offers.iter().collect();
        sort_offers(&mut view, "salaire", true);
        assert_eq!(ids(&view), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_sort_by_remuneration_and_date() {
        let mut offers = sample();
        offers[0].remuneration = Some("1 200 €".to_string());
        offers[1].remuneration = None;
        offers[2].remuneration = Some("1500".to_string());
        offers[3].remuneration = Some("700,5".to_string());
        offers[4].remuneration = Some("900".to_string());
        let mut view: Vec<&JobOffer> = offers.iter().collect();
        sort_offers(&mut view, "remuneration", false);
        // "1 200" reads as 1.
        assert_eq!(ids(&view), [2, 1, 4, 5, 3]);

        offers[0].date_ajout = "2025-03-02 08:00:00".to_string();
        offers[3].date_ajout = "2025-02-28 23:59:59".to_string();
        let mut view: Vec<&JobOffer> = offers.iter().collect();
        sort_offers(&mut view, "date", true);
        assert_eq!(ids(&view), [1, 2, 3, 5, 4]);
    }
}
