use chrono::NaiveDate;
use serde::Deserialize;

use super::parse_date;
use crate::models::offer::JobOffer;
use crate::normalize::extract_numeric;

/// Optional predicates over stored offers. Every predicate that is set must
/// hold; an empty string counts as unset.
#[derive(Debug, Clone, Default, Deserialize, clap::Args)]
#[serde(default)]
pub struct FilterCriteria {
    /// Substring of the title, employer, description or tags
    #[arg(long)]
    pub keyword: Option<String>,

    /// Exact domain (case-insensitive)
    #[arg(long)]
    pub domaine: Option<String>,

    /// Substring of the city
    #[arg(long)]
    pub ville: Option<String>,

    /// Substring of the contract type
    #[arg(long)]
    pub type_contrat: Option<String>,

    /// Lower bound on the first number of the remuneration text
    #[arg(long)]
    pub remuneration_min: Option<f64>,

    /// Upper bound on the first number of the remuneration text
    #[arg(long)]
    pub remuneration_max: Option<f64>,

    /// Added on or after this day (YYYY-MM-DD)
    #[arg(long)]
    pub date_debut: Option<NaiveDate>,

    /// Added on or before this day (YYYY-MM-DD)
    #[arg(long)]
    pub date_fin: Option<NaiveDate>,

    /// Substring of the source name
    #[arg(long)]
    pub source: Option<String>,

    /// Only offers with an email
    #[arg(long)]
    pub avec_email: bool,

    /// Only offers with a url
    #[arg(long)]
    pub avec_url: bool,
}

fn lowered(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        lowered(&self.keyword).is_none()
            && lowered(&self.domaine).is_none()
            && lowered(&self.ville).is_none()
            && lowered(&self.type_contrat).is_none()
            && lowered(&self.source).is_none()
            && self.remuneration_min.is_none()
            && self.remuneration_max.is_none()
            && self.date_debut.is_none()
            && self.date_fin.is_none()
            && !self.avec_email
            && !self.avec_url
    }

    /// Offers of `offers` satisfying every set predicate, in input order.
    pub fn apply<'a>(&self, offers: &'a [JobOffer]) -> Vec<&'a JobOffer> {
        let matcher = Matcher {
            keyword: lowered(&self.keyword),
            domaine: lowered(&self.domaine),
            ville: lowered(&self.ville),
            type_contrat: lowered(&self.type_contrat),
            source: lowered(&self.source),
            criteria: self,
        };
        offers.iter().filter(|o| matcher.matches(o)).collect()
    }
}

/// Criteria with their text predicates lower-cased once.
struct Matcher<'c> {
    keyword: Option<String>,
    domaine: Option<String>,
    ville: Option<String>,
    type_contrat: Option<String>,
    source: Option<String>,
    criteria: &'c FilterCriteria,
}

impl Matcher<'_> {
    fn matches(&self, offer: &JobOffer) -> bool {
        let contains = |field: &str, needle: &str| field.to_lowercase().contains(needle);

        if let Some(keyword) = &self.keyword {
            let hit = contains(&offer.titre, keyword)
                || contains(&offer.entreprise, keyword)
                || offer
                    .description
                    .as_deref()
                    .is_some_and(|d| contains(d, keyword))
                || contains(&offer.mots_cles, keyword);
            if !hit {
                return false;
            }
        }
        if let Some(domaine) = &self.domaine
            && offer.domaine.to_lowercase() != *domaine
        {
            return false;
        }
        if let Some(ville) = &self.ville
            && !contains(&offer.ville, ville)
        {
            return false;
        }
        if let Some(type_contrat) = &self.type_contrat
            && !contains(&offer.type_contrat, type_contrat)
        {
            return false;
        }
        if let Some(source) = &self.source
            && !contains(&offer.source, source)
        {
            return false;
        }

        // Missing or number-free remuneration counts as 0.
        let remuneration = extract_numeric(offer.remuneration.as_deref().unwrap_or_default());
        if self
            .criteria
            .remuneration_min
            .is_some_and(|min| remuneration < min)
        {
            return false;
        }
        if self
            .criteria
            .remuneration_max
            .is_some_and(|max| remuneration > max)
        {
            return false;
        }

        // An unparsable date never fails a date predicate.
        if let Some(added) = parse_date(&offer.date_ajout) {
            if self.criteria.date_debut.is_some_and(|d| added < d) {
                return false;
            }
            if self.criteria.date_fin.is_some_and(|d| added > d) {
                return false;
            }
        }

        if self.criteria.avec_email && !non_blank(offer.email.as_deref()) {
            return false;
        }
        if self.criteria.avec_url && !non_blank(Some(&offer.url)) {
            return false;
        }
        true
    }
}
