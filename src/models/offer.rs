use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::normalize::{Duree, format_timestamp};

/// A stored offer. `url` is the identity key.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobOffer {
    pub id: i64,
    pub entreprise: String,
    pub titre: String,
    pub url: String,
    pub email: Option<String>,
    pub ville: String,
    pub departement: String,
    pub domaine: String,
    pub type_contrat: String,
    pub remuneration: Option<String>,
    pub date_publication: String,
    pub duree_valeur: Option<i64>,
    pub duree_unite: Option<String>,
    pub mots_cles: String,
    pub description: Option<String>,
    pub source: String,
    pub date_ajout: String,
}

/// An offer parsed from a page that has not been through the gate yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOffer {
    pub entreprise: String,
    pub titre: String,
    pub url: String,
    pub email: Option<String>,
    pub ville: String,
    pub departement: String,
    pub domaine: String,
    pub type_contrat: String,
    pub remuneration: Option<String>,
    pub date_publication: String,
    pub duree: Option<Duree>,
    pub mots_cles: String,
    pub description: Option<String>,
    pub source: String,
    pub date_ajout: String,
}

impl JobOffer {
    #[cfg(test)]
    pub fn duree(&self) -> Option<Duree> {
        match (self.duree_valeur, &self.duree_unite) {
            (Some(valeur), Some(unite)) => Some(Duree {
                valeur,
                unite: unite.clone(),
            }),
            _ => None,
        }
    }

    /// Insert unless an offer with the same url is already stored.
    /// Returns whether a row was written; an existing row is never touched.
    pub async fn insert_if_absent(pool: &SqlitePool, input: &NewOffer) -> Result<bool, AppError> {
        if input.url.trim().is_empty() {
            return Err(AppError::InvalidInput("offer url is empty".to_string()));
        }
        let result = sqlx::query(
            "INSERT INTO offres (entreprise, titre, url, email, ville, departement, domaine, type_contrat, remuneration, date_publication, duree_valeur, duree_unite, mots_cles, description, source, date_ajout) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT(url) DO NOTHING",
        )
        .bind(&input.entreprise)
        .bind(&input.titre)
        .bind(&input.url)
        .bind(&input.email)
        .bind(&input.ville)
        .bind(&input.departement)
        .bind(&input.domaine)
        .bind(&input.type_contrat)
        .bind(&input.remuneration)
        .bind(&input.date_publication)
        .bind(input.duree.as_ref().map(|d| d.valeur))
        .bind(input.duree.as_ref().map(|d| d.unite.as_str()))
        .bind(&input.mots_cles)
        .bind(&input.description)
        .bind(&input.source)
        .bind(&input.date_ajout)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn get_by_url(pool: &SqlitePool, url: &str) -> Result<Option<JobOffer>, AppError> {
        let offer = sqlx::query_as::<_, JobOffer>("SELECT * FROM offres WHERE url = ?")
            .bind(url)
            .fetch_optional(pool)
            .await?;
        Ok(offer)
    }

    pub async fn exists(pool: &SqlitePool, url: &str) -> Result<bool, AppError> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM offres WHERE url = ?)")
            .bind(url)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Every stored offer, most recently added first.
    pub async fn list_recent(pool: &SqlitePool) -> Result<Vec<JobOffer>, AppError> {
        let offers = sqlx::query_as::<_, JobOffer>(
            "SELECT * FROM offres ORDER BY date_ajout DESC, id DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(offers)
    }

    /// Delete offers added before `now - max_age`. Returns the number removed.
    pub async fn delete_older_than(
        pool: &SqlitePool,
        max_age: Duration,
        now: NaiveDateTime,
    ) -> Result<u64, AppError> {
        let cutoff = now
            .checked_sub_signed(max_age)
            .ok_or_else(|| AppError::InvalidInput(format!("age {max_age} is out of range")))?;
        let result = sqlx::query("DELETE FROM offres WHERE date_ajout < ?")
            .bind(format_timestamp(cutoff))
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM offres")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
