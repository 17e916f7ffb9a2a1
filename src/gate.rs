// Deduplication & Persistence Gate.
//
// Uniqueness is on `url` and the first stored version wins: a duplicate is
// reported as skipped and never merged into the existing row. Each insert is
// its own statement, so two sessions racing on one url cannot both insert.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::offer::{JobOffer, NewOffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateCounts {
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct PersistenceGate<'a> {
    pool: &'a SqlitePool,
    counts: GateCounts,
}

impl<'a> PersistenceGate<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            counts: GateCounts::default(),
        }
    }

    pub async fn try_insert(&mut self, candidate: &NewOffer) -> Result<InsertOutcome, AppError> {
        match JobOffer::insert_if_absent(self.pool, candidate).await {
            Ok(true) => {
                self.counts.inserted += 1;
                Ok(InsertOutcome::Inserted)
            }
            Ok(false) => {
                self.counts.skipped += 1;
                Ok(InsertOutcome::Skipped)
            }
            Err(e) => {
                self.counts.failed += 1;
                Err(e)
            }
        }
    }

    /// Push every candidate through the gate. A failed insert is logged and
    /// counted; the remaining candidates are still processed.
    pub async fn insert_all(&mut self, candidates: &[NewOffer]) -> GateCounts {
        for candidate in candidates {
            match self.try_insert(candidate).await {
                Ok(InsertOutcome::Inserted) => {
                    tracing::debug!(url = %candidate.url, "Inserted offer");
                }
                Ok(InsertOutcome::Skipped) => {
                    tracing::debug!(url = %candidate.url, "Skipped duplicate offer");
                }
                Err(e) => {
                    tracing::warn!(url = %candidate.url, "Failed to insert offer: {e}");
                }
            }
        }
        self.counts
    }
}
