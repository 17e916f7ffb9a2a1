// Pagination Controller.
//
// `ScrapeSession` is a plain state machine: the driver feeds it the result of
// each step and it decides whether to fetch the next page or stop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::collectors::SourceAdapter;
use crate::collectors::extract::extract_page;
use crate::collectors::runner::Progress;
use crate::config::SessionConfig;
use crate::error::AppError;
use crate::fetch::PageFetcher;
use crate::models::offer::{JobOffer, NewOffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// The page request failed or answered with a non-success status.
    FetchFailed,
    /// The page held no listings.
    EmptyPage,
    /// Every listing on the page was already stored.
    Stagnation,
    /// `max_pages` pages were accumulated.
    PageLimitReached,
    /// The stop flag was raised between two pages.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::FetchFailed => "fetch-failed",
            StopReason::EmptyPage => "empty-page",
            StopReason::Stagnation => "stagnation",
            StopReason::PageLimitReached => "page-limit-reached",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Fetching(u32),
    Extracting(u32),
    Evaluating(u32),
    Stopped(StopReason),
}

#[derive(Debug)]
pub struct ScrapeSession {
    source: String,
    base_url: String,
    max_pages: u32,
    state: SessionState,
    last_page: u32,
    candidates_seen: usize,
    candidates_new: usize,
    pending: Vec<NewOffer>,
    accumulated: Vec<NewOffer>,
}

/// What a finished session hands over to the persistence gate.
#[derive(Debug)]
pub struct SessionOutcome {
    pub source: String,
    pub base_url: String,
    pub stop_reason: StopReason,
    /// Last page the controller evaluated or tried to fetch.
    pub last_page: u32,
    pub candidates_seen: usize,
    pub candidates_new: usize,
    pub candidates: Vec<NewOffer>,
}

impl ScrapeSession {
    pub fn new(source: &str, config: &SessionConfig) -> Self {
        Self {
            source: source.to_string(),
            base_url: config.base_url.clone(),
            max_pages: config.max_pages,
            state: SessionState::Fetching(1),
            last_page: 0,
            candidates_seen: 0,
            candidates_new: 0,
            pending: Vec::new(),
            accumulated: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state, SessionState::Stopped(_))
    }

    /// Page to fetch next, if the session is waiting on a fetch.
    pub fn next_fetch(&self) -> Option<u32> {
        match self.state {
            SessionState::Fetching(page) => Some(page),
            _ => None,
        }
    }

    /// Candidates of the page under evaluation.
    pub fn pending(&self) -> &[NewOffer] {
        &self.pending
    }

    pub fn record_fetch(&mut self, succeeded: bool) -> Result<(), AppError> {
        let SessionState::Fetching(page) = self.state else {
            return Err(self.invalid("record_fetch"));
        };
        self.last_page = page;
        self.state = if succeeded {
            SessionState::Extracting(page)
        } else {
            SessionState::Stopped(StopReason::FetchFailed)
        };
        Ok(())
    }

    pub fn record_extraction(&mut self, candidates: Vec<NewOffer>) -> Result<(), AppError> {
        let SessionState::Extracting(page) = self.state else {
            return Err(self.invalid("record_extraction"));
        };
        if candidates.is_empty() {
            self.state = SessionState::Stopped(StopReason::EmptyPage);
        } else {
            self.pending = candidates;
            self.state = SessionState::Evaluating(page);
        }
        Ok(())
    }

    /// `new_on_page` is how many pending candidates the store does not know.
    pub fn record_evaluation(&mut self, new_on_page: usize) -> Result<(), AppError> {
        let SessionState::Evaluating(page) = self.state else {
            return Err(self.invalid("record_evaluation"));
        };
        let pending = std::mem::take(&mut self.pending);

        // Sources list newest first, so a page of known listings means the
        // rest of the catalogue was ingested by an earlier run.
        if new_on_page == 0 {
            self.state = SessionState::Stopped(StopReason::Stagnation);
            return Ok(());
        }

        self.candidates_seen += pending.len();
        self.candidates_new += new_on_page;
        self.accumulated.extend(pending);
        self.state = if page >= self.max_pages {
            SessionState::Stopped(StopReason::PageLimitReached)
        } else {
            SessionState::Fetching(page + 1)
        };
        Ok(())
    }

    pub fn cancel(&mut self) {
        if !self.is_stopped() {
            self.pending.clear();
            self.state = SessionState::Stopped(StopReason::Cancelled);
        }
    }

    pub fn into_outcome(self) -> Result<SessionOutcome, AppError> {
        let SessionState::Stopped(stop_reason) = self.state else {
            return Err(self.invalid("into_outcome"));
        };
        Ok(SessionOutcome {
            source: self.source,
            base_url: self.base_url,
            stop_reason,
            last_page: self.last_page,
            candidates_seen: self.candidates_seen,
            candidates_new: self.candidates_new,
            candidates: self.accumulated,
        })
    }

    fn invalid(&self, step: &str) -> AppError {
        AppError::Internal(format!(
            "session for {} cannot {step} in state {:?}",
            self.source, self.state
        ))
    }
}

/// Drive one session to completion: fetch, extract, evaluate, page by page.
///
/// Fetches are strictly sequential and separated by the politeness delay.
/// The stop flag is checked before every fetch; a fetch already in flight is
/// not interrupted.
pub async fn paginate(
    adapter: &dyn SourceAdapter,
    fetcher: &dyn PageFetcher,
    pool: &SqlitePool,
    config: &SessionConfig,
    stop: &AtomicBool,
    progress: &Progress,
) -> Result<SessionOutcome, AppError> {
    let mut session = ScrapeSession::new(adapter.name(), config);

    while let Some(page) = session.next_fetch() {
        if stop.load(Ordering::Relaxed) {
            session.cancel();
            break;
        }
        if page > 1 {
            tokio::time::sleep(config.delay.sample()).await;
        }

        let url = adapter.page_url(&config.base_url, page)?;
        tracing::debug!(source = adapter.name(), page, %url, "Fetching page");

        let body = match fetcher.fetch(&url).await {
            Ok(fetched) if fetched.is_success() => Some(fetched.body),
            Ok(fetched) => {
                tracing::warn!(
                    source = adapter.name(),
                    page,
                    status = fetched.status,
                    "Page answered with a non-success status"
                );
                None
            }
            Err(e) => {
                tracing::warn!(source = adapter.name(), page, "Page fetch failed: {e}");
                None
            }
        };
        session.record_fetch(body.is_some())?;
        let Some(body) = body else {
            break;
        };

        let candidates = extract_page(adapter, &body, &config.defaults, Utc::now().naive_utc());
        let extracted = candidates.len();
        session.record_extraction(candidates)?;
        if session.is_stopped() {
            break;
        }

        let mut new_on_page = 0;
        for candidate in session.pending() {
            if !JobOffer::exists(pool, &candidate.url).await? {
                new_on_page += 1;
            }
        }
        session.record_evaluation(new_on_page)?;
        progress.page_evaluated(page, extracted, new_on_page);
    }

    let outcome = session.into_outcome()?;
    progress.stopped(outcome.last_page, outcome.stop_reason);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DelayBounds;
    use crate::models::offer::fixtures::new_offer;
    use std::time::Duration;

    fn config(max_pages: u32) -> SessionConfig {
        SessionConfig::new(
            "https://example.org/search?q=stage",
            max_pages,
            DelayBounds::NONE,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn offers(page: u32, n: usize) -> Vec<NewOffer> {
        (0..n)
            .map(|i| new_offer(&format!("https://example.org/offres/{page}-{i}")))
            .collect()
    }

    /// Scripted page: listing count and how many of them are unknown to the store.
    #[derive(Clone, Copy)]
    enum Page {
        Fails,
        Listings { total: usize, new: usize },
    }

    fn run_script(max_pages: u32, script: &[Page]) -> SessionOutcome {
        let mut session = ScrapeSession::new("test", &config(max_pages));
        while let Some(page) = session.next_fetch() {
            let step = script
                .get(page as usize - 1)
                .copied()
                .unwrap_or(Page::Listings { total: 0, new: 0 });
            match step {
                Page::Fails => session.record_fetch(false).unwrap(),
                Page::Listings { total, new } => {
                    session.record_fetch(true).unwrap();
                    session.record_extraction(offers(page, total)).unwrap();
                    if !session.is_stopped() {
                        session.record_evaluation(new).unwrap();
                    }
                }
            }
        }
        session.into_outcome().unwrap()
    }

    #[test]
    fn test_starts_fetching_page_one() {
        let session = ScrapeSession::new("test", &config(3));
        assert_eq!(session.state(), SessionState::Fetching(1));
    }

    #[test]
    fn test_stagnation_stops_on_all_known_page() {
        let full = Page::Listings { total: 4, new: 4 };
        let script = [full, full, Page::Listings { total: 4, new: 0 }, full, full];
        let outcome = run_script(10, &script);
        assert_eq!(outcome.stop_reason, StopReason::Stagnation);
        assert_eq!(outcome.last_page, 3);
        // The stagnant page is not accumulated.
        assert_eq!(outcome.candidates_seen, 8);
        assert_eq!(outcome.candidates.len(), 8);
    }

    #[test]
    fn test_partially_new_page_continues() {
        let script = [
            Page::Listings { total: 4, new: 1 },
            Page::Listings { total: 4, new: 0 },
        ];
        let outcome = run_script(10, &script);
        assert_eq!(outcome.stop_reason, StopReason::Stagnation);
        assert_eq!(outcome.last_page, 2);
        assert_eq!(outcome.candidates_seen, 4);
        assert_eq!(outcome.candidates_new, 1);
    }

    #[test]
    fn test_page_limit_reached() {
        let full = Page::Listings { total: 2, new: 2 };
        let outcome = run_script(3, &[full; 6]);
        assert_eq!(outcome.stop_reason, StopReason::PageLimitReached);
        assert_eq!(outcome.last_page, 3);
        assert_eq!(outcome.candidates_seen, 6);
    }

    #[test]
    fn test_empty_page_and_fetch_failure() {
        let full = Page::Listings { total: 2, new: 2 };
        let outcome = run_script(10, &[full, Page::Listings { total: 0, new: 0 }]);
        assert_eq!(outcome.stop_reason, StopReason::EmptyPage);
        assert_eq!(outcome.last_page, 2);

        let outcome = run_script(10, &[full, Page::Fails, full]);
        assert_eq!(outcome.stop_reason, StopReason::FetchFailed);
        assert_eq!(outcome.last_page, 2);
        assert_eq!(outcome.candidates_seen, 2);
    }

    #[test]
    fn test_stop_page_is_monotonic_in_max_pages() {
        let full = Page::Listings { total: 3, new: 3 };
        let script = [full, full, full, full, Page::Listings { total: 3, new: 0 }, full];
        let mut previous = 0;
        for max_pages in 1..=10 {
            let outcome = run_script(max_pages, &script);
            assert!(outcome.last_page <= max_pages);
            assert!(outcome.last_page >= previous);
            previous = outcome.last_page;
        }
        assert_eq!(previous, 5);
    }

    #[test]
    fn test_cancel_and_invalid_transitions() {
        let mut session = ScrapeSession::new("test", &config(3));
        assert!(session.record_evaluation(1).is_err());
        assert!(session.record_extraction(offers(1, 1)).is_err());
        assert!(ScrapeSession::new("test", &config(3)).into_outcome().is_err());

        session.cancel();
        assert_eq!(
            session.state(),
            SessionState::Stopped(StopReason::Cancelled)
        );
        assert!(session.record_fetch(true).is_err());
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::PageLimitReached.to_string(), "page-limit-reached");
        assert_eq!(
            serde_json::to_value(StopReason::FetchFailed).unwrap(),
            serde_json::json!("fetch-failed")
        );
    }
}
