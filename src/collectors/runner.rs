use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::collectors::SourceAdapter;
use crate::collectors::session::{StopReason, paginate};
use crate::config::SessionConfig;
use crate::error::AppError;
use crate::fetch::PageFetcher;
use crate::gate::{GateCounts, PersistenceGate};

/// Progress of a running session, relayed to whoever displays it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    PageEvaluated {
        page: u32,
        extracted: usize,
        new_on_page: usize,
    },
    Stopped {
        page: u32,
        reason: StopReason,
    },
    Persisted(GateCounts),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub session_id: Uuid,
    pub source: String,
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// One-way log sink for a session. Events go to tracing and, if a receiver
/// is attached, down the channel; a dropped receiver is ignored.
pub struct Progress {
    session_id: Uuid,
    source: String,
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Progress {
    pub fn new(source: &str, tx: Option<mpsc::UnboundedSender<ProgressEvent>>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            source: source.to_string(),
            tx,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn page_evaluated(&self, page: u32, extracted: usize, new_on_page: usize) {
        tracing::info!(
            session = %self.session_id,
            source = %self.source,
            "Page {page}: {extracted} offers, {new_on_page} new"
        );
        self.emit(SessionEvent::PageEvaluated {
            page,
            extracted,
            new_on_page,
        });
    }

    pub fn stopped(&self, page: u32, reason: StopReason) {
        tracing::info!(
            session = %self.session_id,
            source = %self.source,
            "Stopped at page {page}: {reason}"
        );
        self.emit(SessionEvent::Stopped { page, reason });
    }

    pub fn persisted(&self, counts: GateCounts) {
        tracing::info!(
            session = %self.session_id,
            source = %self.source,
            "{} inserted, {} skipped, {} failed",
            counts.inserted,
            counts.skipped,
            counts.failed
        );
        self.emit(SessionEvent::Persisted(counts));
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent {
                session_id: self.session_id,
                source: self.source.clone(),
                event,
            });
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub source: String,
    pub stop_reason: StopReason,
    pub last_page: u32,
    pub candidates_seen: usize,
    pub candidates_new: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Run one source end to end: paginate, then push the accumulated
/// candidates through the gate.
pub async fn run_session(
    pool: &SqlitePool,
    adapter: &dyn SourceAdapter,
    fetcher: &dyn PageFetcher,
    config: &SessionConfig,
    stop: &AtomicBool,
    progress: &Progress,
) -> Result<SessionSummary, AppError> {
    tracing::info!(
        session = %progress.session_id(),
        source = adapter.name(),
        base_url = %config.base_url,
        max_pages = config.max_pages,
        "Starting scrape session"
    );

    let outcome = paginate(adapter, fetcher, pool, config, stop, progress).await?;
    let counts = PersistenceGate::new(pool)
        .insert_all(&outcome.candidates)
        .await;
    progress.persisted(counts);

    Ok(SessionSummary {
        session_id: progress.session_id(),
        source: outcome.source,
        stop_reason: outcome.stop_reason,
        last_page: outcome.last_page,
        candidates_seen: outcome.candidates_seen,
        candidates_new: outcome.candidates_new,
        inserted: counts.inserted,
        skipped: counts.skipped,
        failed: counts.failed,
    })
}

/// A session running on a background task.
pub struct SessionHandle {
    pub session_id: Uuid,
    pub stop: Arc<AtomicBool>,
    pub events: mpsc::UnboundedReceiver<ProgressEvent>,
    pub task: JoinHandle<Result<SessionSummary, AppError>>,
}

/// Spawn a session onto the runtime. Progress arrives on `events`; raising
/// `stop` ends the session before its next page.
pub fn spawn_session(
    pool: SqlitePool,
    adapter: Arc<dyn SourceAdapter>,
    fetcher: Arc<dyn PageFetcher>,
    config: SessionConfig,
) -> SessionHandle {
    let (tx, events) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));
    let progress = Progress::new(adapter.name(), Some(tx));
    let session_id = progress.session_id();

    let task_stop = stop.clone();
    let task = tokio::spawn(async move {
        let result = run_session(
            &pool,
            &*adapter,
            &*fetcher,
            &config,
            &task_stop,
            &progress,
        )
        .await;
        if let Err(e) = &result {
            tracing::error!(session = %session_id, "Scrape session failed: {e}");
        }
        result
    });

    SessionHandle {
        session_id,
        stop,
        events,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::hellowork::HelloWork;
    use crate::collectors::hellowork::fixtures::{listing, page};
    use crate::config::DelayBounds;
    use crate::db::memory_pool;
    use crate::models::offer::JobOffer;
    use crate::testing::StaticFetcher;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const BASE: &str = "https://www.hellowork.com/fr-fr/emploi/recherche.html?c=Stage";

    fn page_url(n: u32) -> String {
        format!("{BASE}&p={n}")
    }

    fn result_page(n: u32, per_page: usize) -> String {
        let items: Vec<String> = (0..per_page)
            .map(|i| listing(&format!("/fr-fr/emplois/{n}{i}.html"), "Stage", "Acme"))
            .collect();
        page(&items)
    }

    fn config(max_pages: u32) -> SessionConfig {
        SessionConfig::new(BASE, max_pages, DelayBounds::NONE, Duration::from_secs(5)).unwrap()
    }

    fn fetcher_with_pages(pages: u32, per_page: usize) -> StaticFetcher {
        (1..=pages).fold(StaticFetcher::new(), |f, n| {
            f.with_page(&page_url(n), &result_page(n, per_page))
        })
    }

    async fn run(pool: &SqlitePool, fetcher: &StaticFetcher, max_pages: u32) -> SessionSummary {
        let stop = AtomicBool::new(false);
        run_session(
            pool,
            &HelloWork,
            fetcher,
            &config(max_pages),
            &stop,
            &Progress::new("hellowork", None),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_stagnant_page_stops_before_next_fetch() {
        let pool = memory_pool().await;

        // Pages 1-2 are fresh; page 3 only repeats offers stored by a previous run.
        let mut fetcher = fetcher_with_pages(2, 3);
        let stale = result_page(90, 3);
        let fake_url = |i: usize| format!("https://www.hellowork.com/fr-fr/emplois/90{i}.html");
        for i in 0..3 {
            let mut offer = crate::models::offer::fixtures::new_offer(&fake_url(i));
            offer.titre = "Déjà vu".to_string();
            JobOffer::insert_if_absent(&pool, &offer).await.unwrap();
        }
        fetcher = fetcher
            .with_page(&page_url(3), &stale)
            .with_page(&page_url(4), &result_page(4, 3));

        let summary = run(&pool, &fetcher, 10).await;

        assert_eq!(summary.stop_reason, StopReason::Stagnation);
        assert_eq!(summary.last_page, 3);
        assert_eq!(fetcher.calls(), [page_url(1), page_url(2), page_url(3)]);
        assert_eq!(summary.inserted, 6);
        assert_eq!(
            summary.inserted + summary.skipped + summary.failed,
            summary.candidates_seen
        );
    }

    #[tokio::test]
    async fn test_rerun_against_unchanged_source_inserts_nothing() {
        let pool = memory_pool().await;
        let fetcher = fetcher_with_pages(3, 2);

        let first = run(&pool, &fetcher, 3).await;
        assert_eq!(first.stop_reason, StopReason::PageLimitReached);
        assert_eq!(first.inserted, 6);
        assert_eq!(first.candidates_seen, 6);

        let second = run(&pool, &fetcher, 3).await;
        assert_eq!(second.inserted, 0);
        assert_eq!(second.stop_reason, StopReason::Stagnation);
        assert_eq!(second.last_page, 1);
        assert_eq!(second.inserted + second.skipped, second.candidates_seen);
        assert_eq!(JobOffer::count(&pool).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_non_success_status_stops_session() {
        let pool = memory_pool().await;
        let fetcher = fetcher_with_pages(1, 2).with_status(&page_url(2), 503);

        let summary = run(&pool, &fetcher, 5).await;
        assert_eq!(summary.stop_reason, StopReason::FetchFailed);
        assert_eq!(summary.last_page, 2);
        assert_eq!(summary.inserted, 2);
    }

    #[tokio::test]
    async fn test_transport_error_and_empty_page_stop_session() {
        let pool = memory_pool().await;
        let fetcher = StaticFetcher::new().with_error(&page_url(1), "connection reset");
        let summary = run(&pool, &fetcher, 5).await;
        assert_eq!(summary.stop_reason, StopReason::FetchFailed);
        assert_eq!(summary.candidates_seen, 0);

        let fetcher = fetcher_with_pages(1, 2).with_page(&page_url(2), &page(&[]));
        let summary = run(&pool, &fetcher, 5).await;
        assert_eq!(summary.stop_reason, StopReason::EmptyPage);
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_raised_stop_flag_cancels_before_first_fetch() {
        let pool = memory_pool().await;
        let fetcher = fetcher_with_pages(2, 2);
        let stop = AtomicBool::new(true);
        let summary = run_session(
            &pool,
            &HelloWork,
            &fetcher,
            &config(2),
            &stop,
            &Progress::new("hellowork", None),
        )
        .await
        .unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_session_reports_progress() {
        let pool = memory_pool().await;
        let fetcher = Arc::new(fetcher_with_pages(2, 2));
        let mut handle = spawn_session(pool.clone(), Arc::new(HelloWork), fetcher, config(2));

        let summary = handle.task.await.unwrap().unwrap();
        assert_eq!(summary.session_id, handle.session_id);
        assert!(!handle.stop.load(Ordering::Relaxed));

        let mut events = Vec::new();
        while let Ok(event) = handle.events.try_recv() {
            assert_eq!(event.session_id, handle.session_id);
            events.push(event.event);
        }
        assert_eq!(
            events,
            [
                SessionEvent::PageEvaluated {
                    page: 1,
                    extracted: 2,
                    new_on_page: 2
                },
                SessionEvent::PageEvaluated {
                    page: 2,
                    extracted: 2,
                    new_on_page: 2
                },
                SessionEvent::Stopped {
                    page: 2,
                    reason: StopReason::PageLimitReached
                },
                SessionEvent::Persisted(GateCounts {
                    inserted: 4,
                    skipped: 0,
                    failed: 0
                }),
            ]
        );
    }
}
