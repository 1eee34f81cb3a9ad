//! Bounded-concurrency dispatch of comic pipelines.
//!
//! One task per non-skipped comic, gated by a semaphore so at most
//! `concurrency` pipelines run their network stages at once. The permit is
//! held from just before stage one until the pipeline reaches a terminal
//! state and is released on every exit path (RAII), so a failing pipeline
//! can never deadlock the limiter. The dispatcher joins every task before
//! reporting, so the final counters are complete.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::pipeline::{self, FetchState, PipelineEnv};
use crate::comic::ComicSpec;
use crate::schedule::{self, RunContext};

/// Default concurrency limit if the config does not set `threads`.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Error type for dispatcher construction.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Invalid concurrency value provided.
    #[error("invalid concurrency value {value}: must be at least 1")]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// A comic that finished without output, listed after the summary line.
#[derive(Debug, Clone)]
pub struct Miss {
    /// The comic's landing-page URL.
    pub url: String,
    /// Its configured output name.
    pub output_name: String,
}

/// Aggregate result of one run.
#[derive(Debug)]
pub struct RunSummary {
    /// Number of configured comics.
    pub total: usize,
    /// Comics fetched (or links recorded).
    pub got: usize,
    /// Comics skipped by the weekday gate.
    pub skipped: usize,
    /// Comics that reached a failed terminal state.
    pub failed: usize,
    /// The failed comics, in completion order.
    pub misses: Vec<Miss>,
}

/// Live per-comic state, published by each pipeline and readable at any time
/// by a status-reporting task outside the pipelines.
#[derive(Debug, Clone)]
pub struct ComicStatus {
    /// The comic's landing-page URL.
    pub url: String,
    /// Current pipeline state.
    pub state: FetchState,
}

/// Lock-protected table of per-comic pipeline states.
///
/// Each update is a short critical section; a snapshot never blocks on
/// network activity.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: Mutex<BTreeMap<u32, ComicStatus>>,
}

impl StatusBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a comic as queued (dispatched but no slot acquired yet).
    pub fn register(&self, id: u32, url: String) {
        self.lock().insert(
            id,
            ComicStatus {
                url,
                state: FetchState::Queued,
            },
        );
    }

    /// Updates a comic's state. Unregistered ids are ignored.
    pub(crate) fn set_state(&self, id: u32, state: FetchState) {
        if let Some(status) = self.lock().get_mut(&id) {
            status.state = state;
        }
    }

    /// Returns a copy of every registered comic's status, ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(u32, ComicStatus)> {
        self.lock().iter().map(|(id, s)| (*id, s.clone())).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u32, ComicStatus>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs every non-skipped comic's pipeline under a global concurrency bound.
pub struct Dispatcher {
    env: Arc<PipelineEnv>,
    concurrency: usize,
    board: Arc<StatusBoard>,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidConcurrency`] for a zero limit.
    pub fn new(env: PipelineEnv, concurrency: usize) -> Result<Self, DispatchError> {
        if concurrency == 0 {
            return Err(DispatchError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self {
            env: Arc::new(env),
            concurrency,
            board: Arc::new(StatusBoard::new()),
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the shared status board, for wiring up a status-dump task.
    #[must_use]
    pub fn status_board(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.board)
    }

    /// Runs all comics to terminal states and returns the aggregate summary.
    ///
    /// Comics whose skip calendar marks today are counted as skipped and
    /// never dispatched. Completion order is nondeterministic; this method
    /// returns only after every dispatched pipeline has finished.
    pub async fn run(&self, specs: Vec<ComicSpec>, ctx: &RunContext) -> RunSummary {
        let total = specs.len();
        let mut skipped = 0usize;

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let got = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let misses: Arc<Mutex<Vec<Miss>>> = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        info!(total, concurrency = self.concurrency, "starting run");

        for spec in specs {
            if schedule::should_skip(&spec, ctx.weekday) {
                debug!(url = %spec.url, "skipping today");
                skipped += 1;
                continue;
            }

            self.board.register(spec.id, spec.url.clone());

            let semaphore = Arc::clone(&semaphore);
            let env = Arc::clone(&self.env);
            let board = Arc::clone(&self.board);
            let got = Arc::clone(&got);
            let failed = Arc::clone(&failed);
            let misses = Arc::clone(&misses);

            handles.push(tokio::spawn(async move {
                // Held until the pipeline reaches a terminal state (RAII).
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    // The semaphore is never closed during a run; count the
                    // comic as failed rather than losing it.
                    board.set_state(spec.id, FetchState::Failed);
                    failed.fetch_add(1, Ordering::SeqCst);
                    return;
                };

                debug!(url = %spec.url, "starting");
                let outcome = pipeline::run(&env, &spec, &board).await;
                if outcome.is_fetched() {
                    got.fetch_add(1, Ordering::SeqCst);
                } else {
                    failed.fetch_add(1, Ordering::SeqCst);
                    misses
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(Miss {
                            url: spec.url.clone(),
                            output_name: spec.output_name.clone(),
                        });
                }
                debug!(url = %spec.url, ?outcome, "done");
            }));
        }

        for handle in handles {
            // Task panics are logged but don't abort the run.
            if let Err(e) = handle.await {
                warn!(error = %e, "pipeline task panicked");
            }
        }

        let got = got.load(Ordering::SeqCst);
        let failed = failed.load(Ordering::SeqCst);
        let misses = std::mem::take(&mut *misses.lock().unwrap_or_else(PoisonError::into_inner));
        info!(got, failed, skipped, total, "run complete");

        RunSummary {
            total,
            got,
            skipped,
            failed,
            misses,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn empty_env() -> PipelineEnv {
        use crate::fetch::{FetchError, FetchResponse, Fetcher};
        use crate::store::FsStore;

        struct NeverFetch;
        #[async_trait::async_trait]
        impl Fetcher for NeverFetch {
            async fn fetch(
                &self,
                url: &str,
                _referer: Option<&str>,
            ) -> Result<FetchResponse, FetchError> {
                Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
        }

        PipelineEnv {
            fetcher: Arc::new(NeverFetch),
            store: Arc::new(FsStore::new()),
            comics_dir: std::path::PathBuf::from("."),
            index_dir: std::path::PathBuf::from("."),
            links: None,
        }
    }

    #[test]
    fn test_dispatcher_rejects_zero_concurrency() {
        let result = Dispatcher::new(empty_env(), 0);
        assert!(matches!(
            result,
            Err(DispatchError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_dispatcher_stores_concurrency() {
        let dispatcher = Dispatcher::new(empty_env(), 7).unwrap();
        assert_eq!(dispatcher.concurrency(), 7);
    }

    #[test]
    fn test_status_board_snapshot_ordered_by_id() {
        let board = StatusBoard::new();
        board.register(2, "http://b.com".to_string());
        board.register(0, "http://a.com".to_string());
        board.set_state(0, FetchState::Fetching);

        let snapshot = board.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, 0);
        assert_eq!(snapshot[0].1.state, FetchState::Fetching);
        assert_eq!(snapshot[1].0, 2);
        assert_eq!(snapshot[1].1.state, FetchState::Queued);
    }

    #[test]
    fn test_status_board_ignores_unregistered_id() {
        let board = StatusBoard::new();
        board.set_state(9, FetchState::Done);
        assert!(board.snapshot().is_empty());
    }
}
