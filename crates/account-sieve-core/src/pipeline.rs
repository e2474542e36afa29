//! Coordinator driving page retrieval and detail resolution side by side.
//!
//! The walker runs on its own task and feeds pages through a bounded channel.
//! The consumption loop takes one page at a time and does not receive the
//! next one until the current page's fan-out and fold are finished. No lock
//! is held while waiting on the feed.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::error::SieveError;
use crate::model::{sort_by_name, Record};
use crate::resolver::{DetailResolver, PageReport};
use crate::source::{DetailSource, PageSource};
use crate::topk::TopKAccumulator;
use crate::walker::{PageFeed, PageWalker};

#[derive(Debug, Clone, Copy, Serialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Running,
    Draining,
    Done,
}

impl PipelineState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Eq, PartialEq)]
pub struct PipelineStats {
    pub pages: usize,
    pub requested: usize,
    pub resolved: usize,
    pub rejected: usize,
    pub failed: usize,
    pub admitted: usize,
}

impl PipelineStats {
    fn absorb(&mut self, report: &PageReport) {
        self.pages += 1;
        self.requested += report.requested;
        self.resolved += report.resolved;
        self.rejected += report.rejected;
        self.failed += report.failed;
        self.admitted += report.admitted;
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Kept accounts, sorted by name.
    pub records: Vec<Record>,
    pub elapsed: Duration,
    pub stats: PipelineStats,
    /// Set when page retrieval stopped before the token chain ended. The
    /// records are then the best of the pages that did arrive.
    pub incomplete: Option<String>,
}

impl PipelineOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_none()
    }
}

/// Room for every transition of one run (`Running`, `Draining`, `Done`).
const TRANSITION_BUFFER: usize = 4;

pub struct Pipeline<P, D> {
    pages: Arc<P>,
    details: Arc<D>,
    config: PipelineConfig,
    accumulator: Arc<TopKAccumulator>,
    state: watch::Sender<PipelineState>,
    transitions: broadcast::Sender<PipelineState>,
}

impl<P: PageSource, D: DetailSource> Pipeline<P, D> {
    #[must_use]
    pub fn new(pages: P, details: D, config: PipelineConfig) -> Self {
        Self::from_shared(Arc::new(pages), Arc::new(details), config)
    }

    /// Builds a pipeline from sources that are already shared, e.g. one HTTP
    /// client serving both endpoints.
    #[must_use]
    pub fn from_shared(pages: Arc<P>, details: Arc<D>, config: PipelineConfig) -> Self {
        let accumulator = Arc::new(TopKAccumulator::new(config.result_limit));
        let (state, _) = watch::channel(PipelineState::Idle);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self { pages, details, config, accumulator, state, transitions }
    }

    /// Latest state only; updates sent close together collapse into the
    /// last one. Use [`Pipeline::transitions`] to see each step.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Every state entered after this call, in order. The channel closes
    /// once the run is over.
    #[must_use]
    pub fn transitions(&self) -> broadcast::Receiver<PipelineState> {
        self.transitions.subscribe()
    }

    /// Live view of the running result.
    #[must_use]
    pub fn accumulator(&self) -> Arc<TopKAccumulator> {
        Arc::clone(&self.accumulator)
    }

    /// Runs the pipeline to completion.
    ///
    /// A failed page walk does not fail the run: pages already fed are still
    /// processed and the outcome is marked incomplete.
    ///
    /// # Errors
    /// Returns an error only for an invalid configuration.
    pub async fn run(self) -> Result<PipelineOutcome, SieveError> {
        self.config.validate()?;
        let started = Instant::now();

        let (feed_tx, mut feed_rx) = mpsc::channel(self.config.feed_capacity);
        let walker = PageWalker::new(Arc::clone(&self.pages), self.config.page_retry.clone());
        self.transition(PipelineState::Running);
        info!(
            result_limit = self.config.result_limit,
            max_concurrent_details = ?self.config.max_concurrent_details,
            "pipeline started"
        );
        let producer = tokio::spawn(async move { walker.walk(feed_tx).await });

        let resolver =
            DetailResolver::new(Arc::clone(&self.details), self.config.max_concurrent_details);
        let mut stats = PipelineStats::default();
        let mut exhausted = false;

        while let Some(item) = feed_rx.recv().await {
            match item {
                PageFeed::Page(page) => {
                    debug!(ids = page.len(), "processing list");
                    let report = resolver.resolve_page(&page, &self.accumulator).await;
                    debug!(
                        resolved = report.resolved,
                        rejected = report.rejected,
                        failed = report.failed,
                        kept = self.accumulator.len(),
                        "list processed"
                    );
                    stats.absorb(&report);
                }
                PageFeed::Exhausted => {
                    // FIFO: every page sent before the marker is already done.
                    exhausted = true;
                    self.transition(PipelineState::Draining);
                }
            }
        }

        let incomplete = match producer.await {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => {
                error!(error = %err, "page retrieval aborted, reporting partial results");
                Some(err.to_string())
            }
            Err(err) => {
                error!(error = %err, "page retrieval task did not complete");
                Some(format!("page retrieval task did not complete: {err}"))
            }
        };
        if !exhausted {
            self.transition(PipelineState::Draining);
        }

        let mut records = self.accumulator.snapshot();
        sort_by_name(&mut records);
        let outcome = PipelineOutcome { records, elapsed: started.elapsed(), stats, incomplete };
        info!(
            pages = stats.pages,
            kept = outcome.records.len(),
            elapsed_ms = u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            "all accounts processed"
        );
        self.transition(PipelineState::Done);
        Ok(outcome)
    }

    /// Starts the pipeline on its own task. The outcome is delivered once,
    /// through [`PipelineHandle::wait`].
    #[must_use]
    pub fn spawn(self) -> PipelineHandle {
        let state = self.subscribe();
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = done_tx.send(self.run().await);
        });
        PipelineHandle { state, done: done_rx }
    }

    fn transition(&self, next: PipelineState) {
        let previous = self.state.send_replace(next);
        // No subscriber is not an error.
        let _ = self.transitions.send(next);
        debug!(from = %previous, to = %next, "pipeline state");
    }
}

pub struct PipelineHandle {
    state: watch::Receiver<PipelineState>,
    done: oneshot::Receiver<Result<PipelineOutcome, SieveError>>,
}

impl PipelineHandle {
    #[must_use]
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.clone()
    }

    /// Blocks until the pipeline reaches `Done`.
    ///
    /// # Errors
    /// Propagates the pipeline's own error, or [`SieveError::Aborted`] when
    /// the pipeline task ended without sending an outcome.
    pub async fn wait(self) -> Result<PipelineOutcome, SieveError> {
        self.done.await.map_err(|_| SieveError::Aborted)?
    }
}
