//! Per-page detail resolution.
//!
//! Every identifier of a page is resolved on its own task. Once all of them
//! have been attempted, the valid records are folded into the accumulator in
//! one call, in page order, so equal ages keep the record listed first.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::model::{Page, Record};
use crate::source::DetailSource;
use crate::topk::TopKAccumulator;

/// Counters for one resolved page.
#[derive(Debug, Clone, Copy, Default, Serialize, Eq, PartialEq)]
pub struct PageReport {
    pub requested: usize,
    pub resolved: usize,
    /// Resolved, but failed the phone-number check.
    pub rejected: usize,
    /// Detail fetch failed; the identifier was dropped.
    pub failed: usize,
    /// Entered the kept set during this page's fold.
    pub admitted: usize,
}

pub struct DetailResolver<D> {
    source: Arc<D>,
    permits: Option<Arc<Semaphore>>,
}

impl<D: DetailSource> DetailResolver<D> {
    #[must_use]
    pub fn new(source: Arc<D>, max_concurrent: Option<usize>) -> Self {
        let permits = max_concurrent.map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        Self { source, permits }
    }

    /// Resolves every identifier of `page` and folds the valid records into
    /// `accumulator`. Failed identifiers are logged and skipped.
    pub async fn resolve_page(&self, page: &Page, accumulator: &TopKAccumulator) -> PageReport {
        let mut report = PageReport { requested: page.len(), ..PageReport::default() };
        let mut tasks = JoinSet::new();

        for (position, &id) in page.ids.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let permits = self.permits.clone();
            tasks.spawn(async move {
                let _permit = match permits {
                    Some(permits) => permits.acquire_owned().await.ok(),
                    None => None,
                };
                (position, id, source.fetch_detail(id).await)
            });
        }

        let mut survivors: Vec<(usize, Record)> = Vec::with_capacity(page.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, _, Ok(record))) => {
                    report.resolved += 1;
                    debug!(account = %record, "retrieved account");
                    if record.is_valid() {
                        survivors.push((position, record));
                    } else {
                        report.rejected += 1;
                    }
                }
                Ok((_, id, Err(err))) => {
                    report.failed += 1;
                    warn!(id = %id, error = %err, "dropping account after failed detail fetch");
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(error = %err, "detail task did not complete");
                }
            }
        }

        survivors.sort_by_key(|(position, _)| *position);
        report.admitted = accumulator.fold(survivors.into_iter().map(|(_, record)| record));
        report
    }
}
