//! Sequential page retrieval.
//!
//! Page N+1 can only be requested once page N has been parsed, so the walk is
//! a single loop. Pages go onto the feed in fetch order, followed by one
//! [`PageFeed::Exhausted`] marker once the chain ends. Page and marker share
//! one FIFO channel: the consumer sees every page before it sees the marker.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::error::SieveError;
use crate::model::Page;
use crate::source::PageSource;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PageFeed {
    Page(Page),
    Exhausted,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct WalkSummary {
    pub pages: usize,
    pub ids: usize,
}

pub struct PageWalker<P> {
    source: Arc<P>,
    retry: RetryPolicy,
}

impl<P: PageSource> PageWalker<P> {
    #[must_use]
    pub fn new(source: Arc<P>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Follows the token chain to its end, sending each page on `feed`.
    ///
    /// # Errors
    /// Fails when a page cannot be fetched within the retry policy, or when
    /// the receiving side of the feed has gone away.
    pub async fn walk(&self, feed: mpsc::Sender<PageFeed>) -> Result<WalkSummary, SieveError> {
        let mut summary = WalkSummary::default();
        let mut token: Option<String> = None;

        loop {
            let page = self.fetch_with_retry(token.as_deref()).await?;
            let next = page.next_token().map(str::to_owned);
            summary.pages += 1;
            summary.ids += page.len();
            debug!(page = %page, "downloaded list");

            feed.send(PageFeed::Page(page)).await.map_err(|_| SieveError::FeedClosed)?;

            match next {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        feed.send(PageFeed::Exhausted).await.map_err(|_| SieveError::FeedClosed)?;
        info!(pages = summary.pages, ids = summary.ids, "all lists downloaded");
        Ok(summary)
    }

    async fn fetch_with_retry(&self, token: Option<&str>) -> Result<Page, SieveError> {
        let mut attempt: u32 = 0;
        loop {
            match self.source.fetch_page(token).await {
                Ok(page) => return Ok(page),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        token = token.unwrap_or("<first page>"),
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "page fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(SieveError::PageRetrieval {
                        token: token.map(str::to_owned),
                        attempts: attempt.saturating_add(1),
                        source: err,
                    });
                }
            }
        }
    }
}
