use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::ConfigError;

pub const DEFAULT_RESULT_LIMIT: usize = 5;
pub const DEFAULT_FEED_CAPACITY: usize = 16;

/// Retry schedule for page retrieval. Delays grow linearly with the attempt.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, retry_delay_ms: 500 }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self { max_retries: 0, retry_delay_ms: 0 }
    }

    /// Delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(u64::from(attempt) + 1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// K: how many accounts the result keeps.
    pub result_limit: usize,
    /// Cap on in-flight detail fetches per page. `None` fans out one task
    /// per identifier.
    pub max_concurrent_details: Option<usize>,
    /// Pages the walker may fetch ahead of the consumer.
    pub feed_capacity: usize,
    pub page_retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            result_limit: DEFAULT_RESULT_LIMIT,
            max_concurrent_details: None,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            page_retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// # Errors
    /// Returns an error when a capacity is zero or larger than a tokio
    /// semaphore can hold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_capacity == 0 {
            return Err(ConfigError::Zero { field: "feed_capacity" });
        }
        if self.max_concurrent_details == Some(0) {
            return Err(ConfigError::Zero { field: "max_concurrent_details" });
        }
        // Both values size a tokio semaphore (the feed's bounded channel and
        // the detail permits), which panics above this limit.
        if self.feed_capacity > Semaphore::MAX_PERMITS {
            return Err(ConfigError::TooLarge {
                field: "feed_capacity",
                max: Semaphore::MAX_PERMITS,
            });
        }
        if self.max_concurrent_details.is_some_and(|limit| limit > Semaphore::MAX_PERMITS) {
            return Err(ConfigError::TooLarge {
                field: "max_concurrent_details",
                max: Semaphore::MAX_PERMITS,
            });
        }
        Ok(())
    }
}
