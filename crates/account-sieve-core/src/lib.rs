//! Paged account retrieval with a bounded, concurrently folded top-K result.
//!
//! Pages of identifiers are fetched one after another by following
//! continuation tokens; each page's identifiers are resolved concurrently and
//! the accounts with a plausible phone number are folded into a shared
//! [`TopKAccumulator`] ranked by age. The final result is sorted by name.

mod config;
mod error;
mod model;
mod pipeline;
mod predicate;
mod resolver;
mod source;
mod topk;
mod walker;

#[cfg(test)]
mod fixtures;

pub use config::{PipelineConfig, RetryPolicy, DEFAULT_FEED_CAPACITY, DEFAULT_RESULT_LIMIT};
pub use error::{ConfigError, FetchError, SieveError};
pub use model::{sort_by_name, Page, Record, RecordId};
pub use pipeline::{Pipeline, PipelineHandle, PipelineOutcome, PipelineState, PipelineStats};
pub use predicate::{looks_like_phone_number, PHONE_NUMBER_PATTERN};
pub use resolver::{DetailResolver, PageReport};
pub use source::{DetailSource, PageSource};
pub use topk::TopKAccumulator;
pub use walker::{PageFeed, PageWalker, WalkSummary};
