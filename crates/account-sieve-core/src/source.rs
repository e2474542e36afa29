//! Seams between the pipeline and the remote service.

use std::future::Future;

use crate::error::FetchError;
use crate::model::{Page, Record, RecordId};

/// Listing endpoint. `token` is `None` for the first page and the previous
/// page's continuation token afterwards.
pub trait PageSource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        token: Option<&str>,
    ) -> impl Future<Output = Result<Page, FetchError>> + Send;
}

/// Detail endpoint resolving one identifier to its account.
pub trait DetailSource: Send + Sync + 'static {
    fn fetch_detail(&self, id: RecordId) -> impl Future<Output = Result<Record, FetchError>> + Send;
}
