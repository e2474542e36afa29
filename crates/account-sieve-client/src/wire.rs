//! Response bodies of the remote service.

use account_sieve_core::{Page, Record, RecordId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    #[serde(default)]
    result: Option<Vec<i64>>,
    #[serde(default)]
    token: Option<String>,
}

impl From<ListResponse> for Page {
    fn from(body: ListResponse) -> Self {
        let ids = body.result.unwrap_or_default().into_iter().map(RecordId).collect();
        Page::new(ids, body.token)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailResponse {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    age: i64,
    #[serde(default)]
    number: Option<String>,
}

impl From<DetailResponse> for Record {
    fn from(body: DetailResponse) -> Self {
        Record::new(body.id, body.name.unwrap_or_default(), body.age, body.number.unwrap_or_default())
    }
}
