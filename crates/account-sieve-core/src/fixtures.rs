//! In-memory sources used by the unit tests of this crate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::FetchError;
use crate::model::{Page, Record, RecordId};
use crate::source::{DetailSource, PageSource};

pub(crate) fn valid(id: i64, name: &str, age: i64) -> Record {
    Record::new(id, name, age, "(555) 123-4567")
}

pub(crate) fn invalid(id: i64, name: &str, age: i64) -> Record {
    Record::new(id, name, age, "unlisted")
}

pub(crate) fn page(ids: &[i64], token: &str) -> Page {
    Page::new(ids.iter().copied().map(RecordId).collect(), Some(token.to_string()))
}

/// Serves a fixed page chain, keyed by the token that requests each page.
pub(crate) struct ScriptedPages {
    pages: HashMap<Option<String>, Page>,
    failures: Mutex<HashMap<Option<String>, VecDeque<FetchError>>>,
    calls: Mutex<Vec<Option<String>>>,
    delay: Duration,
}

impl ScriptedPages {
    pub(crate) fn chain(pages: Vec<Page>) -> Self {
        let mut keyed = HashMap::new();
        let mut request_token: Option<String> = None;
        for page in pages {
            let next = page.next_token().map(str::to_owned);
            keyed.insert(request_token, page);
            request_token = next;
        }
        Self {
            pages: keyed,
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn failing(self, token: Option<&str>, errors: Vec<FetchError>) -> Self {
        self.failures.lock().insert(token.map(str::to_owned), errors.into());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().clone()
    }
}

impl PageSource for ScriptedPages {
    async fn fetch_page(&self, token: Option<&str>) -> Result<Page, FetchError> {
        let key = token.map(str::to_owned);
        self.calls.lock().push(key.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let injected = self.failures.lock().get_mut(&key).and_then(VecDeque::pop_front);
        if let Some(err) = injected {
            return Err(err);
        }
        self.pages.get(&key).cloned().ok_or_else(|| FetchError::Status {
            status: 400,
            url: format!("memory://list?token={}", key.unwrap_or_default()),
        })
    }
}

/// Resolves identifiers from a map and tracks peak concurrency.
#[derive(Default)]
pub(crate) struct MemoryDetails {
    records: HashMap<RecordId, Record>,
    failing: HashSet<RecordId>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryDetails {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter().map(|record| (record.id, record)).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn failing(mut self, ids: &[i64]) -> Self {
        self.failing.extend(ids.iter().copied().map(RecordId));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl DetailSource for MemoryDetails {
    async fn fetch_detail(&self, id: RecordId) -> Result<Record, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&id) {
            return Err(FetchError::Transport(format!("connection reset fetching {id}")));
        }
        self.records.get(&id).cloned().ok_or_else(|| FetchError::Status {
            status: 404,
            url: format!("memory://detail/{id}"),
        })
    }
}
