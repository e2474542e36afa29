use std::collections::HashSet;
use std::path::Path;

use account_sieve_core::{Page, Record, RecordId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 3;
const TOKEN_PREFIX: char = 'c';

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse dataset {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("page_size must be greater than zero")]
    ZeroPageSize,
    #[error("duplicate account id {0}")]
    DuplicateId(RecordId),
}

/// Accounts served by the fixture, in listing order.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Dataset {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    pub accounts: Vec<Record>,
    /// Ids that are listed but whose detail endpoint answers 503.
    #[serde(default)]
    pub unavailable: Vec<RecordId>,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Dataset {
    /// # Errors
    /// Rejects a zero page size and duplicate account ids.
    pub fn new(page_size: usize, accounts: Vec<Record>) -> Result<Self, DatasetError> {
        let dataset = Self { page_size, accounts, unavailable: Vec::new() };
        dataset.validate()?;
        Ok(dataset)
    }

    #[must_use]
    pub fn with_unavailable(mut self, ids: &[i64]) -> Self {
        self.unavailable.extend(ids.iter().copied().map(RecordId));
        self
    }

    /// # Errors
    /// Fails when the file cannot be read, is not a dataset document, or does
    /// not validate.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let display = path.display().to_string();
        let body = std::fs::read_to_string(path)
            .map_err(|source| DatasetError::Read { path: display.clone(), source })?;
        let dataset: Self = serde_json::from_str(&body)
            .map_err(|source| DatasetError::Parse { path: display, source })?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Small built-in dataset for local runs without a dataset file.
    #[must_use]
    pub fn sample() -> Self {
        let accounts = vec![
            Record::new(1, "Ruth Alvarez", 34, "(415) 555-0134"),
            Record::new(2, "Noah Becker", 27, "415-555-0199"),
            Record::new(3, "Ivy Chen", 19, "not provided"),
            Record::new(4, "Omar Diallo", 52, "4155550142"),
            Record::new(5, "Lena Eriksen", 23, "(415)555-0175"),
            Record::new(6, "Theo Fischer", 31, "555-01"),
            Record::new(7, "Maya Gupta", 45, "415 555 0123"),
            Record::new(8, "Sam Hughes", 21, "(415) 555-0110"),
            Record::new(9, "Ada Ibsen", 38, "415-555-0188"),
            Record::new(10, "Kai Jensen", 29, "+1 (415) 555-0161"),
        ];
        Self { page_size: DEFAULT_PAGE_SIZE, accounts, unavailable: Vec::new() }
    }

    /// # Errors
    /// Rejects a zero page size and duplicate account ids.
    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.page_size == 0 {
            return Err(DatasetError::ZeroPageSize);
        }
        let mut seen = HashSet::with_capacity(self.accounts.len());
        for account in &self.accounts {
            if !seen.insert(account.id) {
                return Err(DatasetError::DuplicateId(account.id));
            }
        }
        Ok(())
    }

    /// The page a token points at; `None` for a token this dataset never
    /// issued.
    #[must_use]
    pub fn page(&self, token: Option<&str>) -> Option<Page> {
        let offset = match token {
            None => 0,
            Some(token) => self.decode_token(token)?,
        };
        let end = offset.saturating_add(self.page_size).min(self.accounts.len());
        let ids = self.accounts[offset..end].iter().map(|account| account.id).collect();
        let next = (end < self.accounts.len()).then(|| encode_token(end));
        Some(Page::new(ids, next))
    }

    #[must_use]
    pub fn account(&self, id: RecordId) -> Option<&Record> {
        self.accounts.iter().find(|account| account.id == id)
    }

    #[must_use]
    pub fn is_unavailable(&self, id: RecordId) -> bool {
        self.unavailable.contains(&id)
    }

    fn decode_token(&self, token: &str) -> Option<usize> {
        let offset = usize::from_str_radix(token.strip_prefix(TOKEN_PREFIX)?, 16).ok()?;
        let on_boundary = offset % self.page_size == 0;
        (offset > 0 && offset < self.accounts.len() && on_boundary).then_some(offset)
    }
}

fn encode_token(offset: usize) -> String {
    format!("{TOKEN_PREFIX}{offset:08x}")
}
