use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::predicate::looks_like_phone_number;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// One batch of identifiers returned by the listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Page {
    pub ids: Vec<RecordId>,
    pub token: Option<String>,
}

impl Page {
    #[must_use]
    pub fn new(ids: Vec<RecordId>, token: Option<String>) -> Self {
        Self { ids, token }
    }

    /// The continuation token, with an empty string treated the same as an
    /// absent one.
    #[must_use]
    pub fn next_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next_token().is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Display for Page {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "result: ")?;
        for id in &self.ids {
            write!(f, "{id}, ")?;
        }
        if let Some(token) = self.next_token() {
            write!(f, "token: {token}")?;
        }
        Ok(())
    }
}

/// A fully resolved account. `age` is the rank key, `number` the raw field
/// checked by [`Record::is_valid`].
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub age: i64,
    pub number: String,
}

impl Record {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, age: i64, number: impl Into<String>) -> Self {
        Self { id: RecordId(id), name: name.into(), age, number: number.into() }
    }

    #[must_use]
    pub fn rank_key(&self) -> i64 {
        self.age
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        looks_like_phone_number(&self.number)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ID: {}, name: {}, age: {}, number: {}",
            self.id, self.name, self.age, self.number
        )
    }
}

/// Display ordering applied once to the final result.
pub fn sort_by_name(records: &mut [Record]) {
    records.sort_by(|left, right| left.name.cmp(&right.name));
}
