use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Opaque pagination cursor. Callers pass it back verbatim to fetch the next
/// page; the contents are an implementation detail of the query that issued
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

/// Keyset position inside an ordered result sequence: `(rank, id)` for
/// search queries, `(id)` for index scans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct CursorKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<f64>,
    pub id: i64,
}

impl Cursor {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn encode(key: CursorKey) -> Self {
        // CursorKey serialization cannot fail
        Self(serde_json::to_string(&key).unwrap())
    }

    pub(crate) fn decode(&self) -> Result<CursorKey> {
        serde_json::from_str(&self.0)
            .map_err(|_| TaskError::Invalid(format!("malformed cursor '{}'", self.0)).into())
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub cursor: Option<Cursor>,
    pub num_items: usize,
}

impl PageRequest {
    pub fn first(num_items: usize) -> Self {
        Self {
            cursor: None,
            num_items,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.num_items == 0 {
            return Err(TaskError::Invalid("page size must be at least 1".into()).into());
        }
        Ok(())
    }
}

/// One page of an ordered result sequence. `continue_cursor` is `None` only
/// when the sequence produced no position to resume from (empty first page).
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub continue_cursor: Option<Cursor>,
    pub is_done: bool,
}

/// Client-side pagination state for a live list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerStatus {
    LoadingFirstPage,
    CanLoadMore,
    LoadingMore,
    Exhausted,
}

/// Accumulates pages of a query. `load_more` is guarded: calls while a fetch
/// is outstanding, or after the sequence is exhausted, are no-ops.
pub struct Pager<T> {
    pub rows: Vec<T>,
    cursor: Option<Cursor>,
    num_items: usize,
    status: PagerStatus,
    in_flight: bool,
}

impl<T> Pager<T> {
    pub fn new(num_items: usize) -> Self {
        Self {
            rows: Vec::new(),
            cursor: None,
            num_items,
            status: PagerStatus::LoadingFirstPage,
            in_flight: false,
        }
    }

    pub fn status(&self) -> PagerStatus {
        self.status
    }

    /// Forget everything and start from the first page again. Used when the
    /// underlying query parameters change or the store signals a write.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.cursor = None;
        self.status = PagerStatus::LoadingFirstPage;
        self.in_flight = false;
    }

    pub fn load_more<F>(&mut self, fetch: F) -> Result<()>
    where
        F: FnOnce(&PageRequest) -> Result<Page<T>>,
    {
        if self.in_flight || self.status == PagerStatus::Exhausted {
            return Ok(());
        }
        self.in_flight = true;
        self.status = if self.cursor.is_none() && self.rows.is_empty() {
            PagerStatus::LoadingFirstPage
        } else {
            PagerStatus::LoadingMore
        };

        let request = PageRequest {
            cursor: self.cursor.clone(),
            num_items: self.num_items,
        };
        let result = fetch(&request);
        self.in_flight = false;

        match result {
            Ok(page) => {
                self.rows.extend(page.rows);
                if page.continue_cursor.is_some() {
                    self.cursor = page.continue_cursor;
                }
                self.status = if page.is_done {
                    PagerStatus::Exhausted
                } else {
                    PagerStatus::CanLoadMore
                };
                Ok(())
            }
            Err(e) => {
                // Leave the cursor untouched so the same page can be retried.
                self.status = PagerStatus::CanLoadMore;
                Err(e)
            }
        }
    }
}
