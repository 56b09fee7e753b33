use anyhow::Result;
use rusqlite::Connection;

use crate::model::{Priority, Status};

/// Equality predicates applied inside the index query, before ranking
/// results are materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}

/// One hit from a search index. Lower rank sorts first (bm25 is negative
/// for matches); ties break by row id so the sequence is deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub id: i64,
    pub rank: f64,
}

/// Full-text capability over task names. The default implementation is
/// SQLite FTS5; the trait exists so the indexing technology is swappable.
pub trait SearchIndex {
    fn search(
        &self,
        conn: &Connection,
        text: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Ranked>>;
}

/// Sanitize free-form text into an FTS5 query: split on whitespace, quote
/// each word, join with OR. Returns None if no words remain.
fn sanitize_fts_query(text: &str) -> Option<String> {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            let cleaned: String = w.chars().filter(|c| *c != '"').collect();
            format!("\"{cleaned}\"")
        })
        .collect();
    if words.is_empty() {
        return None;
    }
    Some(words.join(" OR "))
}

pub struct Fts5Index;

impl SearchIndex for Fts5Index {
    fn search(
        &self,
        conn: &Connection,
        text: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<Ranked>> {
        let Some(fts_query) = sanitize_fts_query(text) else {
            return Ok(Vec::new());
        };

        let mut sql = String::from(
            "SELECT t.id, f.rank FROM tasks_fts f
             JOIN tasks t ON t.id = f.rowid
             WHERE tasks_fts MATCH ?1",
        );
        let mut params: Vec<&dyn rusqlite::ToSql> = vec![&fts_query];
        if let Some(ref status) = filters.status {
            sql.push_str(&format!(" AND t.status = ?{}", params.len() + 1));
            params.push(status);
        }
        if let Some(ref priority) = filters.priority {
            sql.push_str(&format!(" AND t.priority = ?{}", params.len() + 1));
            params.push(priority);
        }
        sql.push_str(" ORDER BY f.rank, t.id");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            Ok(Ranked {
                id: row.get(0)?,
                rank: row.get(1)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}
