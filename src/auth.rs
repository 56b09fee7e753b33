use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::error::TaskError;
use crate::model::User;

/// Explicit caller identity, passed into every operation that needs one.
/// Resolving a session token to a user id is the auth provider's job; by the
/// time code here runs, the identity is already established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(i64),
}

impl Caller {
    pub fn user_id(self) -> Option<i64> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    /// Hard variant for mutations: anonymous callers are rejected.
    pub fn require(self) -> Result<i64> {
        self.user_id()
            .ok_or_else(|| TaskError::Unauthenticated.into())
    }
}

/// Provisioning entry point standing in for the external auth provider.
/// Application code otherwise treats the users table as read-only.
pub fn register_user(conn: &Connection, name: &str, email: &str) -> Result<i64> {
    if name.trim().is_empty() {
        return Err(TaskError::Invalid("user name must not be empty".into()).into());
    }
    if !email.contains('@') {
        return Err(TaskError::Invalid(format!("'{email}' is not an email address")).into());
    }
    conn.execute(
        "INSERT INTO users (name, email) VALUES (?1, ?2)",
        rusqlite::params![name.trim(), email],
    )?;
    Ok(conn.last_insert_rowid())
}

fn read_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Resolves the caller to a user record. `None` when anonymous, and `None`
/// when the identity has no backing row (should not normally occur).
pub fn get_current_user(conn: &Connection, caller: Caller) -> Result<Option<User>> {
    let Some(user_id) = caller.user_id() else {
        return Ok(None);
    };
    let user = conn
        .query_row(
            "SELECT id, name, email, created_at FROM users WHERE id = ?1",
            [user_id],
            read_user_row,
        )
        .optional()?;
    Ok(user)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name, email, created_at FROM users ORDER BY id")?;
    let rows = stmt.query_map([], read_user_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}
