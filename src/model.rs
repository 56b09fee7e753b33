use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl Status {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "not-started" | "Not Started" => Ok(Self::NotStarted),
            "in-progress" | "In Progress" => Ok(Self::InProgress),
            "completed" | "Completed" => Ok(Self::Completed),
            _ => anyhow::bail!(
                "invalid status '{s}': must be not-started, in-progress, or completed"
            ),
        }
    }

    /// Canonical token stored in the database and accepted on the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::NotStarted => ".",
            Self::InProgress => "*",
            Self::Completed => "x",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).map_err(|e| FromSqlError::Other(e.to_string().into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "high" | "High" => Ok(Self::High),
            "medium" | "Medium" => Ok(Self::Medium),
            "low" | "Low" => Ok(Self::Low),
            _ => anyhow::bail!("invalid priority '{s}': must be high, medium, or low"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Self::parse(s).map_err(|e| FromSqlError::Other(e.to_string().into()))
    }
}

/// One task row. `owner` is set at creation and never reassigned.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub owner: i64,
    pub name: String,
    pub status: Status,
    pub description: Option<String>,
    /// Unix epoch milliseconds, text-encoded.
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub updated_at: Option<i64>,
    /// Opaque reference; no referential integrity enforced.
    pub subject_id: Option<String>,
}

/// Input shape for task creation. Name and status are required; the rest
/// is optional and stored absent when unset.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub status: Status,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub subject_id: Option<String>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            status,
            description: None,
            due_date: None,
            priority: None,
            subject_id: None,
        }
    }
}

/// Partial patch: only `Some` fields are written, everything else keeps its
/// prior value. The owner is not patchable.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub status: Option<Status>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<Priority>,
    pub updated_at: Option<i64>,
    pub subject_id: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.status.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.updated_at.is_none()
            && self.subject_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_tokens_and_labels() {
        assert_eq!(Status::parse("not-started").unwrap(), Status::NotStarted);
        assert_eq!(Status::parse("In Progress").unwrap(), Status::InProgress);
        assert!(Status::parse("done").is_err());
        assert_eq!(Status::Completed.to_string(), "Completed");
    }

    #[test]
    fn priority_parse() {
        assert_eq!(Priority::parse("high").unwrap(), Priority::High);
        assert_eq!(Priority::parse("Low").unwrap(), Priority::Low);
        assert!(Priority::parse("urgent").is_err());
    }

    #[test]
    fn status_serializes_as_source_literal() {
        let json = serde_json::to_string(&Status::NotStarted).unwrap();
        assert_eq!(json, "\"Not Started\"");
    }
}
