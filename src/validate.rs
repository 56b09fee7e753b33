use anyhow::Result;

use crate::error::TaskError;

/// Task names must be non-empty after trimming. No uniqueness requirement.
pub fn validate_task_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TaskError::Invalid("task name must not be empty".into()).into());
    }
    Ok(())
}

/// Due dates travel as text-encoded unix epoch milliseconds.
pub fn validate_due_date(due_date: &str) -> Result<()> {
    if due_date.is_empty() || !due_date.chars().all(|c| c.is_ascii_digit()) {
        return Err(TaskError::Invalid(format!(
            "due date '{due_date}' must be a unix timestamp in milliseconds"
        ))
        .into());
    }
    Ok(())
}
