use thiserror::Error;

/// Failure taxonomy for task operations. Mutations surface these as hard
/// errors; queries prefer absent-value sentinels and only use `Invalid`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("task {0} not found")]
    NotFound(i64),

    #[error("task {0} does not belong to this user")]
    PermissionDenied(i64),

    #[error("invalid input: {0}")]
    Invalid(String),
}

impl TaskError {
    /// Pulls a `TaskError` back out of an `anyhow::Error`, if that is what
    /// it wraps. Used by callers that branch on the taxonomy.
    pub fn from_anyhow(err: &anyhow::Error) -> Option<&TaskError> {
        err.downcast_ref::<TaskError>()
    }
}
