use moments_types::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("expected {expected} affected row(s), got {actual}")]
    RowCount { expected: usize, actual: usize },

    #[error("batch insert requires at least one row")]
    EmptyBatch,

    #[error("media set spans moments {first} and {other}")]
    MixedParents { first: i64, other: i64 },

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Coarse discriminant callers branch on when mapping failures outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any statement was issued.
    Validation,
    /// Exactly-one semantics violated because nothing matched.
    NotFound,
    /// Affected-row mismatch or a constraint the database refused.
    Conflict,
    /// Connection, statement or row decoding failure.
    Database,
    /// The caller broke the calling contract.
    Misuse,
}

impl DbError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::RowCount { .. } => ErrorCategory::Conflict,
            Self::EmptyBatch | Self::MixedParents { .. } => ErrorCategory::Misuse,
            Self::Sqlite(e) if is_constraint_violation(e) => ErrorCategory::Conflict,
            Self::LockPoisoned | Self::Corrupt(_) | Self::Sqlite(_) => ErrorCategory::Database,
        }
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
