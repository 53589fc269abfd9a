//! Error taxonomy for repository operations.
//!
//! Storage errors are classified once, at the boundary, so callers can map
//! them to client (4xx-like) or server/retryable (5xx-like) outcomes without
//! inspecting `SeaORM` internals.

use sea_orm::DbErr;
use thiserror::Error;

/// Library-local result type.
pub type RepoResult<T> = Result<T, RepoError>;

/// Client-caused request problems.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ordering by column [{0}] is not allowed")]
    SortColumnNotAllowed(String),

    #[error("invalid sort direction '{direction}' for column [{column}]: use ASC or DESC")]
    InvalidSortDirection { column: String, direction: String },

    #[error("composite key lookup is missing key field(s): {}", .missing.join(", "))]
    PartialKey { missing: Vec<String> },

    #[error("unknown key field: {0}")]
    UnknownKeyField(String),

    #[error("entity has a composite key of {expected} fields; a single value was given")]
    SingleValueForCompositeKey { expected: usize },

    #[error("record has no value for key field {0}")]
    MissingKeyValue(String),

    #[error("required attribute is missing: {0}")]
    MissingAttribute(String),

    #[error("unsupported include relation: {0}")]
    UnsupportedInclude(String),

    #[error("invalid repository setup: {0}")]
    InvalidSetup(String),

    #[error("{0}")]
    Rejected(String),
}

/// Typed error for every repository operation.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity}: {id} not found")]
    NotFound { entity: String, id: String },

    #[error("constraint violation: {0}")]
    Conflict(#[source] DbErr),

    #[error("transient storage failure: {0}")]
    Transient(#[source] DbErr),

    #[error(transparent)]
    Db(DbErr),
}

impl RepoError {
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Validation and not-found errors are caused by the request, not the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Only connectivity-class failures are worth retrying by the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<DbErr> for RepoError {
    fn from(err: DbErr) -> Self {
        if is_constraint_violation(&err) {
            return Self::Conflict(err);
        }

        match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Self::Transient(err),
            DbErr::Custom(msg) => Self::Validation(ValidationError::Rejected(msg)),
            DbErr::AttrNotSet(attr) => Self::Validation(ValidationError::MissingAttribute(attr)),
            other if is_not_null_violation(&other) => Self::Validation(
                ValidationError::MissingAttribute(other.to_string()),
            ),
            other => Self::Db(other),
        }
    }
}

#[cfg(any(feature = "pg", feature = "mysql", feature = "sqlite"))]
fn is_constraint_violation(err: &DbErr) -> bool {
    use sea_orm::SqlErr;

    matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_) | SqlErr::ForeignKeyConstraintViolation(_))
    )
}

#[cfg(not(any(feature = "pg", feature = "mysql", feature = "sqlite")))]
fn is_constraint_violation(_err: &DbErr) -> bool {
    false
}

// Drivers do not expose NOT NULL violations through `SqlErr`; match the
// messages of the supported backends instead.
fn is_not_null_violation(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("NOT NULL constraint failed")
        || msg.contains("violates not-null constraint")
        || msg.contains("cannot be null")
}
