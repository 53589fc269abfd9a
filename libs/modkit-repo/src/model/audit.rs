use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{EntityTrait, Value};
use uuid::Uuid;

use super::key::key_fragment;

/// Audit columns of an entity.
///
/// `created_at` is mandatory. Every other column is optional so that
/// append-only or non-paranoid tables can opt out of the parts they do not
/// store. Timestamp columns must be `DateTimeUtc` in the entity model.
#[derive(Clone, Copy, Debug)]
pub struct AuditColumns<C> {
    pub created_at: C,
    pub created_by: Option<C>,
    pub updated_at: Option<C>,
    pub updated_by: Option<C>,
    pub deleted_at: Option<C>,
    pub deleted_by: Option<C>,
    pub un_deleted_at: Option<C>,
    pub un_deleted_by: Option<C>,
}

impl<C> AuditColumns<C> {
    /// Only `created_at`; everything else disabled.
    #[must_use]
    pub fn created_only(created_at: C) -> Self {
        Self {
            created_at,
            created_by: None,
            updated_at: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
            un_deleted_at: None,
            un_deleted_by: None,
        }
    }
}

/// Contract for entities managed by a [`Repository`](crate::Repository).
///
/// # Example
/// ```rust,ignore
/// impl AuditedEntity for widget::Entity {
///     fn audit_columns() -> AuditColumns<Self::Column> {
///         AuditColumns {
///             created_at: widget::Column::CreatedAt,
///             created_by: Some(widget::Column::CreatedBy),
///             updated_at: Some(widget::Column::UpdatedAt),
///             updated_by: Some(widget::Column::UpdatedBy),
///             deleted_at: Some(widget::Column::DeletedAt),
///             deleted_by: Some(widget::Column::DeletedBy),
///             un_deleted_at: Some(widget::Column::UnDeletedAt),
///             un_deleted_by: Some(widget::Column::UnDeletedBy),
///         }
///     }
/// }
/// ```
pub trait AuditedEntity: EntityTrait {
    /// Whether deletions are soft by default. A repository may override this
    /// once, when it is built.
    const PARANOID: bool = true;

    fn audit_columns() -> AuditColumns<Self::Column>;
}

/// Identity of the actor performing a mutation.
///
/// Supplied by the calling layer; never derived inside the repository.
#[derive(Clone, Debug, PartialEq)]
pub struct Invoker(Value);

impl Invoker {
    #[must_use]
    pub fn value(&self) -> Value {
        self.0.clone()
    }
}

impl From<i32> for Invoker {
    fn from(v: i32) -> Self {
        Self(v.into())
    }
}

impl From<i64> for Invoker {
    fn from(v: i64) -> Self {
        Self(v.into())
    }
}

impl From<Uuid> for Invoker {
    fn from(v: Uuid) -> Self {
        Self(v.into())
    }
}

impl From<String> for Invoker {
    fn from(v: String) -> Self {
        Self(v.into())
    }
}

impl fmt::Display for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match key_fragment(&self.0) {
            Some(s) => f.write_str(&s),
            None => f.write_str("null"),
        }
    }
}

pub(crate) fn timestamp(now: DateTime<Utc>) -> Value {
    now.into()
}

pub(crate) fn null_timestamp() -> Value {
    Value::ChronoDateTimeUtc(None)
}
