//! Identifier and attribute model of repository-managed entities.

pub mod audit;
pub mod key;

pub use audit::{AuditColumns, AuditedEntity, Invoker};
pub use key::{KeySpec, RecordId, RowKey};
