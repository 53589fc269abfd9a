#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `ModKit` generic repository crate.
//!
//! A thin policy layer over `SeaORM`: typed CRUD, paginated and sorted
//! queries, transaction propagation and a paranoid (soft) delete / restore
//! lifecycle with audit attribution. One [`Repository`] serves any entity that
//! implements [`AuditedEntity`].
//!
//! # Features
//! - `pg`, `mysql`, `sqlite`: enable the `SeaORM` sqlx backends (`sqlite` is on
//!   by default)
//!
//! # Example
//! ```rust,ignore
//! use modkit_repo::{
//!     FindQuery, QueryPolicy, ReadOptions, RepoConfig, Repository, SortSpec, WriteOptions,
//! };
//!
//! let policy = QueryPolicy::<widget::Entity>::builder(&RepoConfig::from_env())
//!     .sortable("name", widget::Column::Name)
//!     .default_order(vec![SortSpec::desc("createdAt")])
//!     .build()?;
//! let repo = Repository::new(db, policy)?;
//!
//! let created = repo.create(am, &WriteOptions::by(user_id)).await?;
//! repo.delete_by_id(created.id, &WriteOptions::by(user_id)).await?;
//!
//! let page = repo
//!     .find(&FindQuery::new().paginate(Some(20), Some(0)), ReadOptions::default())
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod policy;
pub mod repo;
pub mod tx;

pub use config::{ConfigError, RepoConfig};
pub use error::{RepoError, RepoResult, ValidationError};
pub use model::{AuditColumns, AuditedEntity, Invoker, KeySpec, RecordId, RowKey};
pub use policy::{
    Include, IncludeMode, LogicalOp, Operand, OperatorTable, Pagination, QueryPolicy,
    QueryPolicyBuilder, SortDir, SortKey, SortMap, SortSpec,
};
pub use repo::{
    CountAndRows, FindQuery, ReadOptions, Record, RemovalMode, Repository, RepositoryBuilder,
    WriteOptions,
};
pub use tx::{TxScope, with_transaction};
