//! Generic soft-delete aware repository.
//!
//! A [`Repository`] is built once per entity from a database connection and a
//! [`QueryPolicy`], and is cheap to clone. Every operation either runs on the
//! pool or joins the transaction passed in its options; mutations that need
//! more than one statement open their own transaction when none is given.

mod bulk;
mod eager;
mod lifecycle;
mod options;
mod query;

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, IdenStatic, IntoActiveModel, QueryFilter,
    TransactionTrait, Value, sea_query::SimpleExpr,
};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

pub use options::{FindQuery, ReadOptions, WriteOptions};

use crate::error::{RepoResult, ValidationError};
use crate::model::audit::timestamp;
use crate::model::{AuditColumns, AuditedEntity, KeySpec, RecordId, RowKey};
use crate::policy::{OperatorTable, Pagination, QueryPolicy, merge_includes};

/// What the second statement of a soft delete does to the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemovalMode {
    /// Re-assert the tombstone; the row stays and can be restored.
    #[default]
    Tombstone,
    /// Physically delete the row once the stamp has been saved.
    Purge,
}

/// A loaded row with its eager-loaded relations, keyed by include name.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<M> {
    pub row: M,
    pub related: BTreeMap<String, Vec<JsonValue>>,
}

impl<M> Record<M> {
    #[must_use]
    pub fn new(row: M) -> Self {
        Self {
            row,
            related: BTreeMap::new(),
        }
    }

    /// Related rows loaded under `name`; empty when not loaded.
    #[must_use]
    pub fn related(&self, name: &str) -> &[JsonValue] {
        self.related.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn into_inner(self) -> M {
        self.row
    }
}

impl<M> Deref for Record<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.row
    }
}

/// Page of rows plus the total number of matching records.
#[derive(Debug, Clone, PartialEq)]
pub struct CountAndRows<T> {
    pub count: u64,
    pub rows: Vec<T>,
}

pub struct Repository<E: AuditedEntity> {
    db: DatabaseConnection,
    policy: Arc<QueryPolicy<E>>,
    keys: KeySpec<E>,
    audit: AuditColumns<E::Column>,
    paranoid: bool,
    removal: RemovalMode,
    name: String,
}

impl<E: AuditedEntity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            policy: Arc::clone(&self.policy),
            keys: self.keys.clone(),
            audit: self.audit,
            paranoid: self.paranoid,
            removal: self.removal,
            name: self.name.clone(),
        }
    }
}

impl<E: AuditedEntity> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &self.name)
            .field("paranoid", &self.paranoid)
            .field("removal", &self.removal)
            .finish_non_exhaustive()
    }
}

pub struct RepositoryBuilder<E: AuditedEntity> {
    db: DatabaseConnection,
    policy: QueryPolicy<E>,
    paranoid: Option<bool>,
    removal: RemovalMode,
}

impl<E: AuditedEntity> RepositoryBuilder<E> {
    /// Override the entity's default paranoid flag for this repository.
    #[must_use]
    pub fn paranoid(mut self, paranoid: bool) -> Self {
        self.paranoid = Some(paranoid);
        self
    }

    #[must_use]
    pub fn removal_mode(mut self, removal: RemovalMode) -> Self {
        self.removal = removal;
        self
    }

    /// # Errors
    /// Returns `ValidationError::InvalidSetup` if the entity has no primary
    /// key, or is paranoid without a `deleted_at` column.
    pub fn build(self) -> RepoResult<Repository<E>> {
        let name = E::default().table_name().to_owned();
        let keys = KeySpec::<E>::new();
        let audit = E::audit_columns();

        if keys.columns().is_empty() {
            return Err(ValidationError::InvalidSetup(format!("{name} has no primary key")).into());
        }

        let paranoid = match self.paranoid {
            Some(p) if p != E::PARANOID => {
                warn!(
                    entity = %name,
                    default = E::PARANOID,
                    paranoid = p,
                    "Overriding paranoid flag of entity"
                );
                p
            }
            Some(p) => p,
            None => E::PARANOID,
        };

        if paranoid && audit.deleted_at.is_none() {
            return Err(ValidationError::InvalidSetup(format!(
                "{name} is paranoid but declares no deleted_at column"
            ))
            .into());
        }

        debug!(entity = %name, paranoid, removal = ?self.removal, "Repository built");

        Ok(Repository {
            db: self.db,
            policy: Arc::new(self.policy),
            keys,
            audit,
            paranoid,
            removal: self.removal,
            name,
        })
    }
}

impl<E: AuditedEntity> Repository<E> {
    #[must_use]
    pub fn builder(db: DatabaseConnection, policy: QueryPolicy<E>) -> RepositoryBuilder<E> {
        RepositoryBuilder {
            db,
            policy,
            paranoid: None,
            removal: RemovalMode::default(),
        }
    }

    /// Repository with the entity's default paranoid flag.
    ///
    /// # Errors
    /// See [`RepositoryBuilder::build`].
    pub fn new(db: DatabaseConnection, policy: QueryPolicy<E>) -> RepoResult<Self> {
        Self::builder(db, policy).build()
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_paranoid(&self) -> bool {
        self.paranoid
    }

    #[must_use]
    pub fn removal_mode(&self) -> RemovalMode {
        self.removal
    }

    #[must_use]
    pub fn policy(&self) -> &QueryPolicy<E> {
        &self.policy
    }

    #[must_use]
    pub fn key_spec(&self) -> &KeySpec<E> {
        &self.keys
    }

    /// Operator mapping for the backend of this repository's connection.
    #[must_use]
    pub fn operators(&self) -> OperatorTable {
        OperatorTable::for_backend(self.db.get_database_backend())
    }

    /// Page window for `limit`/`page` under this repository's ceiling.
    #[must_use]
    pub fn get_limit_and_page(&self, limit: Option<i64>, page: Option<i64>) -> Pagination {
        self.policy.clamp(limit, page)
    }

    /// # Errors
    /// Returns `ValidationError::MissingKeyValue` if a key field is null.
    pub fn row_key(&self, model: &E::Model) -> RepoResult<RowKey> {
        Ok(self.keys.row_key(model)?)
    }

    /// Open a transaction owned by the caller.
    ///
    /// # Errors
    /// Returns `RepoError` if the connection cannot start a transaction.
    pub async fn begin(&self) -> RepoResult<DatabaseTransaction> {
        Ok(self.db.begin().await?)
    }

    /// `deleted_at IS NULL` unless soft-deleted rows were asked for.
    fn visibility_filter(&self, include_deleted: bool) -> Option<SimpleExpr> {
        if include_deleted || !self.paranoid {
            return None;
        }
        self.audit.deleted_at.map(|col| col.is_null())
    }
}

impl<E> Repository<E>
where
    E: AuditedEntity,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
{
    /// Insert a record, stamping the creation audit columns.
    ///
    /// Values already set on `am` win over the stamps.
    ///
    /// # Errors
    /// `Validation` for missing required values, `Conflict` for unique or
    /// foreign-key violations, `Db` otherwise.
    pub async fn create(
        &self,
        am: E::ActiveModel,
        opts: &WriteOptions<'_>,
    ) -> RepoResult<E::Model> {
        match opts.transaction {
            Some(tx) => self.create_on(tx, am, opts).await,
            None => self.create_on(&self.db, am, opts).await,
        }
    }

    async fn create_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        mut am: E::ActiveModel,
        opts: &WriteOptions<'_>,
    ) -> RepoResult<E::Model> {
        let now = timestamp(Utc::now());
        let mut stamps = vec![(self.audit.created_at, now.clone())];
        if let Some(col) = self.audit.updated_at {
            stamps.push((col, now));
        }
        if let Some(inv) = &opts.invoker {
            stamps.extend(
                [self.audit.created_by, self.audit.updated_by]
                    .into_iter()
                    .flatten()
                    .map(|col| (col, inv.value())),
            );
        }
        for (col, value) in stamps {
            if matches!(am.get(col), ActiveValue::NotSet) {
                self.stamp(&mut am, col, value)?;
            }
        }

        let model = am.insert(conn).await?;
        let id = self.keys.row_key(&model)?;
        info!(
            entity = %self.name,
            id = %id,
            in_tx = opts.transaction.is_some(),
            "Record created"
        );
        Ok(model)
    }

    /// Look a record up by key, soft-deleted or not, with eager loads
    /// resolved through the include policy.
    ///
    /// # Errors
    /// `Validation` for a malformed key, `Db` for storage failures.
    pub async fn get_by_id(
        &self,
        id: impl Into<RecordId>,
        opts: ReadOptions<'_>,
    ) -> RepoResult<Option<Record<E::Model>>> {
        let id = id.into();
        match opts.transaction {
            Some(tx) => self.get_by_id_on(tx, &id, opts).await,
            None => self.get_by_id_on(&self.db, &id, opts).await,
        }
    }

    async fn get_by_id_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &RecordId,
        opts: ReadOptions<'_>,
    ) -> RepoResult<Option<Record<E::Model>>> {
        let Some(model) = self.load(conn, id).await? else {
            debug!(entity = %self.name, id = %id, "Record not found");
            return Ok(None);
        };

        let includes = merge_includes(opts.includes, self.policy.default_includes(), opts.mode);
        let mut records = eager::attach::<E, C>(conn, vec![model], &includes).await?;
        Ok(records.pop())
    }

    /// Records for every id that exists, soft-deleted included, with eager
    /// loads attached. Missing ids are skipped.
    ///
    /// # Errors
    /// `Validation` for a malformed key, `Db` for storage failures.
    pub async fn get_all_by_ids<I>(
        &self,
        ids: I,
        opts: ReadOptions<'_>,
    ) -> RepoResult<Vec<Record<E::Model>>>
    where
        I: IntoIterator,
        I::Item: Into<RecordId>,
    {
        let ids: Vec<RecordId> = ids.into_iter().map(Into::into).collect();
        match opts.transaction {
            Some(tx) => self.get_all_by_ids_on(tx, &ids, opts).await,
            None => self.get_all_by_ids_on(&self.db, &ids, opts).await,
        }
    }

    async fn get_all_by_ids_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[RecordId],
        opts: ReadOptions<'_>,
    ) -> RepoResult<Vec<Record<E::Model>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = E::find()
            .filter(self.keys.set_condition(ids)?)
            .all(conn)
            .await?;

        let includes = merge_includes(opts.includes, self.policy.default_includes(), opts.mode);
        debug!(
            entity = %self.name,
            op = "get_all_by_ids",
            requested = ids.len(),
            rows = rows.len(),
            includes = includes.len(),
            "Lookup by ids"
        );
        eager::attach::<E, C>(conn, rows, &includes).await
    }

    /// Plain rows for every id that exists and is visible; soft-deleted rows
    /// are filtered out and no relations are loaded.
    ///
    /// # Errors
    /// `Validation` for a malformed key, `Db` for storage failures.
    pub async fn get_by_ids<I>(&self, ids: I, opts: ReadOptions<'_>) -> RepoResult<Vec<E::Model>>
    where
        I: IntoIterator,
        I::Item: Into<RecordId>,
    {
        let ids: Vec<RecordId> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut select = E::find().filter(self.keys.set_condition(&ids)?);
        if let Some(visible) = self.visibility_filter(false) {
            select = select.filter(visible);
        }
        let rows = match opts.transaction {
            Some(tx) => select.all(tx).await?,
            None => select.all(&self.db).await?,
        };
        debug!(
            entity = %self.name,
            op = "get_by_ids",
            requested = ids.len(),
            rows = rows.len(),
            "Lookup by ids"
        );
        Ok(rows)
    }

    /// Set an audit column; a value of the wrong type is rejected.
    fn stamp(&self, am: &mut E::ActiveModel, col: E::Column, value: Value) -> RepoResult<()> {
        am.try_set(col, value).map_err(|e| {
            ValidationError::Rejected(format!("{}.{}: {e}", self.name, col.as_str())).into()
        })
    }

    /// Row by key, ignoring the soft-delete filter.
    async fn load<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &RecordId,
    ) -> RepoResult<Option<E::Model>> {
        Ok(E::find()
            .filter(self.keys.condition(id)?)
            .one(conn)
            .await?)
    }
}
