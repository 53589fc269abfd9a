//! Soft delete and restore.
//!
//! Paranoid repositories move a record `active -> soft-deleted -> active`;
//! non-paranoid ones only `active -> gone`.

use chrono::Utc;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, IntoActiveModel, ModelTrait,
    QueryFilter, sea_query::Expr,
};
use tracing::{debug, info, warn};

use super::{RemovalMode, Repository, WriteOptions};
use crate::error::{RepoError, RepoResult};
use crate::model::audit::{null_timestamp, timestamp};
use crate::model::key::is_null;
use crate::model::{AuditedEntity, Invoker, RecordId};
use crate::tx::TxScope;

impl<E> Repository<E>
where
    E: AuditedEntity,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
{
    /// Delete the record identified by `id`.
    ///
    /// Returns `false` when a paranoid record is already soft-deleted and
    /// nothing was written.
    ///
    /// # Errors
    /// `NotFound` when no such record exists; storage errors otherwise. An
    /// owned transaction is rolled back before the error is returned.
    pub async fn delete_by_id(
        &self,
        id: impl Into<RecordId>,
        opts: &WriteOptions<'_>,
    ) -> RepoResult<bool> {
        let id = id.into();
        let scope = TxScope::begin(&self.db, opts.transaction).await?;
        let res = self
            .delete_by_id_on(scope.tx(), &id, opts.invoker.as_ref())
            .await;
        scope.finish(res).await
    }

    /// Delete an already loaded record. Same rules as [`Self::delete_by_id`].
    ///
    /// # Errors
    /// Storage errors; an owned transaction is rolled back first.
    pub async fn delete_by_entity(
        &self,
        model: E::Model,
        opts: &WriteOptions<'_>,
    ) -> RepoResult<bool> {
        let scope = TxScope::begin(&self.db, opts.transaction).await?;
        let res = self
            .delete_model_on(scope.tx(), model, opts.invoker.as_ref())
            .await;
        scope.finish(res).await
    }

    /// Restore a soft-deleted record.
    ///
    /// Returns `false` on non-paranoid repositories.
    ///
    /// # Errors
    /// `NotFound` when no such record exists; storage errors otherwise.
    pub async fn un_delete_by_id(
        &self,
        id: impl Into<RecordId>,
        opts: &WriteOptions<'_>,
    ) -> RepoResult<bool> {
        let id = id.into();
        let Some(model) = (match opts.transaction {
            Some(tx) => self.load(tx, &id).await?,
            None => self.load(&self.db, &id).await?,
        }) else {
            info!(entity = %self.name, id = %id, op = "restore", "Record not found");
            return Err(RepoError::not_found(&self.name, &id));
        };
        self.un_delete_by_entity(model, opts).await
    }

    /// Restore an already loaded record. Same rules as
    /// [`Self::un_delete_by_id`].
    ///
    /// # Errors
    /// Storage errors.
    pub async fn un_delete_by_entity(
        &self,
        model: E::Model,
        opts: &WriteOptions<'_>,
    ) -> RepoResult<bool> {
        match opts.transaction {
            Some(tx) => self.restore_model_on(tx, model, opts).await,
            None => self.restore_model_on(&self.db, model, opts).await,
        }
    }

    pub(super) async fn delete_by_id_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &RecordId,
        invoker: Option<&Invoker>,
    ) -> RepoResult<bool> {
        let Some(model) = self.load(conn, id).await? else {
            info!(entity = %self.name, id = %id, op = "delete", "Record not found");
            return Err(RepoError::not_found(&self.name, id));
        };
        self.delete_model_on(conn, model, invoker).await
    }

    async fn delete_model_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: E::Model,
        invoker: Option<&Invoker>,
    ) -> RepoResult<bool> {
        let id = self.keys.row_key(&model)?;
        let row = self.keys.row_condition(&model);

        let Some(deleted_at) = self.audit.deleted_at.filter(|_| self.paranoid) else {
            let res = E::delete_many().filter(row).exec(conn).await?;
            info!(
                entity = %self.name,
                id = %id,
                rows = res.rows_affected,
                "Record deleted permanently"
            );
            return Ok(true);
        };

        if !is_null(&model.get(deleted_at)) {
            debug!(entity = %self.name, id = %id, "Record already soft-deleted, nothing to do");
            return Ok(false);
        }

        let now = timestamp(Utc::now());
        let mut am = model.into_active_model();
        self.stamp(&mut am, deleted_at, now.clone())?;
        if let (Some(col), Some(inv)) = (self.audit.deleted_by, invoker) {
            self.stamp(&mut am, col, inv.value())?;
        }
        if let Some(col) = self.audit.updated_at {
            self.stamp(&mut am, col, now.clone())?;
        }
        // stamp first, removal second
        am.update(conn).await?;

        let rows = match self.removal {
            RemovalMode::Tombstone => {
                E::update_many()
                    .col_expr(deleted_at, Expr::value(now))
                    .filter(row)
                    .exec(conn)
                    .await?
                    .rows_affected
            }
            RemovalMode::Purge => E::delete_many().filter(row).exec(conn).await?.rows_affected,
        };

        info!(
            entity = %self.name,
            id = %id,
            removal = ?self.removal,
            rows,
            invoker = invoker.map(ToString::to_string).as_deref(),
            "Record soft-deleted"
        );
        Ok(true)
    }

    async fn restore_model_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: E::Model,
        opts: &WriteOptions<'_>,
    ) -> RepoResult<bool> {
        let id = self.keys.row_key(&model)?;
        let Some(deleted_at) = self.audit.deleted_at.filter(|_| self.paranoid) else {
            warn!(entity = %self.name, id = %id, "Restore refused: entity is not paranoid");
            return Ok(false);
        };

        let now = timestamp(Utc::now());
        let mut am = model.into_active_model();
        self.stamp(&mut am, deleted_at, null_timestamp())?;
        if let Some(col) = self.audit.un_deleted_at {
            self.stamp(&mut am, col, now.clone())?;
        }
        if let Some(col) = self.audit.updated_at {
            self.stamp(&mut am, col, now)?;
        }
        if let Some(inv) = &opts.invoker {
            if let Some(col) = self.audit.un_deleted_by {
                self.stamp(&mut am, col, inv.value())?;
            }
            if opts.set_updater
                && let Some(col) = self.audit.updated_by
            {
                self.stamp(&mut am, col, inv.value())?;
            }
        }
        am.update(conn).await?;

        info!(
            entity = %self.name,
            id = %id,
            in_tx = opts.transaction.is_some(),
            "Record restored"
        );
        Ok(true)
    }
}
