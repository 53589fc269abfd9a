//! All-or-nothing batch operations.

use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, IntoActiveModel};
use tracing::{info, warn};

use super::{Repository, WriteOptions};
use crate::error::RepoResult;
use crate::model::{AuditedEntity, Invoker, RecordId};
use crate::tx::TxScope;

impl<E> Repository<E>
where
    E: AuditedEntity,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync,
{
    /// Delete every id, in order, as one unit.
    ///
    /// Returns the per-id results of [`Self::delete_by_id`]. The first error,
    /// including a missing id, stops the batch: no further ids are attempted,
    /// an owned transaction is rolled back and the error is returned. A joined
    /// transaction is left for its owner to roll back.
    ///
    /// # Errors
    /// `NotFound` for the first missing id; storage errors otherwise.
    pub async fn delete_by_ids<I>(&self, ids: I, opts: &WriteOptions<'_>) -> RepoResult<Vec<bool>>
    where
        I: IntoIterator,
        I::Item: Into<RecordId>,
    {
        let ids: Vec<RecordId> = ids.into_iter().map(Into::into).collect();
        let scope = TxScope::begin(&self.db, opts.transaction).await?;
        let origin = scope.origin();
        info!(entity = %self.name, count = ids.len(), tx = origin, "Bulk delete started");

        let res = self
            .delete_each(scope.tx(), &ids, opts.invoker.as_ref())
            .await;
        match &res {
            Ok(results) => info!(
                entity = %self.name,
                deleted = results.iter().filter(|d| **d).count(),
                unchanged = results.iter().filter(|d| !**d).count(),
                tx = origin,
                "Bulk delete committing"
            ),
            Err(e) => warn!(
                entity = %self.name,
                error = %e,
                tx = origin,
                "Bulk delete aborted, rolling back"
            ),
        }
        scope.finish(res).await
    }

    async fn delete_each<C: ConnectionTrait>(
        &self,
        conn: &C,
        ids: &[RecordId],
        invoker: Option<&Invoker>,
    ) -> RepoResult<Vec<bool>> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            results.push(self.delete_by_id_on(conn, id, invoker).await?);
        }
        Ok(results)
    }
}
