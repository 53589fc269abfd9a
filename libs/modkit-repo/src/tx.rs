//! Transaction scoping: join the caller's transaction when one is given,
//! otherwise own a fresh one.
//!
//! ```ignore
//! let ids = with_transaction(repo.connection(), None, |tx| {
//!     let repo = repo.clone();
//!     Box::pin(async move {
//!         let a = repo.create(first, WriteOptions::in_tx(tx)).await?;
//!         let b = repo.create(second, WriteOptions::in_tx(tx)).await?;
//!         Ok((a.id, b.id))
//!     })
//! })
//! .await?;
//! ```

use std::{future::Future, pin::Pin};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{debug, warn};

use crate::error::RepoResult;

/// Transaction a unit of work runs in.
///
/// A joined transaction belongs to the caller, so finishing the scope never
/// commits or rolls it back.
pub enum TxScope<'a> {
    Joined(&'a DatabaseTransaction),
    Owned(DatabaseTransaction),
}

impl<'a> TxScope<'a> {
    /// Join `existing`, or open a new transaction on `db`.
    ///
    /// # Errors
    /// Returns `RepoError` if a new transaction cannot be started.
    pub async fn begin(
        db: &DatabaseConnection,
        existing: Option<&'a DatabaseTransaction>,
    ) -> RepoResult<Self> {
        match existing {
            Some(tx) => Ok(Self::Joined(tx)),
            None => Ok(Self::Owned(db.begin().await?)),
        }
    }

    #[must_use]
    pub fn tx(&self) -> &DatabaseTransaction {
        match self {
            Self::Joined(tx) => tx,
            Self::Owned(tx) => tx,
        }
    }

    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Origin label used in log events.
    #[must_use]
    pub fn origin(&self) -> &'static str {
        match self {
            Self::Joined(_) => "given",
            Self::Owned(_) => "inner",
        }
    }

    /// Commit an owned transaction on `Ok`, roll it back on `Err`.
    ///
    /// The result is passed through; a commit failure replaces it.
    ///
    /// # Errors
    /// Returns the error of `result`, or the commit failure.
    pub async fn finish<T>(self, result: RepoResult<T>) -> RepoResult<T> {
        let Self::Owned(txn) = self else {
            return result;
        };

        match result {
            Ok(v) => {
                txn.commit().await?;
                debug!("transaction committed");
                Ok(v)
            }
            Err(e) => {
                if let Err(rb) = txn.rollback().await {
                    warn!(error = %rb, "transaction rollback failed");
                } else {
                    debug!(error = %e, "transaction rolled back");
                }
                Err(e)
            }
        }
    }
}

/// Run `f` inside `existing` if given, else inside a transaction owned by this
/// call: committed when `f` succeeds, rolled back when it fails.
///
/// # Errors
/// Returns the error of `f`, or a failure to begin or commit.
pub async fn with_transaction<F, T>(
    db: &DatabaseConnection,
    existing: Option<&DatabaseTransaction>,
    f: F,
) -> RepoResult<T>
where
    F: for<'a> FnOnce(
            &'a DatabaseTransaction,
        ) -> Pin<Box<dyn Future<Output = RepoResult<T>> + Send + 'a>>
        + Send,
    T: Send,
{
    let scope = TxScope::begin(db, existing).await?;
    let res = f(scope.tx()).await;
    scope.finish(res).await
}
