use sea_orm::{Condition, DatabaseTransaction};

use crate::model::Invoker;
use crate::policy::{Include, IncludeMode, SortSpec};

/// Options of a read operation.
#[derive(Clone, Copy, Default)]
pub struct ReadOptions<'a> {
    /// Run inside the caller's transaction instead of the pool.
    pub transaction: Option<&'a DatabaseTransaction>,
    /// Requested eager loads; `None` means "not specified".
    pub includes: Option<&'a [Include]>,
    pub mode: IncludeMode,
}

impl<'a> ReadOptions<'a> {
    #[must_use]
    pub fn in_tx(tx: &'a DatabaseTransaction) -> Self {
        Self {
            transaction: Some(tx),
            ..Self::default()
        }
    }

    /// Plain rows, no eager loads.
    #[must_use]
    pub fn raw() -> Self {
        Self {
            mode: IncludeMode::Raw,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn transaction(mut self, tx: &'a DatabaseTransaction) -> Self {
        self.transaction = Some(tx);
        self
    }

    #[must_use]
    pub fn includes(mut self, includes: &'a [Include]) -> Self {
        self.includes = Some(includes);
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: IncludeMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Options of a mutating operation.
#[derive(Clone, Default)]
pub struct WriteOptions<'a> {
    pub transaction: Option<&'a DatabaseTransaction>,
    /// Actor recorded in the `*_by` audit columns.
    pub invoker: Option<Invoker>,
    /// Also stamp `updated_by` on restore.
    pub set_updater: bool,
}

impl<'a> WriteOptions<'a> {
    #[must_use]
    pub fn in_tx(tx: &'a DatabaseTransaction) -> Self {
        Self {
            transaction: Some(tx),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by(invoker: impl Into<Invoker>) -> Self {
        Self {
            invoker: Some(invoker.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn transaction(mut self, tx: &'a DatabaseTransaction) -> Self {
        self.transaction = Some(tx);
        self
    }

    #[must_use]
    pub fn invoker(mut self, invoker: impl Into<Invoker>) -> Self {
        self.invoker = Some(invoker.into());
        self
    }

    #[must_use]
    pub fn set_updater(mut self) -> Self {
        self.set_updater = true;
        self
    }
}

/// Filter, ordering and page window of a `find`.
///
/// The filter may reference columns of included relations, which are joined
/// into the query.
#[derive(Debug, Clone)]
pub struct FindQuery {
    pub filter: Condition,
    /// `None` applies the default ordering.
    pub order: Option<Vec<SortSpec>>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub include_deleted: bool,
}

impl Default for FindQuery {
    fn default() -> Self {
        Self {
            filter: Condition::all(),
            order: None,
            limit: None,
            page: None,
            include_deleted: false,
        }
    }
}

impl FindQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Condition) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn order(mut self, order: Vec<SortSpec>) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn paginate(mut self, limit: Option<i64>, page: Option<i64>) -> Self {
        self.limit = limit;
        self.page = page;
        self
    }

    #[must_use]
    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    #[must_use]
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.page.is_some()
    }
}
