use sea_orm::{
    ConnectionTrait, JoinType, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select,
};
use tracing::debug;

use super::{CountAndRows, FindQuery, ReadOptions, Record, Repository, eager};
use crate::error::RepoResult;
use crate::model::AuditedEntity;
use crate::policy::{Include, merge_includes};

impl<E> Repository<E>
where
    E: AuditedEntity,
    E::Model: Sync,
{
    /// Rows matching `query`, ordered and optionally paginated, with the
    /// resolved includes joined and attached.
    ///
    /// # Errors
    /// `Validation` for a disallowed ordering or include, `Db` otherwise.
    pub async fn find_all(
        &self,
        query: &FindQuery,
        opts: ReadOptions<'_>,
    ) -> RepoResult<Vec<Record<E::Model>>> {
        match opts.transaction {
            Some(tx) => self.find_all_on(tx, query, opts).await,
            None => self.find_all_on(&self.db, query, opts).await,
        }
    }

    /// Like [`Self::find_all`], plus the number of distinct records matching
    /// the filter regardless of the page window.
    ///
    /// # Errors
    /// `Validation` for a disallowed ordering or include, `Db` otherwise.
    pub async fn find(
        &self,
        query: &FindQuery,
        opts: ReadOptions<'_>,
    ) -> RepoResult<CountAndRows<Record<E::Model>>> {
        match opts.transaction {
            Some(tx) => self.find_on(tx, query, opts).await,
            None => self.find_on(&self.db, query, opts).await,
        }
    }

    async fn find_all_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        query: &FindQuery,
        opts: ReadOptions<'_>,
    ) -> RepoResult<Vec<Record<E::Model>>> {
        let includes = self.find_includes(opts);
        let base = self.base_select(query, &includes);
        let rows = self.window(base, query)?.all(conn).await?;

        debug!(
            entity = %self.name,
            op = "find_all",
            rows = rows.len(),
            in_tx = opts.transaction.is_some(),
            includes = includes.len(),
            "Query executed"
        );
        eager::attach::<E, C>(conn, rows, &includes).await
    }

    async fn find_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        query: &FindQuery,
        opts: ReadOptions<'_>,
    ) -> RepoResult<CountAndRows<Record<E::Model>>> {
        let includes = self.find_includes(opts);
        let base = self.base_select(query, &includes);

        // Joined one-to-many rows repeat their parent; count key tuples once.
        let count = base
            .clone()
            .select_only()
            .columns(self.keys.columns().iter().copied())
            .distinct()
            .count(conn)
            .await?;
        let rows = self.window(base, query)?.all(conn).await?;

        debug!(
            entity = %self.name,
            op = "find",
            count,
            rows = rows.len(),
            in_tx = opts.transaction.is_some(),
            includes = includes.len(),
            "Query executed"
        );
        let rows = eager::attach::<E, C>(conn, rows, &includes).await?;
        Ok(CountAndRows { count, rows })
    }

    fn find_includes(&self, opts: ReadOptions<'_>) -> Vec<Include> {
        merge_includes(opts.includes, &self.policy.find_includes(), opts.mode)
    }

    /// Filter, visibility and joins; no ordering or window.
    fn base_select(&self, query: &FindQuery, includes: &[Include]) -> Select<E> {
        let mut select = E::find().filter(query.filter.clone());
        if let Some(visible) = self.visibility_filter(query.include_deleted) {
            select = select.filter(visible);
        }
        for include in includes {
            select = select.join(JoinType::LeftJoin, include.relation());
        }
        if !includes.is_empty() {
            select = select.distinct();
        }
        select
    }

    /// Ordering and page window.
    fn window(&self, mut select: Select<E>, query: &FindQuery) -> RepoResult<Select<E>> {
        let order = self.policy.order_for(query.order.as_deref())?;
        if order.is_empty() {
            for col in self.keys.columns() {
                select = select.order_by(*col, Order::Asc);
            }
        } else {
            for key in order {
                select = select.order_by(key.column, key.dir.order());
            }
        }

        if query.is_paginated() {
            let page = self.policy.clamp(query.limit, query.page);
            select = select.limit(page.limit).offset(page.offset);
        }
        Ok(select)
    }
}
