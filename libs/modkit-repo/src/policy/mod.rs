//! Per-entity query policy: page ceiling, sort allowlist, default ordering
//! and default eager loads.
//!
//! ```ignore
//! let policy = QueryPolicy::<widget::Entity>::builder(&RepoConfig::from_env())
//!     .sortable("name", widget::Column::Name)
//!     .default_order(vec![SortSpec::desc("createdAt")])
//!     .include(Include::new("parts", || widget::Relation::Parts.def()))
//!     .build()?;
//! ```

pub mod include;
pub mod operator;
pub mod pagination;
pub mod sort;

use sea_orm::EntityTrait;

pub use include::{Include, IncludeMode, find_defaults, merge_includes};
pub use operator::{LogicalOp, Operand, OperatorTable};
pub use pagination::{Pagination, clamp_pagination};
pub use sort::{SortDir, SortKey, SortMap, SortSpec};

use crate::config::RepoConfig;
use crate::error::ValidationError;
use crate::model::{AuditedEntity, KeySpec};

/// Validated policy of one entity repository.
#[derive(Debug, Clone)]
pub struct QueryPolicy<E: EntityTrait> {
    max_page_size: u64,
    sort_map: SortMap<E>,
    default_order: Vec<SortKey<E::Column>>,
    default_includes: Vec<Include>,
}

impl<E: AuditedEntity> QueryPolicy<E> {
    /// Start from the standard allowlist: `"id"` (first key column) and
    /// `"createdAt"`.
    #[must_use]
    pub fn builder(config: &RepoConfig) -> QueryPolicyBuilder<E> {
        let mut sort_map = SortMap::new();
        if let Some(pk) = KeySpec::<E>::new().primary() {
            sort_map = sort_map.insert("id", pk);
        }
        sort_map = sort_map.insert("createdAt", E::audit_columns().created_at);

        QueryPolicyBuilder {
            max_page_size: config.max_page_size,
            sort_map,
            default_order: Vec::new(),
            default_includes: Vec::new(),
        }
    }
}

impl<E: EntityTrait> QueryPolicy<E> {
    #[must_use]
    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }

    #[must_use]
    pub fn sort_map(&self) -> &SortMap<E> {
        &self.sort_map
    }

    #[must_use]
    pub fn clamp(&self, limit: Option<i64>, page: Option<i64>) -> Pagination {
        clamp_pagination(limit, page, self.max_page_size)
    }

    /// # Errors
    /// See [`SortMap::validate`].
    pub fn validate_sort(
        &self,
        specs: &[SortSpec],
    ) -> Result<Vec<SortKey<E::Column>>, ValidationError> {
        self.sort_map.validate(specs)
    }

    /// Ordering for a read: the validated request, or the default ordering
    /// when nothing was requested.
    ///
    /// # Errors
    /// See [`SortMap::validate`].
    pub fn order_for(
        &self,
        requested: Option<&[SortSpec]>,
    ) -> Result<Vec<SortKey<E::Column>>, ValidationError> {
        match requested {
            Some(specs) => self.validate_sort(specs),
            None => Ok(self.default_order.clone()),
        }
    }

    #[must_use]
    pub fn default_order(&self) -> &[SortKey<E::Column>] {
        &self.default_order
    }

    #[must_use]
    pub fn default_includes(&self) -> &[Include] {
        &self.default_includes
    }

    /// Default includes applied to `find`/`find_all`.
    #[must_use]
    pub fn find_includes(&self) -> Vec<Include> {
        find_defaults(&self.default_includes)
    }
}

pub struct QueryPolicyBuilder<E: EntityTrait> {
    max_page_size: u64,
    sort_map: SortMap<E>,
    default_order: Vec<SortSpec>,
    default_includes: Vec<Include>,
}

impl<E: EntityTrait> QueryPolicyBuilder<E> {
    /// Allow ordering by `api_name`.
    #[must_use]
    pub fn sortable(mut self, api_name: impl Into<String>, col: E::Column) -> Self {
        self.sort_map = self.sort_map.insert(api_name, col);
        self
    }

    #[must_use]
    pub fn default_order(mut self, order: Vec<SortSpec>) -> Self {
        self.default_order = order;
        self
    }

    #[must_use]
    pub fn include(mut self, include: Include) -> Self {
        self.default_includes.push(include);
        self
    }

    #[must_use]
    pub fn max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// # Errors
    /// Returns `ValidationError` if the default ordering uses a field outside
    /// the allowlist, or `InvalidSetup` for a zero page ceiling.
    pub fn build(self) -> Result<QueryPolicy<E>, ValidationError> {
        if self.max_page_size == 0 {
            return Err(ValidationError::InvalidSetup(
                "max_page_size must be positive".to_owned(),
            ));
        }
        let default_order = self.sort_map.validate(&self.default_order)?;
        Ok(QueryPolicy {
            max_page_size: self.max_page_size,
            sort_map: self.sort_map,
            default_order,
            default_includes: self.default_includes,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::AuditColumns;
    use sea_orm::IdenStatic;

    mod ent {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "notes")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub title: String,
            pub created_at: DateTimeUtc,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    impl AuditedEntity for ent::Entity {
        const PARANOID: bool = false;

        fn audit_columns() -> AuditColumns<Self::Column> {
            AuditColumns::created_only(ent::Column::CreatedAt)
        }
    }

    #[test]
    fn builder_seeds_standard_allowlist() {
        let policy = QueryPolicy::<ent::Entity>::builder(&RepoConfig::default())
            .build()
            .unwrap();
        assert!(policy.sort_map().contains("id"));
        assert!(policy.sort_map().contains("createdAt"));
        assert!(!policy.sort_map().contains("title"));
        assert_eq!(policy.max_page_size(), 200);
    }

    #[test]
    fn invalid_default_order_fails_build() {
        let err = QueryPolicy::<ent::Entity>::builder(&RepoConfig::default())
            .default_order(vec![SortSpec::asc("title")])
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::SortColumnNotAllowed("title".to_owned()));
    }

    #[test]
    fn default_order_applies_only_without_request() {
        let policy = QueryPolicy::<ent::Entity>::builder(&RepoConfig::default())
            .sortable("title", ent::Column::Title)
            .default_order(vec![SortSpec::asc("title"), SortSpec::desc("id")])
            .build()
            .unwrap();

        let keys = policy.order_for(None).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].column.as_str(), "title");

        let keys = policy.order_for(Some(&[SortSpec::desc("createdAt")])).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].dir, SortDir::Desc);
    }

    #[test]
    fn clamp_uses_configured_ceiling() {
        let policy = QueryPolicy::<ent::Entity>::builder(&RepoConfig::with_max_page_size(25))
            .build()
            .unwrap();
        assert_eq!(policy.clamp(Some(100), Some(1)).limit, 25);
        assert_eq!(policy.clamp(Some(100), Some(1)).offset, 25);
    }
}
