use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use sea_orm::{EntityTrait, Order};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDir {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    #[must_use]
    pub fn order(self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
        }
    }
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the exact upper-case tokens are accepted.
impl FromStr for SortDir {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

/// Ordering as requested by a caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: String,
}

impl SortSpec {
    #[must_use]
    pub fn new(column: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: direction.into(),
        }
    }

    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortDir::Asc.as_str())
    }

    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortDir::Desc.as_str())
    }
}

/// A validated ordering key, resolved to its storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<C> {
    pub column: C,
    pub dir: SortDir,
}

/// Per-entity allowlist of sortable fields: API name -> column.
#[derive(Clone)]
pub struct SortMap<E: EntityTrait> {
    map: HashMap<String, E::Column>,
}

impl<E: EntityTrait> Default for SortMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> fmt::Debug for SortMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.map.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("SortMap").field("fields", &names).finish()
    }
}

impl<E: EntityTrait> SortMap<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    #[must_use]
    pub fn insert(mut self, api_name: impl Into<String>, col: E::Column) -> Self {
        self.map.insert(api_name.into(), col);
        self
    }

    #[must_use]
    pub fn get(&self, api_name: &str) -> Option<E::Column> {
        self.map.get(api_name).copied()
    }

    #[must_use]
    pub fn contains(&self, api_name: &str) -> bool {
        self.map.contains_key(api_name)
    }

    /// Check every requested ordering against the allowlist.
    ///
    /// Keys keep the request order.
    ///
    /// # Errors
    /// `SortColumnNotAllowed` for a field outside the allowlist,
    /// `InvalidSortDirection` for anything but `ASC`/`DESC`.
    pub fn validate(&self, specs: &[SortSpec]) -> Result<Vec<SortKey<E::Column>>, ValidationError> {
        specs
            .iter()
            .map(|spec| {
                let column = self
                    .get(&spec.column)
                    .ok_or_else(|| ValidationError::SortColumnNotAllowed(spec.column.clone()))?;
                let dir = spec.direction.parse::<SortDir>().map_err(|()| {
                    ValidationError::InvalidSortDirection {
                        column: spec.column.clone(),
                        direction: spec.direction.clone(),
                    }
                })?;
                Ok(SortKey { column, dir })
            })
            .collect()
    }
}
