//! Repository configuration.
//!
//! The only tunable is the page-size ceiling. It is read once, at process
//! start, and injected into every [`QueryPolicy`](crate::policy::QueryPolicy);
//! business logic never reads the environment itself.

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the page-size ceiling.
pub const MAX_PAGE_SIZE_ENV: &str = "GLOBAL_SEARCH_LIMIT";

/// Ceiling used when nothing (valid) is configured.
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid repository configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("max_page_size must be positive")]
    NonPositivePageSize,
}

/// Repository-wide settings shared by all entity repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Largest page a single query may return.
    pub max_page_size: u64,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl RepoConfig {
    #[must_use]
    pub fn with_max_page_size(max_page_size: u64) -> Self {
        Self { max_page_size }
    }

    /// Extract the config from a `Figment`, rooted at `key` (e.g. `"repo"`).
    ///
    /// Missing values fall back to defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if the value has the wrong type or is zero.
    pub fn from_figment(figment: &Figment, key: &str) -> Result<Self, ConfigError> {
        let cfg: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(figment.focus(key))
            .extract()
            .map_err(Box::new)?;

        if cfg.max_page_size == 0 {
            return Err(ConfigError::NonPositivePageSize);
        }
        Ok(cfg)
    }

    /// Read `GLOBAL_SEARCH_LIMIT` from the process environment.
    ///
    /// Absent, unparsable or non-positive values resolve to
    /// [`DEFAULT_MAX_PAGE_SIZE`]; the latter two are logged.
    #[must_use]
    pub fn from_env() -> Self {
        let figment = Figment::from(Serialized::defaults(Self::default())).merge(
            Env::raw()
                .only(&[MAX_PAGE_SIZE_ENV])
                .map(|_| "max_page_size".into()),
        );

        match figment.extract::<Self>() {
            Ok(cfg) if cfg.max_page_size > 0 => cfg,
            Ok(_) => {
                tracing::warn!(
                    env = MAX_PAGE_SIZE_ENV,
                    fallback = DEFAULT_MAX_PAGE_SIZE,
                    "Non-positive page size ceiling, using default"
                );
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    env = MAX_PAGE_SIZE_ENV,
                    fallback = DEFAULT_MAX_PAGE_SIZE,
                    error = %e,
                    "Invalid page size ceiling, using default"
                );
                Self::default()
            }
        }
    }
}
