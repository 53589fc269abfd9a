use serde::{Deserialize, Serialize};

/// Effective page window after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u64,
    pub page: u64,
    pub offset: u64,
}

/// Clamp a requested page window against the `max` ceiling.
///
/// A missing, non-positive or oversized limit resolves to `max`. The offset
/// is computed from the effective limit; a missing or negative page is `0`.
#[must_use]
pub fn clamp_pagination(limit: Option<i64>, page: Option<i64>, max: u64) -> Pagination {
    let max = max.max(1);
    let limit = limit
        .and_then(|l| u64::try_from(l).ok())
        .filter(|l| (1..=max).contains(l))
        .unwrap_or(max);
    let page = page.and_then(|p| u64::try_from(p).ok()).unwrap_or(0);

    Pagination {
        limit,
        page,
        offset: page.saturating_mul(limit),
    }
}
