//! Run ledger interfaces

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use super::model::{AutomationRun, RunUpdate};
use crate::domain::{DomainError, DomainResult, Period};

/// Config key holding the most recently fetched or uploaded dataset.
pub const CACHE_KEY: &str = "latest_api_cache";

/// Automation run history. Every method is one atomic write or read.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Insert a run at `initialized` / `pending`.
    async fn create(&self, period: &Period) -> DomainResult<AutomationRun>;
    /// Mutate a run in place. Step regressions are rejected.
    async fn update(&self, id: i32, update: RunUpdate) -> DomainResult<AutomationRun>;
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<AutomationRun>>;
    async fn find_latest(&self) -> DomainResult<Option<AutomationRun>>;
    /// Newest first.
    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<AutomationRun>>;
    async fn count(&self) -> DomainResult<u64>;
    async fn delete(&self, id: i32) -> DomainResult<()>;
    /// Delete runs created more than `days` days ago, returning how many.
    async fn purge_older_than(&self, days: i64) -> DomainResult<u64>;
}

/// Creation instant before which runs are purged, `days` before `now`.
/// Spans beyond the representable date range are a validation error.
pub fn purge_cutoff(now: DateTime<Utc>, days: i64) -> DomainResult<DateTime<Utc>> {
    TimeDelta::try_days(days)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| DomainError::Validation(format!("days out of range: {}", days)))
}

/// Free-form key/value configuration, last write wins.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;
    /// Every stored key except the dataset cache.
    async fn get_all(&self) -> DomainResult<HashMap<String, String>>;
    async fn save(&self, key: &str, value: &str) -> DomainResult<()>;

    async fn save_cache(&self, blob: &str) -> DomainResult<()> {
        self.save(CACHE_KEY, blob).await
    }

    async fn get_cache(&self) -> DomainResult<Option<String>> {
        self.get(CACHE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn purge_cutoff_counts_back_whole_days() {
        let now = Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap();
        assert_eq!(
            purge_cutoff(now, 30).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn purge_cutoff_rejects_spans_past_the_calendar() {
        let now = Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap();
        assert!(matches!(
            purge_cutoff(now, 200_000_000),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            purge_cutoff(now, i64::MAX),
            Err(DomainError::Validation(_))
        ));
    }
}
