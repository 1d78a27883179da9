//! In-memory run ledger

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::domain::run::{purge_cutoff, CACHE_KEY};
use crate::domain::{
    AutomationRun, ConfigRepository, DomainError, DomainResult, Period, RunLedger, RunRepository,
    RunUpdate,
};

/// In-memory ledger for development and testing
pub struct InMemoryLedger {
    runs: DashMap<i32, AutomationRun>,
    config: DashMap<String, String>,
    run_counter: AtomicI32,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            runs: DashMap::new(),
            config: DashMap::new(),
            run_counter: AtomicI32::new(1),
        }
    }

    fn sorted_runs(&self) -> Vec<AutomationRun> {
        let mut runs: Vec<AutomationRun> = self.runs.iter().map(|r| r.value().clone()).collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        runs
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLedger for InMemoryLedger {
    fn runs(&self) -> &dyn RunRepository {
        self
    }

    fn config(&self) -> &dyn ConfigRepository {
        self
    }
}

#[async_trait]
impl RunRepository for InMemoryLedger {
    async fn create(&self, period: &Period) -> DomainResult<AutomationRun> {
        let id = self.run_counter.fetch_add(1, Ordering::SeqCst);
        let run = AutomationRun::initialized(id, period, Utc::now());
        self.runs.insert(id, run.clone());
        Ok(run)
    }

    async fn update(&self, id: i32, update: RunUpdate) -> DomainResult<AutomationRun> {
        let mut run = self.runs.get_mut(&id).ok_or_else(|| DomainError::NotFound {
            entity: "AutomationRun",
            field: "id",
            value: id.to_string(),
        })?;
        run.apply(update, Utc::now())?;
        Ok(run.clone())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<AutomationRun>> {
        Ok(self.runs.get(&id).map(|r| r.value().clone()))
    }

    async fn find_latest(&self) -> DomainResult<Option<AutomationRun>> {
        Ok(self.sorted_runs().into_iter().next())
    }

    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<AutomationRun>> {
        Ok(self
            .sorted_runs()
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.runs.len() as u64)
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        self.runs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound {
                entity: "AutomationRun",
                field: "id",
                value: id.to_string(),
            })
    }

    async fn purge_older_than(&self, days: i64) -> DomainResult<u64> {
        let cutoff = purge_cutoff(Utc::now(), days)?;
        let before = self.runs.len();
        self.runs.retain(|_, run| run.created_at >= cutoff);
        Ok((before - self.runs.len()) as u64)
    }
}

#[async_trait]
impl ConfigRepository for InMemoryLedger {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.config.get(key).map(|v| v.value().clone()))
    }

    async fn get_all(&self) -> DomainResult<HashMap<String, String>> {
        Ok(self
            .config
            .iter()
            .filter(|e| e.key() != CACHE_KEY)
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }

    async fn save(&self, key: &str, value: &str) -> DomainResult<()> {
        self.config.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
