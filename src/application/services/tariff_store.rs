//! Tariff store service
//!
//! Wraps the tariff document repository with the reseed-on-failure policy:
//! callers always get a usable table.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::{DomainError, DomainResult, Quarter, TariffRepository, TariffTable};

pub struct TariffStore {
    repository: Arc<dyn TariffRepository>,
}

impl TariffStore {
    pub fn new(repository: Arc<dyn TariffRepository>) -> Self {
        Self { repository }
    }

    /// Current table. A missing or unreadable document is replaced by the
    /// built-in defaults, which are persisted before returning.
    pub async fn load(&self) -> TariffTable {
        match self.repository.load().await {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "⚠️ Tariff document unusable, reseeding defaults");
                let defaults = TariffTable::defaults();
                if let Err(e) = self.repository.save(&defaults).await {
                    warn!(error = %e, "Could not persist default tariffs");
                }
                defaults
            }
        }
    }

    /// Overwrite the whole table.
    pub async fn save(&self, table: &TariffTable) -> DomainResult<()> {
        self.repository.save(table).await?;
        info!(entries = table.len(), "💾 Tariff table saved");
        Ok(())
    }

    /// Set one quarter's price and persist the table.
    pub async fn upsert(&self, quarter: Quarter, price: Decimal) -> DomainResult<TariffTable> {
        let mut table = self.load().await;
        table.set(quarter, price)?;
        self.save(&table).await?;
        Ok(table)
    }

    pub async fn remove(&self, quarter: Quarter) -> DomainResult<TariffTable> {
        let mut table = self.load().await;
        if table.remove(&quarter).is_none() {
            return Err(DomainError::NotFound {
                entity: "Tariff",
                field: "quarter",
                value: quarter.to_string(),
            });
        }
        self.save(&table).await?;
        Ok(table)
    }

    pub async fn resolve(&self, date: NaiveDate) -> Decimal {
        self.load().await.resolve(date)
    }

    pub async fn resolve_range(&self, start: NaiveDate, end: NaiveDate) -> Decimal {
        self.load().await.resolve_range(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MemoryTariffRepository;
    use rust_decimal_macros::dec;

    fn q(s: &str) -> Quarter {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn failed_load_reseeds_and_persists_defaults() {
        let repo = Arc::new(MemoryTariffRepository::empty());
        let store = TariffStore::new(repo.clone());

        let table = store.load().await;
        assert_eq!(table, TariffTable::defaults());
        assert_eq!(repo.stored(), Some(TariffTable::defaults()));
        assert_eq!(repo.save_count(), 1);
    }

    #[tokio::test]
    async fn upsert_persists_whole_table() {
        let repo = Arc::new(MemoryTariffRepository::with(TariffTable::defaults()));
        let store = TariffStore::new(repo.clone());

        store.upsert(q("Q2/2026"), dec!(40.10)).await.unwrap();
        let stored = repo.stored().unwrap();
        assert_eq!(stored.len(), 6);
        assert_eq!(stored.get(&q("Q2/2026")), Some(dec!(40.10)));

        assert!(store.upsert(q("Q2/2026"), dec!(-1)).await.is_err());
    }

    #[tokio::test]
    async fn removing_unknown_quarter_is_not_found() {
        let repo = Arc::new(MemoryTariffRepository::with(TariffTable::defaults()));
        let store = TariffStore::new(repo);

        let err = store.remove(q("Q1/2020")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        let table = store.remove(q("Q1/2025")).await.unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(
            store.resolve(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()).await,
            Decimal::ZERO
        );
    }
}
