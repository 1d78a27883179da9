//! Tariff document store interface

use async_trait::async_trait;

use super::model::TariffTable;
use crate::domain::DomainResult;

/// Whole-table persistence. There are no partial updates: every save
/// overwrites the stored table.
#[async_trait]
pub trait TariffRepository: Send + Sync {
    /// Fails on a missing, empty or malformed document.
    async fn load(&self) -> DomainResult<TariffTable>;
    async fn save(&self, table: &TariffTable) -> DomainResult<()>;
}
