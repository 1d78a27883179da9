//! Repository traits for the domain layer
//!
//! Contains:
//! - `RunLedger`: the single owner of run history and configuration storage
//! - `DomainResult`: standard result type for domain operations

use crate::domain::run::{ConfigRepository, RunRepository};
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to the run ledger's repositories.
///
/// Components never touch ledger storage directly; they ask for the
/// repository they need:
///
/// ```ignore
/// async fn latest(ledger: &dyn RunLedger) {
///     let run = ledger.runs().find_latest().await?;
///     let mode = ledger.config().get("schedule_mode").await?;
/// }
/// ```
pub trait RunLedger: Send + Sync {
    fn runs(&self) -> &dyn RunRepository;
    fn config(&self) -> &dyn ConfigRepository;
}
