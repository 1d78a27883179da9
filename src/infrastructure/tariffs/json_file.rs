//! JSON tariff document
//!
//! ```json
//! {"tariffs": [{"quarter": "Q1/2026", "price": 35.23}, ...]}
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DomainError, DomainResult, TariffEntry, TariffRepository, TariffTable};

#[derive(Debug, Serialize, Deserialize)]
struct TariffDocument {
    tariffs: Vec<TariffEntry>,
}

pub struct JsonTariffRepository {
    path: PathBuf,
}

impl JsonTariffRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_err(path: &Path, e: impl std::fmt::Display) -> DomainError {
    DomainError::Storage(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl TariffRepository for JsonTariffRepository {
    async fn load(&self) -> DomainResult<TariffTable> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| storage_err(&self.path, e))?;
        if content.trim().is_empty() {
            return Err(storage_err(&self.path, "empty tariff document"));
        }

        let document: TariffDocument =
            serde_json::from_str(&content).map_err(|e| storage_err(&self.path, e))?;
        let table = TariffTable::from_entries(document.tariffs)?;
        if table.is_empty() {
            return Err(storage_err(&self.path, "no tariffs in document"));
        }

        debug!(entries = table.len(), path = %self.path.display(), "Tariffs loaded");
        Ok(table)
    }

    /// Whole-document overwrite through a temp file and rename.
    async fn save(&self, table: &TariffTable) -> DomainResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| storage_err(parent, e))?;
            }
        }

        let document = TariffDocument {
            tariffs: table.entries(),
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| storage_err(&self.path, e))?;

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| storage_err(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| storage_err(&self.path, e))?;
        Ok(())
    }
}
