//! SeaORM implementation of ConfigRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::run_repository::db_err;
use crate::domain::run::CACHE_KEY;
use crate::domain::{ConfigRepository, DomainResult};
use crate::infrastructure::database::entities::automation_config;

pub struct SeaOrmConfigRepository {
    db: DatabaseConnection,
}

impl SeaOrmConfigRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfigRepository for SeaOrmConfigRepository {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let model = automation_config::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(|m| m.value))
    }

    async fn get_all(&self) -> DomainResult<HashMap<String, String>> {
        let models = automation_config::Entity::find()
            .filter(automation_config::Column::Key.ne(CACHE_KEY))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(|m| (m.key, m.value)).collect())
    }

    /// Single upsert statement.
    async fn save(&self, key: &str, value: &str) -> DomainResult<()> {
        let model = automation_config::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now()),
        };
        automation_config::Entity::insert(model)
            .on_conflict(
                OnConflict::column(automation_config::Column::Key)
                    .update_columns([
                        automation_config::Column::Value,
                        automation_config::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
