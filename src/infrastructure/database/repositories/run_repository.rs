//! SeaORM implementation of RunRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use crate::domain::{AutomationRun, DomainError, DomainResult, Period, RunRepository, RunUpdate};
use crate::domain::run::purge_cutoff;
use crate::infrastructure::database::entities::automation_run;

pub struct SeaOrmRunRepository {
    db: DatabaseConnection,
}

impl SeaOrmRunRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: automation_run::Model) -> AutomationRun {
    AutomationRun {
        id: m.id,
        run_date: m.run_date,
        period_start: m.period_start,
        period_end: m.period_end,
        status: m.status.into(),
        step: m.step.into(),
        message: m.message,
        pdf_path: m.pdf_path,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

pub(super) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(format!("Database error: {}", e))
}

fn not_found(id: i32) -> DomainError {
    DomainError::NotFound {
        entity: "AutomationRun",
        field: "id",
        value: id.to_string(),
    }
}

// ── RunRepository impl ──────────────────────────────────────────

#[async_trait]
impl RunRepository for SeaOrmRunRepository {
    async fn create(&self, period: &Period) -> DomainResult<AutomationRun> {
        let now = Utc::now();
        let model = automation_run::ActiveModel {
            run_date: Set(now),
            period_start: Set(period.start),
            period_end: Set(period.end),
            status: Set(automation_run::Status::Pending),
            step: Set(automation_run::Step::Initialized),
            message: Set("initialized".to_string()),
            pdf_path: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        debug!(run_id = inserted.id, "Run created");
        Ok(model_to_domain(inserted))
    }

    async fn update(&self, id: i32, update: RunUpdate) -> DomainResult<AutomationRun> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let existing = automation_run::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| not_found(id))?;

        let mut run = model_to_domain(existing.clone());
        run.apply(update, Utc::now())?;

        let mut model = existing.into_active_model();
        model.status = Set(run.status.into());
        model.step = Set(run.step.into());
        model.message = Set(run.message.clone());
        model.pdf_path = Set(run.pdf_path.clone());
        model.updated_at = Set(run.updated_at);
        model.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(run)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<AutomationRun>> {
        let model = automation_run::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_latest(&self) -> DomainResult<Option<AutomationRun>> {
        Ok(self.find_recent(1).await?.into_iter().next())
    }

    async fn find_recent(&self, limit: u64) -> DomainResult<Vec<AutomationRun>> {
        let models = automation_run::Entity::find()
            .order_by_desc(automation_run::Column::CreatedAt)
            .order_by_desc(automation_run::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn count(&self) -> DomainResult<u64> {
        automation_run::Entity::find()
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn delete(&self, id: i32) -> DomainResult<()> {
        let result = automation_run::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn purge_older_than(&self, days: i64) -> DomainResult<u64> {
        let cutoff = purge_cutoff(Utc::now(), days)?;
        let result = automation_run::Entity::delete_many()
            .filter(automation_run::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
