//! SeaORM implementation of RunLedger

use sea_orm::DatabaseConnection;

use crate::domain::{ConfigRepository, RunLedger, RunRepository};

use super::config_repository::SeaOrmConfigRepository;
use super::run_repository::SeaOrmRunRepository;

/// Run ledger backed by one SeaORM connection pool.
///
/// ```ignore
/// let ledger = SeaOrmRunLedger::new(db.clone());
/// let run = ledger.runs().create(&period).await?;
/// ledger.config().save("schedule_mode", "first_day").await?;
/// ```
pub struct SeaOrmRunLedger {
    runs: SeaOrmRunRepository,
    config: SeaOrmConfigRepository,
}

impl SeaOrmRunLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            runs: SeaOrmRunRepository::new(db.clone()),
            config: SeaOrmConfigRepository::new(db),
        }
    }
}

impl RunLedger for SeaOrmRunLedger {
    fn runs(&self) -> &dyn RunRepository {
        &self.runs
    }

    fn config(&self) -> &dyn ConfigRepository {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, Period, RunStatus, RunStep, RunUpdate};
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::{init_database, DatabaseConfig};
    use chrono::NaiveDate;
    use sea_orm_migration::MigratorTrait;

    async fn ledger() -> (tempfile::TempDir, SeaOrmRunLedger) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("automations.db");
        let db = init_database(&DatabaseConfig::sqlite(&path.to_string_lossy()))
            .await
            .unwrap();
        Migrator::up(&db, None).await.unwrap();
        (dir, SeaOrmRunLedger::new(db))
    }

    fn april() -> Period {
        Period::month_of(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap())
    }

    #[tokio::test]
    async fn created_run_is_latest_and_initialized() {
        let (_dir, ledger) = ledger().await;
        let first = ledger.runs().create(&april()).await.unwrap();
        let second = ledger.runs().create(&april()).await.unwrap();
        assert!(second.id > first.id);

        let latest = ledger.runs().find_latest().await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.step, RunStep::Initialized);
        assert_eq!(latest.status, RunStatus::Pending);
        assert_eq!(latest.period_end, NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());
    }

    #[tokio::test]
    async fn updates_advance_in_place_and_keep_pdf_path() {
        let (_dir, ledger) = ledger().await;
        let run = ledger.runs().create(&april()).await.unwrap();
        let runs = ledger.runs();

        runs.update(
            run.id,
            RunUpdate::new(RunStep::GeneratePdf, RunStatus::Success, "PDF generated: a.pdf")
                .with_pdf_path("/tmp/a.pdf"),
        )
        .await
        .unwrap();
        let done = runs
            .update(run.id, RunUpdate::new(RunStep::Completed, RunStatus::Success, "done"))
            .await
            .unwrap();
        assert_eq!(done.pdf_path.as_deref(), Some("/tmp/a.pdf"));

        let stored = runs.find_by_id(run.id).await.unwrap().unwrap();
        assert_eq!(stored.step, RunStep::Completed);
        assert_eq!(stored.pdf_path.as_deref(), Some("/tmp/a.pdf"));
        assert!(stored.updated_at >= stored.created_at);

        let err = runs
            .update(run.id, RunUpdate::new(RunStep::Error, RunStatus::Failed, "late"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StepRegression { .. }));
        assert_eq!(runs.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recent_runs_are_newest_first_and_limited() {
        let (_dir, ledger) = ledger().await;
        for _ in 0..3 {
            ledger.runs().create(&april()).await.unwrap();
        }
        let recent = ledger.runs().find_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].id > recent[1].id);
    }

    #[tokio::test]
    async fn delete_and_purge() {
        let (_dir, ledger) = ledger().await;
        let run = ledger.runs().create(&april()).await.unwrap();
        ledger.runs().create(&april()).await.unwrap();

        ledger.runs().delete(run.id).await.unwrap();
        assert!(ledger.runs().find_by_id(run.id).await.unwrap().is_none());
        assert!(matches!(
            ledger.runs().delete(run.id).await,
            Err(DomainError::NotFound { .. })
        ));

        assert_eq!(ledger.runs().purge_older_than(90).await.unwrap(), 0);
        assert!(matches!(
            ledger.runs().purge_older_than(i64::MAX).await,
            Err(DomainError::Validation(_))
        ));
        assert_eq!(ledger.runs().purge_older_than(-1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn config_upsert_is_last_write_wins() {
        let (_dir, ledger) = ledger().await;
        let config = ledger.config();
        config.save("schedule_mode", "first_day").await.unwrap();
        config.save("schedule_mode", "disabled").await.unwrap();
        config.save_cache("[{\"stationName\":\"A\"}]").await.unwrap();

        assert_eq!(
            config.get("schedule_mode").await.unwrap().as_deref(),
            Some("disabled")
        );
        let all = config.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(config.get_cache().await.unwrap().is_some());
        assert!(config.get("missing").await.unwrap().is_none());
    }
}
