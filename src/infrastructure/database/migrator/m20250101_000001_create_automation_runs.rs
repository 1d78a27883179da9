//! Create automation_runs table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AutomationRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AutomationRuns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::RunDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AutomationRuns::PeriodStart).date().not_null())
                    .col(ColumnDef::new(AutomationRuns::PeriodEnd).date().not_null())
                    .col(
                        ColumnDef::new(AutomationRuns::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::Step)
                            .string_len(20)
                            .not_null()
                            .default("initialized"),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::Message)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(AutomationRuns::PdfPath).string())
                    .col(
                        ColumnDef::new(AutomationRuns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AutomationRuns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_automation_runs_created_at")
                    .table(AutomationRuns::Table)
                    .col(AutomationRuns::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AutomationRuns::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum AutomationRuns {
    Table,
    Id,
    RunDate,
    PeriodStart,
    PeriodEnd,
    Status,
    Step,
    Message,
    PdfPath,
    CreatedAt,
    UpdatedAt,
}
