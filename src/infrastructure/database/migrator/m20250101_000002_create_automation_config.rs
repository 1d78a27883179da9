//! Create automation_config table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AutomationConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AutomationConfig::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AutomationConfig::Value).text().not_null())
                    .col(
                        ColumnDef::new(AutomationConfig::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AutomationConfig::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum AutomationConfig {
    Table,
    Key,
    Value,
    UpdatedAt,
}
