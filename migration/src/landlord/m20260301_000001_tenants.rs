use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenant::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tenant::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tenant::Name).string().not_null())
                    .col(
                        ColumnDef::new(Tenant::Subdomain)
                            .string_len(63)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Tenant::DatabaseName).string().not_null())
                    .col(
                        ColumnDef::new(Tenant::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Tenant::OwnerEmail).string().not_null())
                    .col(ColumnDef::new(Tenant::FailureReason).text().null())
                    .col(
                        ColumnDef::new(Tenant::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tenant::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tenant::ProvisionedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按状态筛选租户（运维列表）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tenants_status")
                    .table(Tenant::Table)
                    .col(Tenant::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_tenants_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tenant::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tenant {
    #[sea_orm(iden = "tenants")]
    Table,
    Id,
    Name,
    Subdomain,
    DatabaseName,
    Status,
    OwnerEmail,
    FailureReason,
    CreatedAt,
    UpdatedAt,
    ProvisionedAt,
}
