use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn required_int<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).integer().not_null().to_owned()
}

fn timestamp<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Team::Table)
                    .if_not_exists()
                    .col(id(Team::Id))
                    .col(required_int(Team::ModuleId))
                    .col(required_int(Team::BranchId))
                    .col(ColumnDef::new(Team::Name).string().not_null())
                    .col(ColumnDef::new(Team::Description).text().null())
                    .col(ColumnDef::new(Team::LeaderId).integer().null())
                    .col(timestamp(Team::CreatedAt))
                    .col(timestamp(Team::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_teams_branch")
                            .from(Team::Table, Team::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_teams_leader")
                            .from(Team::Table, Team::LeaderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_teams_scope_name")
                    .table(Team::Table)
                    .col(Team::ModuleId)
                    .col(Team::BranchId)
                    .col(Team::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TeamMember::Table)
                    .if_not_exists()
                    .col(required_int(TeamMember::TeamId))
                    .col(required_int(TeamMember::UserId))
                    .col(timestamp(TeamMember::JoinedAt))
                    .primary_key(
                        Index::create()
                            .col(TeamMember::TeamId)
                            .col(TeamMember::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_members_team")
                            .from(TeamMember::Table, TeamMember::TeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_members_user")
                            .from(TeamMember::Table, TeamMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Lead::Table)
                    .if_not_exists()
                    .col(id(Lead::Id))
                    .col(required_int(Lead::ModuleId))
                    .col(required_int(Lead::BranchId))
                    .col(ColumnDef::new(Lead::Name).string().not_null())
                    .col(ColumnDef::new(Lead::Email).string().null())
                    .col(ColumnDef::new(Lead::Phone).string_len(32).null())
                    .col(ColumnDef::new(Lead::CompanyName).string().null())
                    .col(ColumnDef::new(Lead::Source).string_len(64).null())
                    .col(
                        ColumnDef::new(Lead::Status)
                            .string_len(16)
                            .not_null()
                            .default("new"),
                    )
                    .col(ColumnDef::new(Lead::Value).double().not_null().default(0.0))
                    .col(ColumnDef::new(Lead::AssignedTo).integer().null())
                    .col(ColumnDef::new(Lead::TeamId).integer().null())
                    .col(ColumnDef::new(Lead::ProductId).integer().null())
                    .col(ColumnDef::new(Lead::Notes).text().null())
                    .col(
                        ColumnDef::new(Lead::ClosedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(required_int(Lead::CreatedBy))
                    .col(timestamp(Lead::CreatedAt))
                    .col(timestamp(Lead::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leads_branch")
                            .from(Lead::Table, Lead::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leads_assigned_to")
                            .from(Lead::Table, Lead::AssignedTo)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leads_team")
                            .from(Lead::Table, Lead::TeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leads_product")
                            .from(Lead::Table, Lead::ProductId)
                            .to(Product::Table, Product::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // 目标进度统计按 (module, status, closed_at) 聚合
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_leads_progress")
                    .table(Lead::Table)
                    .col(Lead::ModuleId)
                    .col(Lead::Status)
                    .col(Lead::ClosedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_leads_assigned_to")
                    .table(Lead::Table)
                    .col(Lead::AssignedTo)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Target::Table)
                    .if_not_exists()
                    .col(id(Target::Id))
                    .col(required_int(Target::ModuleId))
                    .col(required_int(Target::BranchId))
                    .col(ColumnDef::new(Target::Title).string().not_null())
                    .col(ColumnDef::new(Target::UserId).integer().null())
                    .col(ColumnDef::new(Target::TeamId).integer().null())
                    .col(ColumnDef::new(Target::TargetAmount).double().not_null())
                    .col(
                        ColumnDef::new(Target::AchievedAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Target::Progress)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Target::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Target::StartDate).date().not_null())
                    .col(ColumnDef::new(Target::EndDate).date().not_null())
                    .col(timestamp(Target::CreatedAt))
                    .col(timestamp(Target::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_targets_branch")
                            .from(Target::Table, Target::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_targets_user")
                            .from(Target::Table, Target::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_targets_team")
                            .from(Target::Table, Target::TeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Target::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_leads_assigned_to").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_leads_progress").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lead::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TeamMember::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uq_teams_scope_name").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Team::Table).to_owned())
            .await
    }
}

// 其他迁移里创建的表，只用于外键
#[derive(DeriveIden)]
enum Branch {
    #[sea_orm(iden = "branches")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Product {
    #[sea_orm(iden = "products")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Team {
    #[sea_orm(iden = "teams")]
    Table,
    Id,
    ModuleId,
    BranchId,
    Name,
    Description,
    LeaderId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TeamMember {
    #[sea_orm(iden = "team_members")]
    Table,
    TeamId,
    UserId,
    JoinedAt,
}

#[derive(DeriveIden)]
enum Lead {
    #[sea_orm(iden = "leads")]
    Table,
    Id,
    ModuleId,
    BranchId,
    Name,
    Email,
    Phone,
    CompanyName,
    Source,
    Status,
    Value,
    AssignedTo,
    TeamId,
    ProductId,
    Notes,
    ClosedAt,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Target {
    #[sea_orm(iden = "targets")]
    Table,
    Id,
    ModuleId,
    BranchId,
    Title,
    UserId,
    TeamId,
    TargetAmount,
    AchievedAmount,
    Progress,
    Status,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
}
