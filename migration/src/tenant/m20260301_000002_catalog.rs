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
                    .table(Category::Table)
                    .if_not_exists()
                    .col(id(Category::Id))
                    .col(required_int(Category::ModuleId))
                    .col(required_int(Category::BranchId))
                    .col(ColumnDef::new(Category::Name).string_len(120).not_null())
                    .col(ColumnDef::new(Category::Description).text().null())
                    .col(ColumnDef::new(Category::ParentId).integer().null())
                    .col(timestamp(Category::CreatedAt))
                    .col(timestamp(Category::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_categories_branch")
                            .from(Category::Table, Category::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_categories_parent")
                            .from(Category::Table, Category::ParentId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_categories_scope_name")
                    .table(Category::Table)
                    .col(Category::ModuleId)
                    .col(Category::BranchId)
                    .col(Category::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Unit::Table)
                    .if_not_exists()
                    .col(id(Unit::Id))
                    .col(required_int(Unit::ModuleId))
                    .col(required_int(Unit::BranchId))
                    .col(ColumnDef::new(Unit::Name).string().not_null())
                    .col(ColumnDef::new(Unit::ShortName).string_len(16).not_null())
                    .col(timestamp(Unit::CreatedAt))
                    .col(timestamp(Unit::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_units_branch")
                            .from(Unit::Table, Unit::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_units_scope_short_name")
                    .table(Unit::Table)
                    .col(Unit::ModuleId)
                    .col(Unit::BranchId)
                    .col(Unit::ShortName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vendor::Table)
                    .if_not_exists()
                    .col(id(Vendor::Id))
                    .col(required_int(Vendor::ModuleId))
                    .col(required_int(Vendor::BranchId))
                    .col(ColumnDef::new(Vendor::Name).string().not_null())
                    .col(ColumnDef::new(Vendor::Email).string().null())
                    .col(ColumnDef::new(Vendor::Phone).string_len(32).null())
                    .col(ColumnDef::new(Vendor::Address).text().null())
                    .col(
                        ColumnDef::new(Vendor::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(timestamp(Vendor::CreatedAt))
                    .col(timestamp(Vendor::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendors_branch")
                            .from(Vendor::Table, Vendor::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Product::Table)
                    .if_not_exists()
                    .col(id(Product::Id))
                    .col(required_int(Product::ModuleId))
                    .col(required_int(Product::BranchId))
                    .col(ColumnDef::new(Product::Name).string().not_null())
                    .col(
                        ColumnDef::new(Product::Sku)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Product::CategoryId).integer().null())
                    .col(ColumnDef::new(Product::UnitId).integer().null())
                    .col(ColumnDef::new(Product::VendorId).integer().null())
                    .col(ColumnDef::new(Product::Price).double().not_null().default(0.0))
                    .col(ColumnDef::new(Product::Cost).double().not_null().default(0.0))
                    .col(
                        ColumnDef::new(Product::StockQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Product::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(timestamp(Product::CreatedAt))
                    .col(timestamp(Product::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_branch")
                            .from(Product::Table, Product::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_category")
                            .from(Product::Table, Product::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_unit")
                            .from(Product::Table, Product::UnitId)
                            .to(Unit::Table, Unit::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_vendor")
                            .from(Product::Table, Product::VendorId)
                            .to(Vendor::Table, Vendor::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_products_scope")
                    .table(Product::Table)
                    .col(Product::ModuleId)
                    .col(Product::BranchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(id(Service::Id))
                    .col(required_int(Service::ModuleId))
                    .col(required_int(Service::BranchId))
                    .col(ColumnDef::new(Service::Name).string().not_null())
                    .col(ColumnDef::new(Service::Description).text().null())
                    .col(ColumnDef::new(Service::CategoryId).integer().null())
                    .col(ColumnDef::new(Service::Price).double().not_null().default(0.0))
                    .col(ColumnDef::new(Service::DurationMinutes).integer().null())
                    .col(
                        ColumnDef::new(Service::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(timestamp(Service::CreatedAt))
                    .col(timestamp(Service::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_services_branch")
                            .from(Service::Table, Service::BranchId)
                            .to(Branch::Table, Branch::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_services_category")
                            .from(Service::Table, Service::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Service::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_products_scope").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Product::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vendor::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uq_units_scope_short_name").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Unit::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uq_categories_scope_name").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Branch {
    #[sea_orm(iden = "branches")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Category {
    #[sea_orm(iden = "categories")]
    Table,
    Id,
    ModuleId,
    BranchId,
    Name,
    Description,
    ParentId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Unit {
    #[sea_orm(iden = "units")]
    Table,
    Id,
    ModuleId,
    BranchId,
    Name,
    ShortName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Vendor {
    #[sea_orm(iden = "vendors")]
    Table,
    Id,
    ModuleId,
    BranchId,
    Name,
    Email,
    Phone,
    Address,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Product {
    #[sea_orm(iden = "products")]
    Table,
    Id,
    ModuleId,
    BranchId,
    Name,
    Sku,
    CategoryId,
    UnitId,
    VendorId,
    Price,
    Cost,
    StockQuantity,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Service {
    #[sea_orm(iden = "services")]
    Table,
    Id,
    ModuleId,
    BranchId,
    Name,
    Description,
    CategoryId,
    Price,
    DurationMinutes,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
