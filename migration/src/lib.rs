//! 数据库迁移
//!
//! 两套独立的迁移：
//! - [`LandlordMigrator`]：landlord 库，只包含租户元数据
//! - [`TenantMigrator`]：每个租户自己的数据库，在开通租户时执行

pub use sea_orm_migration::prelude::*;

pub mod entities;
mod landlord;
mod tenant;

pub struct LandlordMigrator;

#[async_trait::async_trait]
impl MigratorTrait for LandlordMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(landlord::m20260301_000001_tenants::Migration)]
    }
}

pub struct TenantMigrator;

#[async_trait::async_trait]
impl MigratorTrait for TenantMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(tenant::m20260301_000001_organization::Migration),
            Box::new(tenant::m20260301_000002_catalog::Migration),
            Box::new(tenant::m20260301_000003_sales::Migration),
        ]
    }
}
