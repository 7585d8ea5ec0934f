//! SeaORM entities
//!
//! - `landlord`: 共享的 landlord 库（租户元数据）
//! - `crm`: 每个租户独立数据库中的业务表

pub mod crm;
pub mod landlord;

pub use landlord::tenant::Entity as TenantEntity;
