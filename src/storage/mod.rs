//! 存储层
//!
//! - `backend`: 连接、迁移、重试
//! - `LandlordStore`: landlord 库中的租户表
//! - `TenantConnections`: 按租户缓存的连接池

pub mod backend;
mod landlord;
pub mod models;
mod tenant_pool;

pub use backend::{BackendKind, RetryConfig};
pub use landlord::LandlordStore;
pub use models::{NewTenant, Tenant, TenantFilter, TenantStatus};
pub use tenant_pool::TenantConnections;

use std::sync::Arc;

use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::Result;

/// 连接 landlord 库并执行迁移
pub async fn open_landlord(config: &DatabaseConfig) -> Result<Arc<LandlordStore>> {
    let db = backend::connect(&config.landlord_url, config.pool_size).await?;
    backend::run_landlord_migrations(&db).await?;
    info!(
        "Landlord database ready ({})",
        BackendKind::infer(&config.landlord_url)?
    );
    Ok(Arc::new(LandlordStore::new(
        db,
        RetryConfig::from_config(config),
    )))
}
