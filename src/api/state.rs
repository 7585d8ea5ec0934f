//! HTTP 层共享状态

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::errors::Result;
use crate::storage::{LandlordStore, Tenant, TenantConnections};
use crate::tenancy::{Provisioner, TenantResolver};

/// 通过 `web::Data<AppState>` 注入 handler 和中间件
pub struct AppState {
    pub landlord: Arc<LandlordStore>,
    pub connections: Arc<TenantConnections>,
    pub provisioner: Arc<Provisioner>,
    pub resolver: Arc<TenantResolver>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        landlord: Arc<LandlordStore>,
        connections: Arc<TenantConnections>,
        provisioner: Arc<Provisioner>,
        resolver: Arc<TenantResolver>,
    ) -> Self {
        Self {
            landlord,
            connections,
            provisioner,
            resolver,
            started_at: Utc::now(),
        }
    }

    /// 按请求头解析租户并取其数据库连接
    pub async fn tenant_database(
        &self,
        headers: &actix_web::http::header::HeaderMap,
    ) -> Result<(Tenant, DatabaseConnection)> {
        let tenant = self.resolver.resolve(headers).await?;
        let db = self.connections.get_or_connect(&tenant).await?;
        Ok((tenant, db))
    }
}
