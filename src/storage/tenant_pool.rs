//! 租户库连接池缓存
//!
//! 每个租户一个连接池，按 `time_to_idle` 释放；超过容量时淘汰最久未用的租户。

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sea_orm::DatabaseConnection;
use tracing::{debug, info, warn};

use super::backend::{FailureKind, RetryConfig, classify, connect, with_retry};
use super::models::{Tenant, TenantStatus};
use crate::config::TenancyConfig;
use crate::errors::{CrmError, Result};
use crate::tenancy::TenantDatabases;

pub struct TenantConnections {
    cache: Cache<String, DatabaseConnection>,
    databases: Arc<TenantDatabases>,
    retry_config: RetryConfig,
}

impl TenantConnections {
    pub fn new(
        databases: Arc<TenantDatabases>,
        tenancy: &TenancyConfig,
        retry_config: RetryConfig,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(tenancy.connection_cache_capacity)
            .time_to_idle(Duration::from_secs(tenancy.connection_idle_secs))
            .eviction_listener(|tenant_id: Arc<String>, _conn, cause| {
                debug!("Tenant connection {} released: {:?}", tenant_id, cause);
            })
            .build();

        Self {
            cache,
            databases,
            retry_config,
        }
    }

    pub fn databases(&self) -> &Arc<TenantDatabases> {
        &self.databases
    }

    /// 取缓存的连接，没有则建立（同一租户的并发请求只建一次）
    pub async fn get_or_connect(&self, tenant: &Tenant) -> Result<DatabaseConnection> {
        let database_name = tenant.database_name.clone();

        self.cache
            .try_get_with(tenant.id.clone(), async {
                info!("Opening connection pool for tenant '{}'", tenant.subdomain);
                self.connect_uncached(&database_name).await
            })
            .await
            .map_err(|e: Arc<CrmError>| (*e).clone())
    }

    /// 直接建立连接，不放入缓存（开通流程使用）
    pub async fn connect_uncached(&self, database_name: &str) -> Result<DatabaseConnection> {
        let url = self.databases.url_for(database_name)?;
        let pool_size = self.databases.pool_size();

        with_retry(
            &format!("connect_tenant({})", database_name),
            self.retry_config,
            || {
                let url = url.clone();
                async move {
                    connect(&url, pool_size).await.map_err(|e| {
                        sea_orm::DbErr::Conn(sea_orm::error::RuntimeErr::Internal(e.to_string()))
                    })
                }
            },
        )
        .await
        .map_err(|e| match classify(&e) {
            FailureKind::MissingDatabase => CrmError::tenant_unavailable(
                TenantStatus::Failed.as_ref(),
                format!("Database '{}' for this tenant is missing", database_name),
            ),
            _ => CrmError::database_connection(e.to_string()),
        })
    }

    /// 移出缓存并关闭连接池
    pub async fn evict(&self, tenant_id: &str) {
        if let Some(conn) = self.cache.remove(tenant_id).await {
            if let Err(e) = conn.close().await {
                warn!("Failed to close tenant connection {}: {}", tenant_id, e);
            } else {
                debug!("Tenant connection {} closed", tenant_id);
            }
        }
    }

    pub fn cached_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
