//! 请求 → 租户
//!
//! 优先 `X-Tenant` 头，其次 Host 的子域名（`acme.{base_domain}`）。

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header::{HOST, HeaderMap};
use moka::future::Cache;
use tracing::trace;

use super::naming::subdomain_from_host;
use crate::api::constants::TENANT_HEADER;
use crate::config::TenancyConfig;
use crate::errors::{CrmError, Result};
use crate::storage::{LandlordStore, Tenant};

pub struct TenantResolver {
    landlord: Arc<LandlordStore>,
    cache: Cache<String, Tenant>,
    base_domain: String,
}

impl TenantResolver {
    pub fn new(landlord: Arc<LandlordStore>, tenancy: &TenancyConfig) -> Self {
        Self {
            landlord,
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(tenancy.lookup_cache_secs))
                .build(),
            base_domain: tenancy.base_domain.clone(),
        }
    }

    /// 从请求头取租户子域名
    pub fn tenant_key(&self, headers: &HeaderMap) -> Option<String> {
        if let Some(value) = headers.get(TENANT_HEADER).and_then(|h| h.to_str().ok()) {
            let value = value.trim().to_ascii_lowercase();
            if !value.is_empty() {
                return Some(value);
            }
        }

        headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .and_then(|host| subdomain_from_host(host, &self.base_domain))
    }

    /// 查找租户，不检查状态
    pub async fn lookup(&self, subdomain: &str) -> Result<Tenant> {
        if let Some(tenant) = self.cache.get(subdomain).await {
            trace!("Tenant cache hit: {}", subdomain);
            return Ok(tenant);
        }

        let tenant = self
            .landlord
            .find_by_subdomain(subdomain)
            .await?
            .ok_or_else(|| CrmError::not_found(format!("Unknown tenant '{}'", subdomain)))?;

        self.cache
            .insert(subdomain.to_string(), tenant.clone())
            .await;
        Ok(tenant)
    }

    /// 解析并要求租户处于 active
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Tenant> {
        let key = self.tenant_key(headers).ok_or_else(|| {
            CrmError::validation(format!(
                "Tenant not specified: send the {} header or use a tenant subdomain",
                TENANT_HEADER
            ))
        })?;

        let tenant = self.lookup(&key).await?;
        tenant.ensure_available()?;
        Ok(tenant)
    }

    /// 租户状态变更后立即生效
    pub async fn invalidate(&self, subdomain: &str) {
        self.cache.invalidate(subdomain).await;
    }
}
