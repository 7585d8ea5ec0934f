use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{CrmError, Result};
use migration::entities::landlord::tenant;

/// 租户生命周期状态
///
/// `pending → provisioning → active | failed`，`active ⇄ suspended`
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TenantStatus {
    Pending,
    Provisioning,
    Active,
    Failed,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    pub database_name: String,
    pub status: TenantStatus,
    pub owner_email: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub provisioned_at: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }

    /// 非 active 租户拒绝业务请求
    pub fn ensure_available(&self) -> Result<()> {
        let message = match self.status {
            TenantStatus::Active => return Ok(()),
            TenantStatus::Suspended => "Tenant account is suspended",
            TenantStatus::Pending | TenantStatus::Provisioning => {
                "Tenant is still being provisioned, please retry shortly"
            }
            TenantStatus::Failed => "Tenant provisioning failed, contact support",
        };
        Err(CrmError::tenant_unavailable(self.status.as_ref(), message))
    }
}

impl From<tenant::Model> for Tenant {
    fn from(model: tenant::Model) -> Self {
        let status = model.status.parse().unwrap_or_else(|_| {
            warn!(
                "Tenant {} has unknown status '{}', treating as failed",
                model.id, model.status
            );
            TenantStatus::Failed
        });

        Self {
            id: model.id,
            name: model.name,
            subdomain: model.subdomain,
            database_name: model.database_name,
            status,
            owner_email: model.owner_email,
            failure_reason: model.failure_reason,
            created_at: model.created_at,
            updated_at: model.updated_at,
            provisioned_at: model.provisioned_at,
        }
    }
}

/// 新租户登记信息（landlord 行，状态 pending）
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    pub database_name: String,
    pub owner_email: String,
}

/// 租户列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    /// 模糊匹配 name 或 subdomain
    pub search: Option<String>,
}
