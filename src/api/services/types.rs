//! API 响应与请求类型

use serde::{Deserialize, Serialize};

use crate::services::Page;
use crate::storage::TenantStatus;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PaginatedResponse<T> {
    pub code: i32,
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaginationInfo {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            code: 0,
            pagination: PaginationInfo {
                page: page.page,
                page_size: page.page_size,
                total: page.total,
                total_pages: page.total_pages,
            },
            data: page.items,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

// ============ 租户注册 / landlord ============

#[derive(Deserialize, Clone, Debug)]
pub struct RegisterRequest {
    pub company_name: String,
    pub subdomain: String,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct TenantListQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub status: Option<TenantStatus>,
    pub search: Option<String>,
}

// ============ 健康检查 ============

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthLandlordCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthChecks {
    pub landlord: HealthLandlordCheck,
    /// 已缓存的租户连接池数量
    pub tenant_connections: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub checks: HealthChecks,
    pub response_time_ms: u64,
}
