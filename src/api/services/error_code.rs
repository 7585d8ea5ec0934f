//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::CrmError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证与权限
/// - 3000-3099: 租户
/// - 4000-4099: 业务记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    ValidationFailed = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    DatabaseError = 1006,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    AuthFailed = 2000,
    Forbidden = 2003,
    RateLimitExceeded = 2004,

    // 租户错误 3000-3099
    TenantUnavailable = 3001,
    TenantSuspended = 3002,
    ProvisioningFailed = 3003,

    // 业务记录错误 4000-4099
    RecordConflict = 4001,
    ExportFailed = 4002,
}

impl From<&CrmError> for ErrorCode {
    fn from(err: &CrmError) -> Self {
        match err {
            CrmError::Validation(_) => ErrorCode::ValidationFailed,
            CrmError::NotFound(_) => ErrorCode::NotFound,
            CrmError::Conflict(_) => ErrorCode::RecordConflict,
            CrmError::Unauthorized(_) => ErrorCode::AuthFailed,
            CrmError::Forbidden(_) => ErrorCode::Forbidden,
            CrmError::TenantUnavailable { status, .. } if status == "suspended" => {
                ErrorCode::TenantSuspended
            }
            CrmError::TenantUnavailable { .. } => ErrorCode::TenantUnavailable,
            CrmError::Provisioning(_) => ErrorCode::ProvisioningFailed,
            CrmError::Serialization(_) => ErrorCode::ExportFailed,
            CrmError::DatabaseConfig(_)
            | CrmError::DatabaseConnection(_)
            | CrmError::DatabaseOperation(_) => ErrorCode::DatabaseError,
            CrmError::FileOperation(_) | CrmError::Internal(_) => ErrorCode::InternalServerError,
        }
    }
}
