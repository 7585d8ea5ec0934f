use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum CrmError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    /// 租户存在但当前不可用（开通中、失败、已停用）
    TenantUnavailable { status: String, message: String },
    Provisioning(String),
    Serialization(String),
    FileOperation(String),
    Internal(String),
}

impl CrmError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            CrmError::DatabaseConfig(_) => "E001",
            CrmError::DatabaseConnection(_) => "E002",
            CrmError::DatabaseOperation(_) => "E003",
            CrmError::Validation(_) => "E004",
            CrmError::NotFound(_) => "E005",
            CrmError::Conflict(_) => "E006",
            CrmError::Unauthorized(_) => "E007",
            CrmError::Forbidden(_) => "E008",
            CrmError::TenantUnavailable { .. } => "E009",
            CrmError::Provisioning(_) => "E010",
            CrmError::Serialization(_) => "E011",
            CrmError::FileOperation(_) => "E012",
            CrmError::Internal(_) => "E013",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            CrmError::DatabaseConfig(_) => "Database Configuration Error",
            CrmError::DatabaseConnection(_) => "Database Connection Error",
            CrmError::DatabaseOperation(_) => "Database Operation Error",
            CrmError::Validation(_) => "Validation Error",
            CrmError::NotFound(_) => "Resource Not Found",
            CrmError::Conflict(_) => "Conflict",
            CrmError::Unauthorized(_) => "Unauthorized",
            CrmError::Forbidden(_) => "Forbidden",
            CrmError::TenantUnavailable { .. } => "Tenant Unavailable",
            CrmError::Provisioning(_) => "Provisioning Error",
            CrmError::Serialization(_) => "Serialization Error",
            CrmError::FileOperation(_) => "File Operation Error",
            CrmError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            CrmError::DatabaseConfig(msg)
            | CrmError::DatabaseConnection(msg)
            | CrmError::DatabaseOperation(msg)
            | CrmError::Validation(msg)
            | CrmError::NotFound(msg)
            | CrmError::Conflict(msg)
            | CrmError::Unauthorized(msg)
            | CrmError::Forbidden(msg)
            | CrmError::Provisioning(msg)
            | CrmError::Serialization(msg)
            | CrmError::FileOperation(msg)
            | CrmError::Internal(msg) => msg,
            CrmError::TenantUnavailable { message, .. } => message,
        }
    }

    /// 映射到 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            CrmError::Validation(_) => StatusCode::BAD_REQUEST,
            CrmError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CrmError::Forbidden(_) => StatusCode::FORBIDDEN,
            CrmError::NotFound(_) => StatusCode::NOT_FOUND,
            CrmError::Conflict(_) => StatusCode::CONFLICT,
            CrmError::TenantUnavailable { status, .. } if status == "suspended" => {
                StatusCode::FORBIDDEN
            }
            CrmError::TenantUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server / CLI 终端输出）
    #[cfg(feature = "server")]
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for CrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CrmError {}

// 便捷的构造函数
impl CrmError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        CrmError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        CrmError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        CrmError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        CrmError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        CrmError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        CrmError::Conflict(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        CrmError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        CrmError::Forbidden(msg.into())
    }

    pub fn tenant_unavailable<S: Into<String>, T: Into<String>>(status: S, msg: T) -> Self {
        CrmError::TenantUnavailable {
            status: status.into(),
            message: msg.into(),
        }
    }

    pub fn provisioning<T: Into<String>>(msg: T) -> Self {
        CrmError::Provisioning(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        CrmError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        CrmError::FileOperation(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        CrmError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for CrmError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) => {
                CrmError::Conflict(format!("Duplicate value: {}", detail))
            }
            _ => CrmError::DatabaseOperation(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CrmError {
    fn from(err: std::io::Error) -> Self {
        CrmError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for CrmError {
    fn from(err: serde_json::Error) -> Self {
        CrmError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for CrmError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        CrmError::Unauthorized(format!("Invalid token: {}", err))
    }
}

impl From<csv::Error> for CrmError {
    fn from(err: csv::Error) -> Self {
        CrmError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            CrmError::validation("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CrmError::forbidden("x").http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(CrmError::conflict("x").http_status(), StatusCode::CONFLICT);
        assert_eq!(
            CrmError::database_operation("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_tenant_unavailable_status_depends_on_state() {
        let suspended = CrmError::tenant_unavailable("suspended", "Tenant is suspended");
        assert_eq!(suspended.http_status(), StatusCode::FORBIDDEN);

        let pending = CrmError::tenant_unavailable("provisioning", "Tenant is being set up");
        assert_eq!(pending.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(pending.message(), "Tenant is being set up");
    }

    #[test]
    fn test_format_simple() {
        let err = CrmError::not_found("Lead 7 not found");
        assert_eq!(err.format_simple(), "Resource Not Found: Lead 7 not found");
        assert_eq!(err.code(), "E005");
    }
}
