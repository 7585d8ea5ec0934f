//! API 帮助函数

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use tracing::{error, warn};

use crate::errors::CrmError;
use crate::services::Page;

use super::error_code::ErrorCode;
use super::types::{ApiResponse, PaginatedResponse};

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 201 Created
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 分页列表响应
pub fn paginated_response<T: Serialize>(page: Page<T>) -> HttpResponse {
    HttpResponse::Ok()
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(PaginatedResponse::from(page))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 CrmError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_crm(err: &CrmError) -> HttpResponse {
    let status = err.http_status();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    // 5xx 不把内部细节返回给客户端
    let message = match err {
        CrmError::DatabaseConfig(_)
        | CrmError::DatabaseConnection(_)
        | CrmError::DatabaseOperation(_)
        | CrmError::FileOperation(_)
        | CrmError::Internal(_) => err.error_type(),
        _ => err.message(),
    };
    error_response(status, ErrorCode::from(err), message)
}

/// 统一 Result → HttpResponse 转换
///
/// 成功时返回 200 OK + JSON 数据，失败时自动映射 CrmError。
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<CrmError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_crm(&e.into()),
    }
}

/// 与 `api_result` 相同，成功时返回 201
pub fn created_result<T: Serialize>(result: Result<T, CrmError>) -> HttpResponse {
    match result {
        Ok(data) => created_response(data),
        Err(e) => error_from_crm(&e),
    }
}

pub fn paginated_result<T: Serialize>(result: Result<Page<T>, CrmError>) -> HttpResponse {
    match result {
        Ok(page) => paginated_response(page),
        Err(e) => error_from_crm(&e),
    }
}

/// 无返回数据的操作（删除等）
pub fn message_result(result: Result<(), CrmError>, message: &str) -> HttpResponse {
    match result {
        Ok(()) => json_response::<()>(StatusCode::OK, ErrorCode::Success, message, None),
        Err(e) => error_from_crm(&e),
    }
}

impl ResponseError for CrmError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        error_from_crm(self)
    }
}
