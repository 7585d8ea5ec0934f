//! `/api/v1` 路由
//!
//! - `/register`：公开，带限流
//! - `/auth`：登录、刷新、当前用户
//! - `/landlord`：运维 API，需要 landlord token
//! - 其余：租户 API，需要 access token

use actix_web::http::StatusCode;
use actix_web::{error, web};

use super::auth::{auth_routes, login_rate_limiter};
use super::catalog::catalog_routes;
use super::error_code::ErrorCode;
use super::helpers::error_response;
use super::org::org_routes;
use super::sales::sales_routes;
use super::tenants::{landlord_routes, register};
use crate::api::constants::JSON_PAYLOAD_LIMIT;
use crate::api::middleware::{LandlordAuth, TenantAuth};

pub fn api_v1_routes() -> actix_web::Scope {
    web::scope("/api/v1")
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route(
            "/register",
            web::post().to(register).wrap(login_rate_limiter()),
        )
        .service(auth_routes())
        .service(
            web::scope("/landlord")
                .wrap(LandlordAuth)
                .service(landlord_routes()),
        )
        .service(
            web::scope("")
                .wrap(TenantAuth)
                .configure(org_routes)
                .configure(catalog_routes)
                .configure(sales_routes),
        )
}

/// JSON 请求体解析失败时返回统一的 400 响应
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_PAYLOAD_LIMIT)
        .error_handler(|err, _req| {
            let message = format!("Invalid JSON body: {}", err);
            let response = error_response(
                StatusCode::BAD_REQUEST,
                ErrorCode::BadRequest,
                &message,
            );
            error::InternalError::from_response(err, response).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let message = format!("Invalid query string: {}", err);
        let response = error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message);
        error::InternalError::from_response(err, response).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let response = error_response(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            "Resource not found",
        );
        error::InternalError::from_response(err, response).into()
    })
}
