//! 租户用户认证端点

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use governor::middleware::NoOpMiddleware;
use tracing::debug;

use super::helpers::{api_result, error_from_crm};
use crate::access::RequestContext;
use crate::api::middleware::TenantAuth;
use crate::api::state::AppState;
use crate::services::auth::{self, LoginRequest, RefreshRequest};
use crate::services::org;

/// 基于连接 IP 的限流 key
#[derive(Clone, Copy)]
pub struct LoginKeyExtractor;

impl KeyExtractor for LoginKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract peer IP"))
    }
}

/// 创建登录限流器
///
/// 配置：每秒补充 1 个令牌，突发最多 5 次请求；超限返回 429
pub fn login_rate_limiter() -> Governor<LoginKeyExtractor, NoOpMiddleware> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(1)
        .burst_size(5)
        .key_extractor(LoginKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    debug!("Login rate limiter created: 1 req/s, burst 5");
    Governor::new(&config)
}

/// `POST /api/v1/auth/login`
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ActixResult<impl Responder> {
    let (tenant, db) = match state.tenant_database(req.headers()).await {
        Ok(found) => found,
        Err(e) => return Ok(error_from_crm(&e)),
    };
    Ok(api_result(auth::login(&tenant, &db, body.into_inner()).await))
}

/// `POST /api/v1/auth/refresh`
pub async fn refresh(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> ActixResult<impl Responder> {
    let (tenant, db) = match state.tenant_database(req.headers()).await {
        Ok(found) => found,
        Err(e) => return Ok(error_from_crm(&e)),
    };
    Ok(api_result(auth::refresh(&tenant, &db, body.into_inner()).await))
}

/// `GET /api/v1/auth/me`
pub async fn me(ctx: RequestContext) -> ActixResult<impl Responder> {
    Ok(api_result(org::current_user(&ctx).await))
}

/// 认证路由 `/auth`
pub fn auth_routes() -> actix_web::Scope {
    web::scope("/auth")
        .route(
            "/login",
            web::post().to(login).wrap(login_rate_limiter()),
        )
        .route(
            "/refresh",
            web::post().to(refresh).wrap(login_rate_limiter()),
        )
        .service(web::resource("/me").wrap(TenantAuth).route(web::get().to(me)))
}
