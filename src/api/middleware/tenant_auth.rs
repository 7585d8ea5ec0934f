//! 租户用户认证中间件
//!
//! 解析租户 → 校验 Bearer access token → 建立 `RequestContext` 放入 extensions。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{debug, info};

use crate::access::{RequestContext, ScopeSelection};
use crate::api::constants::{BRANCH_HEADER, MODULE_HEADER};
use crate::api::jwt::get_jwt_service;
use crate::api::services::helpers::error_from_crm;
use crate::api::state::AppState;
use crate::errors::{CrmError, Result};

#[derive(Clone, Default)]
pub struct TenantAuth;

impl<S, B> Transform<S, ServiceRequest> for TenantAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = TenantAuthMiddleware<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TenantAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct TenantAuthMiddleware<S> {
    service: Rc<S>,
}

/// 从 Authorization header 提取 Bearer token
pub(crate) fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 可选的整数请求头，格式错误时报 400
fn optional_id_header(req: &ServiceRequest, name: &str) -> Result<Option<i32>> {
    let Some(value) = req.headers().get(name) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| CrmError::validation(format!("{} header is not valid text", name)))?
        .trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i32>()
        .map(Some)
        .map_err(|_| CrmError::validation(format!("{} header must be an integer", name)))
}

async fn authenticate(req: &ServiceRequest) -> Result<RequestContext> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| CrmError::internal("Application state is not configured"))?;

    let tenant = state.resolver.resolve(req.headers()).await?;

    let token = extract_bearer_token(req)
        .ok_or_else(|| CrmError::unauthorized("Missing bearer token"))?;
    let claims = get_jwt_service()
        .validate_access_token(&token)
        .map_err(|e| {
            info!("Access token rejected for tenant '{}': {}", tenant.subdomain, e);
            CrmError::unauthorized("Invalid or expired token")
        })?;
    if claims.tenant != tenant.id {
        info!(
            "Token for tenant {} presented to tenant '{}'",
            claims.tenant, tenant.subdomain
        );
        return Err(CrmError::unauthorized("Token was issued for another tenant"));
    }

    let selection = ScopeSelection {
        user_id: claims.user_id()?,
        token_module: claims.module,
        header_module: optional_id_header(req, MODULE_HEADER)?,
        header_branch: optional_id_header(req, BRANCH_HEADER)?,
    };

    let db = state.connections.get_or_connect(&tenant).await?;
    RequestContext::establish(tenant, db, selection).await
}

impl<S, B> Service<ServiceRequest> for TenantAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            match authenticate(&req).await {
                Ok(ctx) => {
                    debug!(
                        "Authenticated user {} ({}) on tenant '{}'",
                        ctx.user_id, ctx.role, ctx.tenant.subdomain
                    );
                    req.extensions_mut().insert(ctx);
                    let res = srv.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    let response = error_from_crm(&e);
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}
