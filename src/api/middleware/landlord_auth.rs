//! landlord（平台管理）API 认证
//!
//! Bearer token 与 `auth.landlord_token` 比对（明文或 argon2 哈希）；未配置时整个 API 返回 404。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::CONTENT_TYPE,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{debug, info, trace};

use super::tenant_auth::extract_bearer_token;
use crate::api::services::error_code::ErrorCode;
use crate::api::services::helpers::error_response;
use crate::config::get_config;
use crate::utils::password::verify_secret;

#[derive(Clone, Default)]
pub struct LandlordAuth;

impl<S, B> Transform<S, ServiceRequest> for LandlordAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = LandlordAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LandlordAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct LandlordAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> LandlordAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_missing_token(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        debug!("Landlord token not configured - returning 404");
        req.into_response(
            HttpResponse::NotFound()
                .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
                .body("Not Found")
                .map_into_right_body(),
        )
    }

    fn handle_unauthorized(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        info!("Landlord authentication failed - invalid or missing token");
        req.into_response(
            error_response(
                actix_web::http::StatusCode::UNAUTHORIZED,
                ErrorCode::AuthFailed,
                "Unauthorized: Invalid or missing token",
            )
            .map_into_right_body(),
        )
    }
}

impl<S, B> Service<ServiceRequest> for LandlordAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            // 每次请求都读取最新配置
            let configured = get_config().auth.landlord_token.clone();
            if configured.is_empty() {
                return Ok(Self::handle_missing_token(req));
            }

            let authorized = extract_bearer_token(&req)
                .is_some_and(|token| verify_secret(&token, &configured));
            if !authorized {
                return Ok(Self::handle_unauthorized(req));
            }

            trace!("Landlord authentication successful");
            let res = srv.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
