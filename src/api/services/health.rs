use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use super::error_code::ErrorCode;
use super::helpers::json_response;
use super::types::{HealthChecks, HealthLandlordCheck, HealthResponse};
use crate::api::state::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Health Service
///
/// 只检查 landlord 库；租户库按需连接，不在健康检查里逐个探测
pub struct HealthService;

impl HealthService {
    pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let backend = state.connections.databases().backend().to_string();
        let landlord = match tokio::time::timeout(PING_TIMEOUT, state.landlord.ping()).await {
            Ok(Ok(())) => HealthLandlordCheck {
                status: "healthy".to_string(),
                backend,
                error: None,
            },
            Ok(Err(e)) => {
                error!("Landlord health check failed: {}", e);
                HealthLandlordCheck {
                    status: "unhealthy".to_string(),
                    backend,
                    error: Some(format!("database error: {}", e.message())),
                }
            }
            Err(_) => {
                error!("Landlord health check timeout");
                HealthLandlordCheck {
                    status: "unhealthy".to_string(),
                    backend,
                    error: Some("timeout".to_string()),
                }
            }
        };

        let now = chrono::Utc::now();
        let uptime = (now - state.started_at).num_seconds().max(0) as u64;
        let is_healthy = landlord.status == "healthy";

        let health_data = HealthResponse {
            status: landlord.status.clone(),
            timestamp: now.to_rfc3339(),
            uptime,
            checks: HealthChecks {
                landlord,
                tenant_connections: state.connections.cached_count(),
            },
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Health check completed in {:?}, status: {}, uptime: {}s",
            start_time.elapsed(),
            health_data.status,
            uptime
        );

        if is_healthy {
            json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(health_data))
        } else {
            json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ServiceUnavailable,
                "Service Unavailable",
                Some(health_data),
            )
        }
    }

    // 就绪检查：landlord 库可用才接收流量
    pub async fn readiness_check(state: web::Data<AppState>) -> impl Responder {
        trace!("Received readiness check request");

        match tokio::time::timeout(PING_TIMEOUT, state.landlord.ping()).await {
            Ok(Ok(())) => HttpResponse::Ok()
                .append_header(("Content-Type", "text/plain"))
                .body("OK"),
            _ => HttpResponse::ServiceUnavailable()
                .append_header(("Content-Type", "text/plain"))
                .body("Landlord database unavailable"),
        }
    }

    // 活跃性检查，进程在即可
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置 `/health`
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/ready", web::head().to(HealthService::readiness_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
