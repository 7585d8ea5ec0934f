//! Server mode
//!
//! 组装中间件和路由并启动 HTTP 服务。

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::Result;
use tracing::{error, warn};

use crate::api::middleware::RequestIdMiddleware;
use crate::api::services::{api_v1_routes, health_routes};
use crate::config::{CorsConfig, get_config};
use crate::runtime::lifetime;

/// 启动时检查一次 CORS 配置
fn validate_cors_config(cors_config: &CorsConfig) {
    if !cors_config.enabled {
        return;
    }

    if cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed."
        );
    }

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");
    if is_any_origin && cors_config.allow_credentials {
        error!(
            "SECURITY WARNING: allow_any_origin + allow_credentials is a dangerous combination! \
            Disabling credentials."
        );
    }
}

fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // 未启用时使用同源策略
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            "Content-Type",
            "Authorization",
            "Accept",
            "X-Tenant",
            "X-Module-Id",
            "X-Branch-Id",
            "X-Request-ID",
        ])
        .expose_headers(vec!["X-Request-ID", "Content-Disposition"])
        .max_age(cors_config.max_age as usize);

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");
    if is_any_origin {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    // any_origin + credentials 强制关闭 credentials
    if cors_config.allow_credentials && !is_any_origin {
        cors = cors.supports_credentials();
    }

    cors
}

/// 运行 HTTP 服务，直到服务结束或收到 Ctrl+C
///
/// **Note**: 调用前必须已初始化配置和日志
pub async fn run_server() -> Result<()> {
    let config = get_config();

    let state = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            error!("Server startup failed: {}", e);
            e
        })?;
    let db_for_shutdown = state.landlord.get_db().clone();
    let state = web::Data::new(state);

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let cors_config = config.cors.clone();
    validate_cors_config(&cors_config);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(build_cors_middleware(&cors_config))
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .app_data(state.clone())
            .service(health_routes())
            .service(api_v1_routes())
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(bind_address)?.run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown completed");
        }
    }

    Ok(())
}
