//! 集成测试公共环境
//!
//! 每个测试使用独立的临时目录（landlord 库 + 租户库），全局配置只初始化一次。

#![allow(dead_code, unused_macros)]

use std::net::SocketAddr;
use std::sync::Once;

use actix_web::web;
use tempfile::TempDir;

use salesdesk::api::AppState;
use salesdesk::config::{StaticConfig, replace_config};
use salesdesk::runtime::lifetime::startup::build_state;
use salesdesk::storage::{Tenant, open_landlord};
use salesdesk::tenancy::RegisterTenant;

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const LANDLORD_TOKEN: &str = "landlord-test-token";
pub const ADMIN_EMAIL: &str = "owner@acme.io";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

static INIT: Once = Once::new();

fn base_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.auth.landlord_token = LANDLORD_TOKEN.to_string();
    config
}

pub fn init_static_config() {
    INIT.call_once(|| replace_config(base_config()));
}

pub struct TestEnv {
    pub dir: TempDir,
    pub config: StaticConfig,
    pub state: web::Data<AppState>,
}

impl TestEnv {
    pub async fn new() -> Self {
        init_static_config();

        let dir = TempDir::new().expect("创建临时目录失败");
        let mut config = base_config();
        config.database.landlord_url =
            format!("sqlite://{}?mode=rwc", dir.path().join("landlord.db").display());
        config.tenancy.database_dir = dir.path().join("tenants").display().to_string();

        let landlord = open_landlord(&config.database)
            .await
            .expect("打开 landlord 库失败");
        let state = build_state(&config, landlord).expect("构造 AppState 失败");

        Self {
            dir,
            config,
            state: web::Data::new(state),
        }
    }

    pub fn tenant_file(&self, database_name: &str) -> std::path::PathBuf {
        self.dir
            .path()
            .join("tenants")
            .join(format!("{}.db", database_name))
    }

    /// 直接通过开通器注册一个租户
    pub async fn register(&self, subdomain: &str) -> Tenant {
        self.state
            .provisioner
            .register(RegisterTenant {
                company_name: format!("{} Ltd", subdomain),
                subdomain: subdomain.to_string(),
                admin_name: "Owner".to_string(),
                admin_email: ADMIN_EMAIL.to_string(),
                admin_password: ADMIN_PASSWORD.to_string(),
            })
            .await
            .expect("开通租户失败")
    }
}

/// 每次调用返回不同的来源地址，避免触发登录限流
pub fn peer(n: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40000 + n))
}

/// 带 API 路由和健康检查的测试应用
macro_rules! test_app {
    ($env:expr) => {{
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($env.state.clone())
                .service(salesdesk::api::services::health_routes())
                .service(salesdesk::api::services::api_v1_routes()),
        )
        .await
    }};
}

/// 发送请求，返回状态码和 JSON 响应体
macro_rules! call_json {
    ($app:expr, $req:expr) => {{
        let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body = actix_web::test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }};
}

/// 登录并返回 access token
macro_rules! login {
    ($app:expr, $tenant:expr, $email:expr, $password:expr, $peer:expr) => {{
        let (status, body) = call_json!(
            $app,
            actix_web::test::TestRequest::post()
                .uri("/api/v1/auth/login")
                .peer_addr($peer)
                .insert_header(("X-Tenant", $tenant))
                .set_json(serde_json::json!({ "email": $email, "password": $password }))
        );
        assert_eq!(status, actix_web::http::StatusCode::OK, "login failed: {}", body);
        body["data"]["access_token"]
            .as_str()
            .expect("access_token missing")
            .to_string()
    }};
}
