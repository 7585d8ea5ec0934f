//! 服务启动前的准备：landlord 库、租户连接缓存、开通器、解析器

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::config::StaticConfig;
use crate::storage::{self, LandlordStore, RetryConfig, TenantConnections};
use crate::tenancy::{Provisioner, TenantDatabases, TenantResolver};

/// 由 landlord store 组装出 HTTP 层共享状态
pub fn build_state(config: &StaticConfig, landlord: Arc<LandlordStore>) -> Result<AppState> {
    let databases = Arc::new(
        TenantDatabases::new(&config.database, &config.tenancy)
            .context("Invalid tenant database configuration")?,
    );
    let connections = Arc::new(TenantConnections::new(
        databases,
        &config.tenancy,
        RetryConfig::from_config(&config.database),
    ));
    let provisioner = Arc::new(Provisioner::new(
        landlord.clone(),
        connections.clone(),
        &config.tenancy,
    ));
    let resolver = Arc::new(TenantResolver::new(landlord.clone(), &config.tenancy));

    Ok(AppState::new(landlord, connections, provisioner, resolver))
}

/// 连接并迁移 landlord 库，构造 `AppState`
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<AppState> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let landlord = storage::open_landlord(&config.database)
        .await
        .context("Failed to open landlord database")?;

    let state = build_state(config, landlord)?;
    info!(
        "Tenant databases: {} backend, prefix '{}'",
        state.connections.databases().backend(),
        config.tenancy.database_prefix
    );

    check_security(config);

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(state)
}

fn check_security(config: &StaticConfig) {
    if config.auth.jwt_secret.is_empty() {
        warn!(
            "auth.jwt_secret is empty: a random secret is used and all tokens \
             become invalid after restart"
        );
    } else if config.auth.jwt_secret.len() < 32 {
        warn!("auth.jwt_secret is shorter than 32 bytes");
    }

    if config.auth.landlord_token.is_empty() {
        info!("Landlord API is disabled (auth.landlord_token not set)");
    }
}
