use std::str::FromStr;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{debug, info};

use crate::errors::{CrmError, Result};
use migration::{LandlordMigrator, MigratorTrait, TenantMigrator};

/// 数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    MySql,
    Postgres,
}

impl BackendKind {
    /// 从数据库 URL 推断数据库类型
    pub fn infer(database_url: &str) -> Result<Self> {
        if database_url.starts_with("sqlite:")
            || database_url.ends_with(".db")
            || database_url.ends_with(".sqlite")
        {
            Ok(Self::Sqlite)
        } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
            Ok(Self::MySql)
        } else if database_url.starts_with("postgres://")
            || database_url.starts_with("postgresql://")
        {
            Ok(Self::Postgres)
        } else {
            Err(CrmError::database_config(format!(
                "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
                database_url
            )))
        }
    }
}

/// 连接数据库，按 URL 选择驱动
pub async fn connect(database_url: &str, pool_size: u32) -> Result<DatabaseConnection> {
    let backend = BackendKind::infer(database_url)?;
    debug!("Connecting to {} database", backend);

    match backend {
        BackendKind::Sqlite => connect_sqlite(database_url).await,
        _ => connect_generic(database_url, backend, pool_size).await,
    }
}

/// 连接 SQLite 数据库（文件不存在时自动创建）
pub async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::SqlitePool;
    use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};

    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}", database_url)
    };

    let opt = SqliteConnectOptions::from_str(&url)
        .map_err(|e| CrmError::database_config(format!("Invalid SQLite URL: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true)
        .pragma("temp_store", "memory");

    let pool = SqlitePool::connect_with(opt).await.map_err(|e| {
        CrmError::database_connection(format!("Unable to open SQLite database: {}", e))
    })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接 MySQL / PostgreSQL
pub async fn connect_generic(
    database_url: &str,
    backend: BackendKind,
    pool_size: u32,
) -> Result<DatabaseConnection> {
    let timeout = Duration::from_secs(crate::config::get_config().database.timeout);

    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(pool_size)
        .min_connections(pool_size.min(2))
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    Database::connect(opt).await.map_err(|e| {
        CrmError::database_connection(format!(
            "Unable to connect to {} database: {}",
            backend.to_string().to_uppercase(),
            e
        ))
    })
}

/// landlord 库迁移
pub async fn run_landlord_migrations(db: &DatabaseConnection) -> Result<()> {
    LandlordMigrator::up(db, None)
        .await
        .map_err(|e| CrmError::database_operation(format!("Landlord migration failed: {}", e)))?;

    info!("Landlord migrations completed");
    Ok(())
}

/// 租户库迁移（开通和 `tenant migrate` 共用）
pub async fn run_tenant_migrations(db: &DatabaseConnection) -> Result<()> {
    TenantMigrator::up(db, None)
        .await
        .map_err(|e| CrmError::database_operation(format!("Tenant migration failed: {}", e)))?;

    debug!("Tenant migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend() {
        assert_eq!(
            BackendKind::infer("sqlite://landlord.db?mode=rwc").unwrap(),
            BackendKind::Sqlite
        );
        assert_eq!(
            BackendKind::infer("tenants/acme.db").unwrap(),
            BackendKind::Sqlite
        );
        assert_eq!(
            BackendKind::infer("mariadb://root@localhost/crm").unwrap(),
            BackendKind::MySql
        );
        assert_eq!(
            BackendKind::infer("postgresql://localhost/crm").unwrap(),
            BackendKind::Postgres
        );
        assert!(BackendKind::infer("redis://localhost").is_err());
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(BackendKind::Postgres.to_string(), "postgres");
        assert_eq!(BackendKind::MySql.to_string(), "mysql");
    }
}
