//! 数据库操作重试
//!
//! landlord 库和租户库共用。连接池获取失败、死锁、SQLite busy 按指数退避重试；
//! 租户库不存在说明开通没完成或库被删掉了，重试没有意义，直接交给上层处理。

use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// 数据库错误的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 连接抖动、死锁、锁超时
    Transient,
    /// 目标库不存在（租户未开通完成或已被删除）
    MissingDatabase,
    Permanent,
}

pub fn classify(err: &DbErr) -> FailureKind {
    match err {
        DbErr::ConnectionAcquire(_) => FailureKind::Transient,
        DbErr::Conn(runtime_err) => match classify_runtime(runtime_err) {
            FailureKind::Permanent => FailureKind::Transient, // 其余连接问题按抖动处理
            kind => kind,
        },
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => classify_runtime(runtime_err),
        _ => FailureKind::Permanent,
    }
}

pub fn is_retryable_error(err: &DbErr) -> bool {
    classify(err) == FailureKind::Transient
}

fn classify_runtime(err: &sea_orm::error::RuntimeErr) -> FailureKind {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            if let Some(code) = sqlx_err
                .deref()
                .as_database_error()
                .and_then(|db_err| db_err.code())
            {
                return classify_code(code.as_ref());
            }
            classify_message(&sqlx_err.to_string().to_lowercase())
        }
        RuntimeErr::Internal(msg) => classify_message(&msg.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => FailureKind::Permanent,
    }
}

fn classify_code(code: &str) -> FailureKind {
    match code {
        // MySQL 死锁/锁超时，PostgreSQL 序列化失败/死锁，SQLite BUSY/LOCKED
        "1213" | "1205" | "40001" | "40P01" | "5" | "6" => FailureKind::Transient,
        // MySQL unknown database，PostgreSQL invalid_catalog_name，SQLite CANTOPEN
        "1049" | "3D000" | "14" => FailureKind::MissingDatabase,
        _ => FailureKind::Permanent,
    }
}

/// 没有错误码时按消息判断（连接阶段的错误只剩字符串）
fn classify_message(msg: &str) -> FailureKind {
    if msg.contains("unknown database")
        || msg.contains("unable to open database file")
        || (msg.contains("database") && msg.contains("does not exist"))
    {
        FailureKind::MissingDatabase
    } else if msg.contains("deadlock")
        || msg.contains("lock wait timeout")
        || msg.contains("database is locked")
        || msg.contains("serialization failure")
    {
        FailureKind::Transient
    } else {
        FailureKind::Permanent
    }
}

/// 重试配置
#[derive(Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn from_config(config: &crate::config::DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// 指数退避重试执行器
///
/// 对可重试错误自动进行重试，每次等待时间翻倍，不超过 `max_delay_ms`
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, attempt
                    );
                }
                return Ok(result);
            }
            Err(e) => match classify(&e) {
                FailureKind::Transient if attempt < config.max_retries => {
                    attempt += 1;
                    let delay =
                        calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
                    warn!(
                        "Operation '{}' failed (attempt {}/{}): {}; retrying in {} ms",
                        operation_name,
                        attempt,
                        config.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
                FailureKind::MissingDatabase => {
                    warn!("Operation '{}' hit a missing database: {}", operation_name, e);
                    return Err(e);
                }
                kind => {
                    debug!("Operation '{}' gave up ({:?}): {}", operation_name, kind, e);
                    return Err(e);
                }
            },
        }
    }
}

/// 计算指数退避延迟
fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    exp_delay.min(max_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::error::{ConnAcquireErr, RuntimeErr};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn internal(msg: &str) -> RuntimeErr {
        RuntimeErr::Internal(msg.to_string())
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            base_delay_ms: 5,
            max_delay_ms: 20,
        }
    }

    #[test]
    fn test_classify_transient() {
        assert_eq!(
            classify(&DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)),
            FailureKind::Transient
        );
        assert_eq!(
            classify(&DbErr::Conn(internal("connection reset by peer"))),
            FailureKind::Transient
        );
        assert_eq!(
            classify(&DbErr::Exec(internal("Deadlock found when trying to get lock"))),
            FailureKind::Transient
        );
        assert_eq!(
            classify(&DbErr::Query(internal("database is locked"))),
            FailureKind::Transient
        );
    }

    #[test]
    fn test_classify_missing_tenant_database() {
        let mysql = DbErr::Conn(internal(
            "error returned from database: 1049 (42000): Unknown database 'crm_acme'",
        ));
        let postgres = DbErr::Conn(internal(r#"database "crm_acme" does not exist"#));
        let sqlite = DbErr::Conn(internal("unable to open database file"));

        for err in [mysql, postgres, sqlite] {
            assert_eq!(classify(&err), FailureKind::MissingDatabase);
            assert!(!is_retryable_error(&err));
        }
    }

    #[test]
    fn test_classify_codes() {
        assert_eq!(classify_code("40P01"), FailureKind::Transient);
        assert_eq!(classify_code("3D000"), FailureKind::MissingDatabase);
        assert_eq!(classify_code("23505"), FailureKind::Permanent);
    }

    #[test]
    fn test_classify_permanent() {
        assert_eq!(
            classify(&DbErr::RecordNotFound("lead 3".to_string())),
            FailureKind::Permanent
        );
        assert_eq!(
            classify(&DbErr::Exec(internal("UNIQUE constraint failed: users.email"))),
            FailureKind::Permanent
        );
    }

    #[test]
    fn test_retry_config_from_database_config() {
        let db = crate::config::DatabaseConfig {
            retry_count: 5,
            retry_base_delay_ms: 20,
            retry_max_delay_ms: 80,
            ..Default::default()
        };
        let config = RetryConfig::from_config(&db);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 20);
        assert_eq!(config.max_delay_ms, 80);
    }

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(1, 100, 2000), 100);
        assert_eq!(calculate_backoff(3, 100, 2000), 400);
        assert_eq!(calculate_backoff(64, 100, 2000), 2000);
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_pool_timeouts() {
        let calls = AtomicU32::new(0);

        let result = with_retry("load_tenant", fast(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout))
                } else {
                    Ok("acme")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "acme");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);

        let result = with_retry("load_tenant", fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(DbErr::Query(internal("database is locked"))) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_missing_database() {
        let calls = AtomicU32::new(0);

        let result = with_retry("connect_tenant(crm_gone)", fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(DbErr::Conn(internal(r#"database "crm_gone" does not exist"#)))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
