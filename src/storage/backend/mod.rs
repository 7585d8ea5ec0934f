//! SeaORM 连接层
//!
//! 支持 SQLite、MySQL/MariaDB 和 PostgreSQL。

mod connection;
pub mod retry;

pub use connection::{
    BackendKind, connect, connect_generic, connect_sqlite, run_landlord_migrations,
    run_tenant_migrations,
};
pub use retry::{FailureKind, RetryConfig, classify, with_retry};
