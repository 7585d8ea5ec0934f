//! 运行模式
//!
//! - Server：HTTP 服务（默认，`serve` 子命令或无参数）
//! - CLI：运维命令（迁移、租户管理、配置生成）

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "server")]
pub use server::run_server;

#[cfg(feature = "cli")]
pub use cli::run_cli;
