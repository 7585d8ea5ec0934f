//! salesdesk - multi-tenant sales/CRM backend
//!
//! 每个公司（租户）一个独立数据库，landlord 库记录租户及其状态。
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: 运维命令行
//!
//! # Architecture
//! - `storage`: landlord 库、连接与租户连接池
//! - `tenancy`: 子域名规则、开通/回收、请求 → 租户解析
//! - `access`: 角色权限、请求上下文、分支隔离
//! - `services`: CRM 业务（组织、目录、线索、团队、目标）
//! - `api`: HTTP handler 与中间件
//! - `interfaces`: CLI
//! - `config`: 静态配置
//! - `runtime`: 启动、关闭与运行模式
//! - `system`: 日志

pub mod access;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod tenancy;
pub mod utils;
