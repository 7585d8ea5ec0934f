//! 多租户
//!
//! - `naming`: 子域名规则、租户库命名
//! - `database`: 租户库的创建/删除
//! - `provisioning`: 注册开通与失败回收
//! - `resolver`: 请求到租户的解析

pub mod database;
pub mod naming;
pub mod provisioning;
pub mod resolver;

pub use database::TenantDatabases;
pub use provisioning::{Provisioner, RegisterTenant};
pub use resolver::TenantResolver;
