//! 租户库实体
//!
//! 除 `branch`、`module`、`role`、`user`、`team_member` 外，
//! 所有业务表都带有 `module_id` 和 `branch_id` 列。

pub mod branch;
pub mod category;
pub mod lead;
pub mod module;
pub mod product;
pub mod role;
pub mod service;
pub mod target;
pub mod team;
pub mod team_member;
pub mod unit;
pub mod user;
pub mod vendor;
