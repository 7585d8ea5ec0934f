//! 用户界面（运维 CLI）

#[cfg(feature = "cli")]
pub mod cli;
