//! 进程级设施
//!
//! - `logging`: tracing subscriber 初始化

pub mod logging;

pub use logging::init_logging;
