//! HTTP 层：中间件、handler、JWT 和共享状态

pub mod constants;
pub mod jwt;
pub mod middleware;
pub mod services;
pub mod state;

pub use state::AppState;
