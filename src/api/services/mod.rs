pub mod auth;
pub mod catalog;
pub mod error_code;
pub mod health;
pub mod helpers;
pub mod org;
pub mod routes;
pub mod sales;
pub mod tenants;
pub mod types;

pub use error_code::ErrorCode;
pub use health::{HealthService, health_routes};
pub use routes::{api_v1_routes, json_config};
