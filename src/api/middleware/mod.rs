pub mod landlord_auth;
pub mod request_id;
pub mod tenant_auth;

pub use landlord_auth::LandlordAuth;
pub use request_id::{RequestId, RequestIdMiddleware};
pub use tenant_auth::TenantAuth;
