//! API 模块常量定义
//!
//! 请求头名称等硬编码常量。

/// 显式指定租户（子域名），优先于 Host
pub const TENANT_HEADER: &str = "X-Tenant";

/// 切换业务模块
pub const MODULE_HEADER: &str = "X-Module-Id";

/// 切换分支
pub const BRANCH_HEADER: &str = "X-Branch-Id";

/// 请求追踪 ID
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// JSON 请求体上限
pub const JSON_PAYLOAD_LIMIT: usize = 256 * 1024;

/// 分页默认值与上限
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
