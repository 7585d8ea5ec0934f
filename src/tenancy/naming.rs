//! 子域名校验与租户库命名

use crate::errors::{CrmError, Result};

/// 不允许注册的子域名
pub const RESERVED_SUBDOMAINS: &[&str] =
    &["www", "api", "admin", "app", "mail", "landlord", "static"];

const MIN_SUBDOMAIN_LEN: usize = 3;
const MAX_SUBDOMAIN_LEN: usize = 63;

/// 规范化并校验子域名：3-63 位小写字母/数字/`-`，首尾不能是 `-`
pub fn validate_subdomain(raw: &str) -> Result<String> {
    let subdomain = raw.trim().to_ascii_lowercase();

    if subdomain.len() < MIN_SUBDOMAIN_LEN || subdomain.len() > MAX_SUBDOMAIN_LEN {
        return Err(CrmError::validation(format!(
            "Subdomain must be {}-{} characters long",
            MIN_SUBDOMAIN_LEN, MAX_SUBDOMAIN_LEN
        )));
    }

    if !subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CrmError::validation(
            "Subdomain may only contain lowercase letters, digits and '-'",
        ));
    }

    if subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err(CrmError::validation(
            "Subdomain cannot start or end with '-'",
        ));
    }

    if RESERVED_SUBDOMAINS.contains(&subdomain.as_str()) {
        return Err(CrmError::validation(format!(
            "Subdomain '{}' is reserved",
            subdomain
        )));
    }

    Ok(subdomain)
}

/// `tenant_` + 子域名（`-` 换成 `_`）
pub fn database_name_for(prefix: &str, subdomain: &str) -> String {
    format!("{}{}", prefix, subdomain.replace('-', "_"))
}

/// 用于 `CREATE DATABASE` 的名字只允许 `[A-Za-z0-9_]`
pub fn ensure_safe_identifier(name: &str) -> Result<()> {
    if name.is_empty()
        || name.len() > 63
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CrmError::database_config(format!(
            "Unsafe database name: '{}'",
            name
        )));
    }
    Ok(())
}

/// 从 Host 中取出租户子域名：`acme.crm.example.com` + `crm.example.com` → `acme`
pub fn subdomain_from_host(host: &str, base_domain: &str) -> Option<String> {
    let host = host.split(':').next()?.trim_end_matches('.').to_ascii_lowercase();
    let base = base_domain.trim_matches('.').to_ascii_lowercase();

    let prefix = host.strip_suffix(&base)?.strip_suffix('.')?;
    if prefix.is_empty() || prefix.contains('.') {
        return None;
    }
    Some(prefix.to_string())
}
