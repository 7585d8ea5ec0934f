//! 密码哈希工具模块
//!
//! 使用 Argon2id 算法进行密码哈希和验证（租户用户密码、landlord token）

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use subtle::ConstantTimeEq;

/// 密码哈希错误
#[derive(Debug)]
pub enum PasswordError {
    HashError(String),
    VerifyError(String),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HashError(msg) => write!(f, "Password hash error: {}", msg),
            Self::VerifyError(msg) => write!(f, "Password verify error: {}", msg),
        }
    }
}

impl std::error::Error for PasswordError {}

/// 对密码进行 Argon2id 哈希
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// 验证密码是否匹配哈希
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::VerifyError(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// 账号不存在时也跑一次 argon2，登录失败的耗时与密码错误一致
pub fn verify_dummy(password: &str) {
    let dummy = DUMMY_HASH.get_or_init(|| hash_password("salesdesk-dummy-password").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}

/// 检测字符串是否是 Argon2 哈希格式
pub fn is_argon2_hash(s: &str) -> bool {
    s.starts_with("$argon2")
}

/// 新密码最少 8 位
pub const MIN_PASSWORD_LEN: usize = 8;

/// 校验新密码长度后哈希
pub fn hash_new_password(password: &str) -> crate::errors::Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(crate::errors::CrmError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    hash_password(password).map_err(crate::errors::CrmError::from)
}

/// landlord token 兼容明文和 argon2 哈希两种配置
pub fn verify_secret(candidate: &str, configured: &str) -> bool {
    if is_argon2_hash(configured) {
        verify_password(candidate, configured).unwrap_or(false)
    } else {
        !configured.is_empty() && candidate.as_bytes().ct_eq(configured.as_bytes()).into()
    }
}

impl From<PasswordError> for crate::errors::CrmError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::HashError(_) => crate::errors::CrmError::Internal(err.to_string()),
            PasswordError::VerifyError(_) => crate::errors::CrmError::Unauthorized(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "test_password_123";
        let hash = hash_password(password).expect("hash should succeed");

        assert!(is_argon2_hash(&hash));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
        assert!(!verify_password("wrong_password", &hash).expect("verify should succeed"));
    }

    #[test]
    fn test_is_argon2_hash() {
        assert!(is_argon2_hash("$argon2id$v=19$m=19456,t=2,p=1$xxx"));
        assert!(is_argon2_hash("$argon2i$v=19$m=19456,t=2,p=1$xxx"));
        assert!(!is_argon2_hash("plaintext_password"));
        assert!(!is_argon2_hash("$bcrypt$xxx"));
    }

    #[test]
    fn test_hash_new_password_enforces_length() {
        assert!(hash_new_password("short").is_err());
        let hash = hash_new_password("long-enough").unwrap();
        assert!(verify_password("long-enough", &hash).unwrap());
    }

    #[test]
    fn test_verify_dummy_initializes_hash_once() {
        verify_dummy("anything");
        let first = DUMMY_HASH.get().cloned().flatten().expect("dummy hash");
        assert!(is_argon2_hash(&first));

        verify_dummy("something else");
        assert_eq!(DUMMY_HASH.get().cloned().flatten(), Some(first));
    }

    #[test]
    fn test_verify_secret() {
        assert!(verify_secret("ops-token", "ops-token"));
        assert!(!verify_secret("ops", "ops-token"));
        assert!(!verify_secret("", ""));
        assert!(!verify_secret("ops-token-extra", "ops-token"));
        assert!(!verify_secret("OPS-TOKEN", "ops-token"));

        let hashed = hash_password("ops-token").unwrap();
        assert!(verify_secret("ops-token", &hashed));
        assert!(!verify_secret("nope", &hashed));
    }
}
