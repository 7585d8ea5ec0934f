//! 输入校验工具（各 CRM 资源共用）

use crate::errors::{CrmError, Result};

/// 必填字符串：trim 后非空且不超过 `max_len` 个字符
pub fn required_text(field: &str, value: &str, max_len: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CrmError::validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(CrmError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

/// 可选字符串：空白视为 None
pub fn optional_text(field: &str, value: Option<&str>, max_len: usize) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max_len).map(Some),
    }
}

/// 简单的邮箱格式检查：`local@domain.tld`
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

pub fn email(field: &str, value: &str) -> Result<String> {
    let normalized = value.trim().to_ascii_lowercase();
    if !is_valid_email(&normalized) {
        return Err(CrmError::validation(format!(
            "{} must be a valid email address",
            field
        )));
    }
    Ok(normalized)
}

pub fn optional_email(field: &str, value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => email(field, v).map(Some),
    }
}

/// 金额类字段：有限且 >= 0
pub fn non_negative(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(CrmError::validation(format!(
            "{} must be zero or greater",
            field
        )));
    }
    Ok(value)
}

pub fn positive(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CrmError::validation(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("name", "  Acme  ", 10).unwrap(), "Acme");
        assert!(required_text("name", "   ", 10).is_err());
        assert!(required_text("name", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("notes", None, 10).unwrap(), None);
        assert_eq!(optional_text("notes", Some("  "), 10).unwrap(), None);
        assert_eq!(
            optional_text("notes", Some(" hi "), 10).unwrap(),
            Some("hi".to_string())
        );
    }

    #[test]
    fn test_email() {
        assert_eq!(email("email", " Jane@Acme.IO ").unwrap(), "jane@acme.io");
        assert!(email("email", "jane@acme").is_err());
        assert!(email("email", "@acme.io").is_err());
        assert!(email("email", "jane@@acme.io").is_err());
        assert!(email("email", "ja ne@acme.io").is_err());
        assert_eq!(optional_email("email", Some("")).unwrap(), None);
    }

    #[test]
    fn test_amounts() {
        assert!(non_negative("price", 0.0).is_ok());
        assert!(non_negative("price", -0.01).is_err());
        assert!(non_negative("price", f64::NAN).is_err());
        assert!(positive("target_amount", 0.0).is_err());
        assert!(positive("target_amount", 10.0).is_ok());
    }
}
