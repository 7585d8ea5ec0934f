//! 业务逻辑层
//!
//! HTTP handler 只负责解析请求和包装响应，这里完成校验、权限检查和数据库读写。
//! 所有租户数据的操作都以 `RequestContext` 为入口。

pub mod auth;
pub mod catalog;
mod checks;
pub mod leads;
pub mod org;
mod pagination;
pub mod targets;
pub mod teams;

pub use pagination::{Page, Pagination, fetch_page};

use sea_orm::sea_query::LikeExpr;
use serde::{Deserialize, Deserializer};

/// 区分「字段缺省」和「显式 null」：缺省 → None，null → Some(None)
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 模糊搜索用的 LIKE 模式，空白返回 None
pub(crate) fn like_pattern(search: Option<&str>) -> Option<LikeExpr> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| LikeExpr::new(format!("%{}%", escape_like(s))).escape('\\'))
}

/// 用户输入里的 `%` `_` 按字面匹配
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        parent_id: Option<Option<i32>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.parent_id, None);
        let null: Patch = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(null.parent_id, Some(None));
        let set: Patch = serde_json::from_str(r#"{"parent_id": 3}"#).unwrap();
        assert_eq!(set.parent_id, Some(Some(3)));
    }

    #[test]
    fn test_like_pattern() {
        assert!(like_pattern(Some(" acme ")).is_some());
        assert!(like_pattern(Some("  ")).is_none());
        assert!(like_pattern(None).is_none());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("acme"), "acme");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
    }
}
