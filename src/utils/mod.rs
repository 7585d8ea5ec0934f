pub mod password;
pub mod validation;

/// 生成随机 token（uuid v4 拼接，hex 编码）
///
/// `bytes` 向上取整到 16 的倍数
pub fn generate_secure_token(bytes: usize) -> String {
    let chunks = bytes.div_ceil(16).max(1);
    (0..chunks)
        .map(|_| uuid::Uuid::new_v4().simple().to_string())
        .collect()
}
