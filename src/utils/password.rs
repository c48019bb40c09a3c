use crate::utils::error::Result;

pub use bcrypt::DEFAULT_COST;

/// bcrypt 雜湊（`$2b$`），入口網站後端可直接驗證
pub fn hash_password(password: &str) -> Result<String> {
    hash_with_cost(password, DEFAULT_COST)
}

pub fn hash_with_cost(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// 格式錯誤的雜湊一律視為不符
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
