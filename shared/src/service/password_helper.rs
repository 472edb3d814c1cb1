//! 비밀번호 해시/검증 도우미

use anyhow::Result;
use bcrypt::{hash, verify};

pub use bcrypt::DEFAULT_COST;

/// 테스트에서 쓰는 가장 낮은 비용
pub const MIN_COST: u32 = 4;

/// 지정한 비용으로 bcrypt 해시
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    let hashed = hash(password, cost)?;
    Ok(hashed)
}

/// 해시와 비밀번호 비교
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let valid = verify(password, hash)?;
    Ok(valid)
}

/// 계정 이름 검사 (영문, 숫자, `_`, 1~22자)
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.len() > 22 {
        return Err(anyhow::anyhow!("계정 이름은 1~22자여야 합니다"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(anyhow::anyhow!("계정 이름에 쓸 수 없는 문자가 있습니다"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let hashed = hash_password("secret", MIN_COST).unwrap();
        assert_ne!(hashed, "secret");
        assert!(verify_password("secret", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(23)).is_err());
    }
}
