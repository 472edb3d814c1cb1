//! 서버 공통 설정
//!
//! 세 서비스가 함께 쓰는 값(광고용 주소, 저장소 DSN, 토폴로지, 세션 TTL 등)을
//! 환경 변수에서 읽습니다. 값이 없으면 기본값을 사용합니다.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// 기본값 상수
const DEFAULT_SERVER_IP: &str = "127.0.0.1";
const DEFAULT_SERVER_ID: u32 = 20201;
const DEFAULT_DATABASE_URL: &str = "memory://";
const DEFAULT_SESSION_TTL_SECS: u64 = 900;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// 서버 공통 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 클라이언트에게 광고할 IP
    pub server_ip: String,
    /// 이 게임 서버의 ID
    pub server_id: u32,
    /// 계정 저장소 DSN
    pub database_url: String,
    /// 원격 토폴로지 서버 URL
    pub topology_url: Option<String>,
    /// 정적 토폴로지 JSON 파일
    pub topology_file: Option<PathBuf>,
    /// 게임 설정 JSON 파일
    pub game_config_file: Option<PathBuf>,
    /// 난독화 테이블 파일
    pub crypt_table_path: Option<PathBuf>,
    pub session_ttl_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_ip: DEFAULT_SERVER_IP.to_string(),
            server_id: DEFAULT_SERVER_ID,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            topology_url: None,
            topology_file: None,
            game_config_file: None,
            crypt_table_path: None,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{} 값이 올바르지 않습니다 ({}): {}", key, raw, e)),
        None => Ok(default),
    }
}

impl ServerConfig {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        super::load_env();

        let defaults = Self::default();
        let config = Self {
            server_ip: non_empty("SERVER_IP").unwrap_or(defaults.server_ip),
            server_id: parse_var("SERVER_ID", defaults.server_id)?,
            database_url: non_empty("DATABASE_URL").unwrap_or(defaults.database_url),
            topology_url: non_empty("TOPOLOGY_URL"),
            topology_file: non_empty("TOPOLOGY_FILE").map(PathBuf::from),
            game_config_file: non_empty("GAME_CONFIG_FILE").map(PathBuf::from),
            crypt_table_path: non_empty("CRYPT_TABLE_PATH").map(PathBuf::from),
            session_ttl_secs: parse_var("SESSION_TTL_SECS", defaults.session_ttl_secs)?,
            shutdown_grace_secs: parse_var("SHUTDOWN_GRACE_SECS", defaults.shutdown_grace_secs)?,
        };

        config.validate().context("서버 설정 검증 실패")?;
        info!(
            "서버 설정 로드: ip={}, id={}, db={}",
            config.server_ip, config.server_id, config.database_url
        );
        Ok(config)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.server_ip.parse::<std::net::IpAddr>().is_err() {
            return Err(anyhow!("SERVER_IP가 IP 주소가 아닙니다: {}", self.server_ip));
        }
        if self.session_ttl_secs == 0 {
            return Err(anyhow!("SESSION_TTL_SECS는 0보다 커야 합니다"));
        }
        if self.database_url.is_empty() {
            return Err(anyhow!("DATABASE_URL이 비어 있습니다"));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_id, 20201);
        assert_eq!(config.session_ttl(), Duration::from_secs(900));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
    }

    #[test]
    fn test_validation_errors() {
        let config = ServerConfig {
            server_ip: "not-an-ip".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            session_ttl_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_var_default() {
        let value: u64 = parse_var("GOLF_TEST_UNSET_VARIABLE_FOR_PARSE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
