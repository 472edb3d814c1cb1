//! 로깅 시스템
//!
//! 모든 서버가 `tracing` 매크로로 로그를 남기고, 프로세스 시작 시
//! `init_logging`으로 `tracing-subscriber`를 한 번 설치합니다.
//!
//! # 사용 예시
//! ```rust,no_run
//! use shared::logging::{init_logging, ServiceType};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(ServiceType::GameCenter)?;
//!     tracing::info!("서버 시작");
//!     Ok(())
//! }
//! ```

pub mod config;

pub use config::{LoggingConfig, ServiceType};

use anyhow::Result;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// 로깅 시스템 초기화 함수
///
/// `RUST_LOG`가 설정되어 있으면 그 값을, 없으면 `LoggingConfig`의 기본 필터를 사용합니다.
/// 이미 전역 subscriber가 설치된 경우(테스트에서 여러 번 호출) 조용히 넘어갑니다.
///
/// # Arguments
/// * `service_type` - 로그를 남기는 서비스 종류
///
/// # Returns
/// 필터 파싱 실패 시 에러
pub fn init_logging(service_type: ServiceType) -> Result<()> {
    init_logging_with(service_type, &LoggingConfig::from_env())
}

/// 지정한 설정으로 로깅 시스템 초기화
pub fn init_logging_with(service_type: ServiceType, config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_filter)
            .map_err(|e| anyhow::anyhow!("로깅 설정 파싱 실패: {e}"))?,
    };

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_ansi(config.ansi)
        .try_init()
        .is_ok();

    if installed {
        debug!("로깅 초기화 완료: {}", service_type.as_str());
    }
    Ok(())
}
