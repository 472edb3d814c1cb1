//! 환경 설정
//!
//! - [`ServerConfig`]: 환경 변수(.env)에서 읽는 서버 공통 설정
//! - [`GameConfig`]: 시작 캐릭터, 기본 클럽 세트, 채널 목록 매니페스트

pub mod game_config;
pub mod server_config;

pub use game_config::{ChannelConfig, CharacterDefaults, GameConfig};
pub use server_config::ServerConfig;

use std::path::Path;
use tracing::{debug, warn};

/// .env 파일 로드
///
/// 서브 크레이트에서 실행되는 경우를 위해 상위 디렉토리도 찾습니다.
/// 찾지 못하면 프로세스 환경 변수만 사용합니다.
///
/// # Returns
/// 로드한 파일 경로
pub fn load_env() -> Option<&'static str> {
    const ENV_PATHS: [&str; 3] = ["../.env", ".env", "../../.env"];

    for path in ENV_PATHS {
        if Path::new(path).exists() && dotenv::from_filename(path).is_ok() {
            debug!("환경 파일 로드: {}", path);
            return Some(path);
        }
    }

    if dotenv::dotenv().is_err() {
        warn!(".env 파일을 찾을 수 없어서 환경 변수를 직접 사용합니다.");
    }
    None
}
