//! 로깅 설정 관리
//!
//! 서비스 타입 정의와 로그 필터 기본값을 담당합니다.

use serde::{Deserialize, Serialize};

/// 서비스 타입 열거형
///
/// 각 서버 컴포넌트를 구분하며 로그 타깃 이름으로 사용됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceType {
    /// 로그인 서버
    LoginServer,
    /// 게임 서버
    GameServer,
    /// 메시지 서버
    MessageServer,
    /// 통합 런처
    GameCenter,
    /// 공유 라이브러리
    Shared,
}

impl ServiceType {
    /// 서비스 타입을 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::LoginServer => "loginserver",
            ServiceType::GameServer => "gameserver",
            ServiceType::MessageServer => "messageserver",
            ServiceType::GameCenter => "gamecenter",
            ServiceType::Shared => "shared",
        }
    }
}

/// 로깅 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `RUST_LOG`가 없을 때 사용할 기본 필터
    pub default_filter: String,

    /// 로그에 타깃(모듈 경로) 표시 여부
    pub show_target: bool,

    /// ANSI 색상 사용 여부
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            show_target: true,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// 환경변수에서 로깅 설정 로드
    ///
    /// `LOG_LEVEL`, `LOG_SHOW_TARGET`, `LOG_ANSI`를 읽습니다.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.default_filter = level;
        }
        if let Ok(val) = std::env::var("LOG_SHOW_TARGET") {
            config.show_target = val.parse().unwrap_or(true);
        }
        if let Ok(val) = std::env::var("LOG_ANSI") {
            config.ansi = val.parse().unwrap_or(true);
        }

        config
    }
}
