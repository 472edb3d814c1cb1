//! 런처 설정 모듈
//!
//! 세 서비스의 바인드 주소와 활성화 여부, 그리고 공통 [`ServerConfig`]를 묶습니다.

use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use shared::config::ServerConfig;

// 기본값 상수
const DEFAULT_LOGIN_ADDR: &str = "127.0.0.1:10103";
const DEFAULT_GAME_ADDR: &str = "127.0.0.1:20201";
const DEFAULT_MESSAGE_ADDR: &str = "127.0.0.1:30303";

/// 서버 엔드포인트 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub address: SocketAddr,
    pub enabled: bool,
}

impl ServerEndpoint {
    fn parse(address: &str) -> Result<Self> {
        Ok(Self {
            address: address
                .parse()
                .with_context(|| format!("주소 형식이 올바르지 않습니다: {}", address))?,
            enabled: true,
        })
    }

    /// 포트 0 (임의 포트) 여부
    pub fn is_ephemeral(&self) -> bool {
        self.address.port() == 0
    }
}

/// 게임센터 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCenterConfig {
    pub login: ServerEndpoint,
    pub game: ServerEndpoint,
    pub message: ServerEndpoint,
    pub server: ServerConfig,
}

impl GameCenterConfig {
    /// 기본 주소로 설정 생성
    pub fn with_defaults(server: ServerConfig) -> Result<Self> {
        Ok(Self {
            login: ServerEndpoint::parse(DEFAULT_LOGIN_ADDR)?,
            game: ServerEndpoint::parse(DEFAULT_GAME_ADDR)?,
            message: ServerEndpoint::parse(DEFAULT_MESSAGE_ADDR)?,
            server,
        })
    }

    /// 환경변수에서 설정 로드
    ///
    /// `LOGIN_ADDR`, `GAME_ADDR`, `MESSAGE_ADDR`와 `*_ENABLED`를 읽고,
    /// 나머지는 [`ServerConfig::from_env`]에 맡깁니다.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::with_defaults(ServerConfig::from_env()?)?;

        override_endpoint(&mut config.login, "LOGIN_ADDR", "LOGIN_ENABLED")?;
        override_endpoint(&mut config.game, "GAME_ADDR", "GAME_ENABLED")?;
        override_endpoint(&mut config.message, "MESSAGE_ADDR", "MESSAGE_ENABLED")?;

        config.validate()?;
        Ok(config)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.enabled_server_count() == 0 {
            return Err(anyhow!("최소 하나의 서버는 활성화되어야 합니다"));
        }
        self.server.validate()?;

        // 포트 충돌 검사 (임의 포트는 제외)
        let mut ports: Vec<u16> = self
            .endpoints()
            .filter(|(_, e)| e.enabled && !e.is_ephemeral())
            .map(|(_, e)| e.address.port())
            .collect();
        ports.sort_unstable();
        for window in ports.windows(2) {
            if window[0] == window[1] {
                return Err(anyhow!("포트 충돌: {}", window[0]));
            }
        }

        Ok(())
    }

    /// (이름, 엔드포인트) 목록
    pub fn endpoints(&self) -> impl Iterator<Item = (&'static str, &ServerEndpoint)> {
        [
            ("Login", &self.login),
            ("Game", &self.game),
            ("Message", &self.message),
        ]
        .into_iter()
    }

    /// 활성화된 서버 수
    pub fn enabled_server_count(&self) -> usize {
        self.endpoints().filter(|(_, e)| e.enabled).count()
    }
}

fn override_endpoint(endpoint: &mut ServerEndpoint, addr_key: &str, enabled_key: &str) -> Result<()> {
    if let Some(address) = std::env::var(addr_key).ok().filter(|v| !v.trim().is_empty()) {
        endpoint.address = address
            .trim()
            .parse()
            .with_context(|| format!("{} 값이 올바르지 않습니다: {}", addr_key, address))?;
    }
    if let Ok(val) = std::env::var(enabled_key) {
        endpoint.enabled = val.trim().parse().unwrap_or(true);
    }
    Ok(())
}

/// 설정 빌더 (테스트와 개별 실행용)
pub struct GameCenterConfigBuilder {
    config: GameCenterConfig,
}

impl GameCenterConfigBuilder {
    pub fn new(server: ServerConfig) -> Result<Self> {
        Ok(Self {
            config: GameCenterConfig::with_defaults(server)?,
        })
    }

    /// 세 서버 모두 `127.0.0.1:0`에 바인드
    pub fn ephemeral(mut self) -> Self {
        for endpoint in [
            &mut self.config.login,
            &mut self.config.game,
            &mut self.config.message,
        ] {
            endpoint.address = SocketAddr::from(([127, 0, 0, 1], 0));
        }
        self
    }

    pub fn with_login(mut self, address: SocketAddr, enabled: bool) -> Self {
        self.config.login = ServerEndpoint { address, enabled };
        self
    }

    pub fn with_game(mut self, address: SocketAddr, enabled: bool) -> Self {
        self.config.game = ServerEndpoint { address, enabled };
        self
    }

    pub fn with_message(mut self, address: SocketAddr, enabled: bool) -> Self {
        self.config.message = ServerEndpoint { address, enabled };
        self
    }

    pub fn build(self) -> Result<GameCenterConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
