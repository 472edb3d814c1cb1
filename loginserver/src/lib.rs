//! 로그인 서버
//!
//! 계정을 인증하고 닉네임과 첫 캐릭터를 준비시킨 뒤 세션 키와 서버 목록을
//! 넘겨주는 서비스입니다. 로그인은 항상 끝나는 연결이며, 클라이언트는 받은
//! 세션 키로 게임 서버와 메시지 서버에 다시 접속합니다.
//!
//! # 모듈 구조
//! - **handler**: 연결 하나의 선형 로그인 흐름

pub mod handler;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use shared::config::GameConfig;
use shared::net::TcpService;
use shared::protocol::CryptTables;
use shared::service::{AccountStore, SessionStore, TopologyClient};

pub use handler::{handle_connection, is_valid_nickname, LoginConn};

/// 로그인 연결이 공유하는 협력 객체
pub struct LoginContext {
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub topology: Arc<dyn TopologyClient>,
    pub game_config: Arc<GameConfig>,
    pub tables: Arc<CryptTables>,
    /// 연결 메시지에 실리는 서버 ID
    pub server_id: u16,
}

/// 로그인 서버
pub struct LoginServer {
    ctx: Arc<LoginContext>,
    tcp: TcpService,
}

impl LoginServer {
    pub fn new(ctx: LoginContext, parent: &CancellationToken) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tcp: TcpService::with_parent("LoginServer", parent),
        }
    }

    /// 주소에 바인드하고 실행
    pub async fn listen(&self, addr: &str) -> Result<()> {
        let listener = TcpService::bind(addr).await?;
        self.serve(listener).await
    }

    /// 바인드된 리스너로 실행 (종료될 때까지 반환하지 않음)
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let ctx = self.ctx.clone();
        self.tcp
            .serve(listener, move |stream, addr, token| {
                handle_connection(ctx.clone(), stream, addr, token)
            })
            .await
    }

    /// 종료 (최대 `grace`까지 연결 종료 대기)
    pub async fn shutdown(&self, grace: Duration) -> Result<()> {
        self.tcp.shutdown(grace).await
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.tcp.local_addr()
    }

    pub fn connection_count(&self) -> usize {
        self.tcp.connection_count()
    }
}
