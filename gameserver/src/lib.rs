//! 게임 서버
//!
//! 세션 키로 플레이어를 다시 인증하고, 멀티플레이 로비와 방을 운영하는 서비스입니다.
//!
//! # 모듈 구조
//! - **actor**: 메일박스 액터 런타임 (약속 기반 요청/응답)
//! - **service**: 로비 액터, 방 액터, 방 번호 저장소, 브로드캐스트
//! - **handler**: 연결 인증과 메시지 분류
//!
//! ```text
//! 연결 태스크 ──요청──▶ 로비 액터 ──생성──▶ 방 액터 (방마다 하나)
//!      └────────────────요청───────────────────┘
//! ```

pub mod actor;
pub mod handler;
pub mod service;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use shared::config::GameConfig;
use shared::net::{ConnSender, TcpService};
use shared::protocol::{CryptTables, GameServerMessage};
use shared::service::{AccountStore, SessionStore, TopologyClient};

pub use handler::{handle_connection, GameConn};
pub use service::{LobbyActor, LobbyHandle};

/// 게임 클라이언트로 보내는 쓰기 끝점
pub type GameSender = ConnSender<GameServerMessage>;

/// 외부 협력 객체
pub struct GameServices {
    pub sessions: Arc<dyn SessionStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub topology: Arc<dyn TopologyClient>,
    pub game_config: Arc<GameConfig>,
    pub tables: Arc<CryptTables>,
}

/// 게임 연결이 공유하는 상태
pub struct GameContext {
    pub services: GameServices,
    pub lobby: LobbyHandle,
    /// 인증을 마친 연결 수
    pub online: AtomicUsize,
}

/// 게임 서버
pub struct GameServer {
    ctx: Arc<GameContext>,
    tcp: TcpService,
    token: CancellationToken,
    lobby_task: Mutex<Option<JoinHandle<()>>>,
}

impl GameServer {
    /// 로비 액터를 시작하고 서버 생성
    pub fn new(services: GameServices, parent: &CancellationToken) -> Self {
        let token = parent.child_token();
        let (lobby, lobby_task) = LobbyActor::spawn(token.clone());
        Self {
            ctx: Arc::new(GameContext {
                services,
                lobby,
                online: AtomicUsize::new(0),
            }),
            tcp: TcpService::with_parent("GameServer", parent),
            token,
            lobby_task: Mutex::new(Some(lobby_task)),
        }
    }

    pub async fn listen(&self, addr: &str) -> Result<()> {
        let listener = TcpService::bind(addr).await?;
        self.serve(listener).await
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let ctx = self.ctx.clone();
        self.tcp
            .serve(listener, move |stream, addr, token| {
                handle_connection(ctx.clone(), stream, addr, token)
            })
            .await
    }

    /// 종료
    ///
    /// 연결이 먼저 방과 로비에서 빠져나갈 수 있도록 연결을 정리한 뒤 로비를 멈춥니다.
    pub async fn shutdown(&self, grace: Duration) -> Result<()> {
        self.tcp.shutdown(grace).await?;
        self.token.cancel();

        let task = self.lobby_task.lock().take();
        if let Some(task) = task {
            match tokio::time::timeout(grace, task).await {
                Ok(Ok(())) => info!("로비 종료 완료"),
                Ok(Err(e)) => warn!("로비 태스크 비정상 종료: {}", e),
                Err(_) => warn!("로비 종료 대기 시간 초과"),
            }
        }
        Ok(())
    }

    pub fn lobby(&self) -> &LobbyHandle {
        &self.ctx.lobby
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.tcp.local_addr()
    }

    pub fn connection_count(&self) -> usize {
        self.tcp.connection_count()
    }

    /// 인증을 마친 플레이어 수
    pub fn online_count(&self) -> usize {
        self.ctx.online.load(Ordering::Relaxed)
    }
}
