//! 서버 관리자 모듈
//!
//! 세 서비스의 라이프사이클을 관리합니다. 시작할 때는 모든 리스너를 먼저 바인드하고
//! 실제 주소를 토폴로지에 등록한 뒤 수락 루프를 띄웁니다.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gameserver::GameServer;
use loginserver::LoginServer;
use messageserver::MessageServer;
use shared::model::ServerType;
use shared::net::TcpService;
use shared::service::SessionSweeper;

use super::config::{GameCenterConfig, ServerEndpoint};
use super::starters::{
    build_game_server, build_login_server, build_message_server, Collaborators,
};

/// 만료 세션 정리 주기
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// 상태 로그 주기
const MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// 실제로 바인드된 주소
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundAddrs {
    pub login: Option<SocketAddr>,
    pub game: Option<SocketAddr>,
    pub message: Option<SocketAddr>,
}

/// 실행 중인 서버 묶음
struct Running {
    token: CancellationToken,
    addrs: BoundAddrs,
    login: Option<Arc<LoginServer>>,
    game: Option<Arc<GameServer>>,
    message: Option<Arc<MessageServer>>,
    sweeper: SessionSweeper,
    handles: Vec<JoinHandle<Result<()>>>,
}

/// 서버 관리자
pub struct ServerManager {
    config: GameCenterConfig,
    collab: Arc<Collaborators>,
    token: CancellationToken,
    is_running: AtomicBool,
    running: Mutex<Option<Running>>,
}

impl ServerManager {
    /// 새 서버 관리자 생성
    pub fn new(config: GameCenterConfig, collab: Collaborators) -> Self {
        Self {
            config,
            collab: Arc::new(collab),
            token: CancellationToken::new(),
            is_running: AtomicBool::new(false),
            running: Mutex::new(None),
        }
    }

    /// 설정에서 협력 객체까지 만들어 생성
    pub fn from_config(config: GameCenterConfig, bcrypt_cost: u32) -> Result<Self> {
        let collab = Collaborators::from_config(&config.server, bcrypt_cost)?;
        Ok(Self::new(config, collab))
    }

    /// 모든 서버 시작
    pub async fn start_all(&self) -> Result<BoundAddrs> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!("서버가 이미 실행 중입니다");
            return Ok(self.bound_addrs());
        }

        info!("🚀 게임 서버 시작 중...");
        match self.start_inner().await {
            Ok(running) => {
                let addrs = running.addrs;
                *self.running.lock() = Some(running);
                info!("✅ 모든 서버 시작 완료");
                Ok(addrs)
            }
            Err(e) => {
                self.is_running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn start_inner(&self) -> Result<Running> {
        let token = self.token.child_token();
        let server_config = &self.config.server;

        // 게임/메시지 서버를 먼저 바인드해야 로그인 서버가 올바른 목록을 광고함
        let game_listener = bind_enabled("Game", &self.config.game).await?;
        let message_listener = bind_enabled("Message", &self.config.message).await?;
        let login_listener = bind_enabled("Login", &self.config.login).await?;

        let mut addrs = BoundAddrs::default();
        for (server_type, listener, slot) in [
            (ServerType::Game, &game_listener, &mut addrs.game),
            (ServerType::Message, &message_listener, &mut addrs.message),
            (ServerType::Login, &login_listener, &mut addrs.login),
        ] {
            if let Some(listener) = listener {
                let bound = listener.local_addr().context("리스너 주소 조회 실패")?;
                self.collab.advertise(server_config, server_type, bound);
                *slot = Some(bound);
            }
        }

        let mut handles = Vec::new();

        let game = game_listener.map(|listener| {
            let server = Arc::new(build_game_server(&self.collab, &token));
            let serve = server.clone();
            handles.push(tokio::spawn(async move {
                serve.serve(listener).await.context("게임 서버 실행 실패")
            }));
            server
        });

        let message = message_listener.map(|listener| {
            let server = Arc::new(build_message_server(&self.collab, &token));
            let serve = server.clone();
            handles.push(tokio::spawn(async move {
                serve.serve(listener).await.context("메시지 서버 실행 실패")
            }));
            server
        });

        let login = login_listener.map(|listener| {
            let server = Arc::new(build_login_server(&self.collab, &token));
            let serve = server.clone();
            handles.push(tokio::spawn(async move {
                serve.serve(listener).await.context("로그인 서버 실행 실패")
            }));
            server
        });

        let sweeper = SessionSweeper::new(
            self.collab.sessions.clone(),
            SESSION_SWEEP_INTERVAL,
            &token,
        );
        sweeper.start();

        handles.push(self.spawn_monitor(game.clone(), token.clone()));

        Ok(Running {
            token,
            addrs,
            login,
            game,
            message,
            sweeper,
            handles,
        })
    }

    /// 주기적으로 접속 현황을 로그에 남기고 토폴로지의 접속자 수를 갱신
    fn spawn_monitor(
        &self,
        game: Option<Arc<GameServer>>,
        token: CancellationToken,
    ) -> JoinHandle<Result<()>> {
        let collab = self.collab.clone();
        let server_config = self.config.server.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(MONITOR_INTERVAL);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(game) = &game {
                            let online = game.online_count();
                            collab.report_game_users(&server_config, online);
                            info!(
                                "📊 게임 서버: 접속 {}명, 연결 {}개, 방 {}개",
                                online,
                                game.connection_count(),
                                game.lobby().active_room_count()
                            );
                        }
                    }
                }
            }
            Ok(())
        })
    }

    /// 모든 서버 중지
    ///
    /// 서버마다 최대 `SHUTDOWN_GRACE_SECS`까지 연결 종료를 기다립니다.
    pub async fn stop_all(&self) -> Result<()> {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            warn!("서버가 이미 중지되어 있습니다");
            return Ok(());
        }

        let running = self.running.lock().take();
        let Some(running) = running else {
            return Ok(());
        };

        info!("🛑 모든 서버 중지 중...");
        let grace = self.config.server.shutdown_grace();

        if let Some(login) = &running.login {
            login.shutdown(grace).await?;
        }
        if let Some(game) = &running.game {
            game.shutdown(grace).await?;
        }
        if let Some(message) = &running.message {
            message.shutdown(grace).await?;
        }
        running.sweeper.stop().await;
        running.token.cancel();

        for handle in running.handles {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!("서버 태스크 오류: {:#}", e),
                Ok(Err(e)) => warn!("서버 태스크 비정상 종료: {}", e),
                Err(_) => warn!("서버 태스크 종료 대기 시간 초과"),
            }
        }

        info!("✅ 모든 서버 중지 완료");
        Ok(())
    }

    /// 서버 실행 상태 확인
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &GameCenterConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Arc<Collaborators> {
        &self.collab
    }

    /// 실행 중인 서버의 바인드 주소
    pub fn bound_addrs(&self) -> BoundAddrs {
        self.running
            .lock()
            .as_ref()
            .map(|r| r.addrs)
            .unwrap_or_default()
    }

    pub fn game_server(&self) -> Option<Arc<GameServer>> {
        self.running.lock().as_ref().and_then(|r| r.game.clone())
    }

    /// 외부에서 종료를 요청할 때 취소하는 토큰
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 서버 상태 출력
    pub fn print_status(&self) {
        let status = if self.is_running() { "실행 중" } else { "중지됨" };
        info!("📊 서버 상태: {}", status);
        info!("📊 활성화된 서버: {}", self.config.enabled_server_count());

        let addrs = self.bound_addrs();
        for (name, endpoint) in self.config.endpoints() {
            let bound = match name {
                "Login" => addrs.login,
                "Game" => addrs.game,
                _ => addrs.message,
            };
            match (endpoint.enabled, bound) {
                (false, _) => info!("  {}: 비활성", name),
                (true, Some(bound)) => info!("  {}: {} (실행 중)", name, bound),
                (true, None) => info!("  {}: {} (대기)", name, endpoint.address),
            }
        }
    }

    /// 종료 시그널 대기
    ///
    /// Ctrl+C 또는 [`shutdown_token`](Self::shutdown_token) 취소 시 모든 서버를 중지합니다.
    pub async fn wait_for_shutdown(&self) -> Result<()> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Ctrl+C 시그널 대기 실패")?;
                info!("종료 시그널 수신");
            }
            _ = self.token.cancelled() => info!("종료 요청 수신"),
        }
        self.stop_all().await
    }
}

async fn bind_enabled(name: &str, endpoint: &ServerEndpoint) -> Result<Option<TcpListener>> {
    if !endpoint.enabled {
        info!("{} 서버 비활성화", name);
        return Ok(None);
    }
    let listener = TcpService::bind(&endpoint.address.to_string())
        .await
        .with_context(|| format!("{} 서버 바인드 실패", name))?;
    Ok(Some(listener))
}
