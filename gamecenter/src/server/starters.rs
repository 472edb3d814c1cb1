//! 서버 구성 함수 모듈
//!
//! 세 서비스가 공유하는 협력 객체를 만들고, 각 서버 인스턴스를 조립합니다.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gameserver::{GameServer, GameServices};
use loginserver::{LoginContext, LoginServer};
use messageserver::{MessageContext, MessageServer};
use shared::config::{GameConfig, ServerConfig};
use shared::model::{ServerInfo, ServerType};
use shared::protocol::CryptTables;
use shared::service::{
    open_account_store, AccountStore, HttpTopologyClient, MemorySessionStore, MemoryTopology,
    SessionStore, TopologyClient,
};

/// 로그인 서버 ID (연결 메시지와 토폴로지 항목)
pub const LOGIN_SERVER_ID: u16 = 10103;
/// 메시지 서버 ID
pub const MESSAGE_SERVER_ID: u32 = 30303;
/// 광고용 최대 접속자 수
const ADVERTISED_MAX_USERS: u32 = 2000;

/// 세 서비스가 공유하는 협력 객체
pub struct Collaborators {
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub topology: Arc<dyn TopologyClient>,
    /// 매니페스트나 URL이 없을 때 실제 바인드 주소로 채우는 토폴로지
    pub local_topology: Option<Arc<MemoryTopology>>,
    pub game_config: Arc<GameConfig>,
    pub tables: Arc<CryptTables>,
}

impl Collaborators {
    /// 설정에서 협력 객체 생성
    ///
    /// 토폴로지는 `TOPOLOGY_URL` → `TOPOLOGY_FILE` → 로컬 순서로 선택합니다.
    pub fn from_config(config: &ServerConfig, bcrypt_cost: u32) -> Result<Self> {
        let accounts = open_account_store(&config.database_url, bcrypt_cost)
            .context("계정 저장소 생성 실패")?;
        let sessions: Arc<dyn SessionStore> =
            Arc::new(MemorySessionStore::new(config.session_ttl()));

        let mut local_topology = None;
        let topology: Arc<dyn TopologyClient> = if let Some(url) = &config.topology_url {
            info!("원격 토폴로지 사용: {}", url);
            Arc::new(HttpTopologyClient::new(url)?)
        } else if let Some(path) = &config.topology_file {
            Arc::new(MemoryTopology::load(path)?)
        } else {
            let local = Arc::new(MemoryTopology::default());
            local_topology = Some(local.clone());
            local
        };

        let game_config = GameConfig::load_or_default(config.game_config_file.as_deref())?;
        let tables = CryptTables::load_or_builtin(config.crypt_table_path.as_deref())?;

        Ok(Self {
            accounts,
            sessions,
            topology,
            local_topology,
            game_config: Arc::new(game_config),
            tables,
        })
    }

    /// 로컬 토폴로지에 실제 바인드된 서버 등록
    pub fn advertise(&self, config: &ServerConfig, server_type: ServerType, bound: SocketAddr) {
        let Some(local) = &self.local_topology else {
            return;
        };
        let (id, name) = match server_type {
            ServerType::Login => (u32::from(LOGIN_SERVER_ID), "Login"),
            ServerType::Game => (config.server_id, "Game"),
            ServerType::Message => (MESSAGE_SERVER_ID, "Message"),
        };
        local.upsert_server(&ServerInfo {
            server_type,
            id,
            name: name.to_string(),
            address: config.server_ip.clone(),
            port: bound.port(),
            num_users: 0,
            max_users: ADVERTISED_MAX_USERS,
            flags: 0,
        });
        info!("토폴로지 등록: {} {} ({}:{})", server_type, id, config.server_ip, bound.port());
    }

    /// 로컬 토폴로지의 게임 서버 접속자 수 갱신
    pub fn report_game_users(&self, config: &ServerConfig, online: usize) {
        if let Some(local) = &self.local_topology {
            let online = u32::try_from(online).unwrap_or(u32::MAX);
            if let Err(e) = local.set_num_users(ServerType::Game, config.server_id, online) {
                warn!("접속자 수 갱신 실패: {}", e);
            }
        }
    }
}

/// 로그인 서버 생성
pub fn build_login_server(collab: &Collaborators, token: &CancellationToken) -> LoginServer {
    let ctx = LoginContext {
        accounts: collab.accounts.clone(),
        sessions: collab.sessions.clone(),
        topology: collab.topology.clone(),
        game_config: collab.game_config.clone(),
        tables: collab.tables.clone(),
        server_id: LOGIN_SERVER_ID,
    };
    LoginServer::new(ctx, token)
}

/// 게임 서버 생성 (로비 액터도 함께 시작)
pub fn build_game_server(collab: &Collaborators, token: &CancellationToken) -> GameServer {
    let services = GameServices {
        sessions: collab.sessions.clone(),
        accounts: collab.accounts.clone(),
        topology: collab.topology.clone(),
        game_config: collab.game_config.clone(),
        tables: collab.tables.clone(),
    };
    GameServer::new(services, token)
}

/// 메시지 서버 생성
pub fn build_message_server(collab: &Collaborators, token: &CancellationToken) -> MessageServer {
    let ctx = MessageContext {
        sessions: collab.sessions.clone(),
        tables: collab.tables.clone(),
    };
    MessageServer::new(ctx, token)
}
