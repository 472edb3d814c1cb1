//! 서버 토폴로지 조회
//!
//! 로그인 서버는 클라이언트에게 서버 목록을 광고할 때, 게임 서버는 피어 목록을
//! 돌려줄 때 사용합니다. 메모리 구현은 JSON 매니페스트로 시작하고,
//! `TOPOLOGY_URL`이 있으면 HTTP 구현을 사용합니다.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{ServerInfo, ServerType};
use crate::tool::error::StoreError;

/// 토폴로지 매니페스트 (`{ "servers": [...] }`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyManifest {
    #[serde(default)]
    pub servers: Vec<ServerInfo>,
}

/// 서버 목록 조회 인터페이스
#[async_trait]
pub trait TopologyClient: Send + Sync {
    /// 종류별 서버 목록 (등록 순서 유지)
    async fn list_servers(&self, server_type: ServerType) -> Result<Vec<ServerInfo>, StoreError>;
}

/// 메모리 토폴로지
///
/// 읽기와 쓰기 모두 복사본을 주고받으므로 호출자가 내부 상태를 바꿀 수 없습니다.
#[derive(Debug, Default)]
pub struct MemoryTopology {
    servers: RwLock<Vec<ServerInfo>>,
}

impl MemoryTopology {
    pub fn new(servers: Vec<ServerInfo>) -> Self {
        Self {
            servers: RwLock::new(servers),
        }
    }

    /// JSON 매니페스트에서 생성
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: TopologyManifest =
            serde_json::from_str(json).context("토폴로지 매니페스트 파싱 실패")?;
        Ok(Self::new(manifest.servers))
    }

    /// 매니페스트 파일에서 생성
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("토폴로지 파일을 읽을 수 없습니다: {}", path.display()))?;
        let topology = Self::from_json(&json)?;
        info!("토폴로지 로드: {} (서버 {}개)", path.display(), topology.len());
        Ok(topology)
    }

    /// 서버 등록 또는 갱신 (같은 종류와 ID가 있으면 교체)
    pub fn upsert_server(&self, server: &ServerInfo) {
        let mut servers = self.servers.write();
        match servers
            .iter_mut()
            .find(|s| s.server_type == server.server_type && s.id == server.id)
        {
            Some(existing) => *existing = server.clone(),
            None => servers.push(server.clone()),
        }
    }

    /// 접속자 수 갱신
    pub fn set_num_users(
        &self,
        server_type: ServerType,
        id: u32,
        num_users: u32,
    ) -> Result<(), StoreError> {
        let mut servers = self.servers.write();
        let server = servers
            .iter_mut()
            .find(|s| s.server_type == server_type && s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("{} 서버 {}", server_type, id)))?;
        server.num_users = num_users;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.servers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.read().is_empty()
    }
}

#[async_trait]
impl TopologyClient for MemoryTopology {
    async fn list_servers(&self, server_type: ServerType) -> Result<Vec<ServerInfo>, StoreError> {
        Ok(self
            .servers
            .read()
            .iter()
            .filter(|s| s.server_type == server_type)
            .cloned()
            .collect())
    }
}

/// HTTP 토폴로지 클라이언트 (`GET {url}/servers?type=<type>`)
pub struct HttpTopologyClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTopologyClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()
            .context("HTTP 클라이언트 생성 실패")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TopologyClient for HttpTopologyClient {
    async fn list_servers(&self, server_type: ServerType) -> Result<Vec<ServerInfo>, StoreError> {
        let url = format!("{}/servers", self.base_url);
        debug!("토폴로지 조회: {}?type={}", url, server_type);

        let response = self
            .client
            .get(&url)
            .query(&[("type", server_type.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| StoreError::Backend(format!("토폴로지 요청 실패: {}", e)))?;

        let manifest: TopologyManifest = response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("토폴로지 응답 파싱 실패: {}", e)))?;

        Ok(manifest
            .servers
            .into_iter()
            .filter(|s| s.server_type == server_type)
            .collect())
    }
}
