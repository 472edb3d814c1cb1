//! 세션 저장소
//!
//! 로그인 서버가 세션을 만들고, 게임/메시지 서버가 세션 키로 플레이어를 다시 인증합니다.
//! 세션 키는 UUID 문자열이며 TTL이 지나면 만료됩니다.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::tool::error::StoreError;

/// 기본 세션 TTL (15분)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(15 * 60);

/// 기본 만료 세션 정리 주기
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// 세션
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// 게임 서버에서 conn_id로도 쓰임
    pub session_id: u32,
    pub player_id: u32,
    pub key: String,
    pub remote_addr: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// 세션 저장소 인터페이스
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 새 세션 생성 (새 UUID 키, TTL 적용)
    async fn add_session(&self, player_id: u32, remote_addr: &str) -> Result<Session, StoreError>;

    /// 세션 키로 조회
    ///
    /// 없으면 `NotFound`, 만료되었으면 `Expired`
    async fn get_session_by_key(&self, key: &str) -> Result<Session, StoreError>;

    /// TTL 갱신
    async fn update_session_expiry(&self, session_id: u32) -> Result<Session, StoreError>;

    /// `now` 기준으로 만료된 세션 삭제
    ///
    /// # Returns
    /// 삭제한 세션 수
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// 세션 명시적 삭제
    async fn delete_session(&self, session_id: u32) -> Result<(), StoreError>;
}

/// 메모리 세션 저장소
pub struct MemorySessionStore {
    sessions: DashMap<u32, Session>,
    by_key: DashMap<String, u32>,
    next_id: AtomicU32,
    ttl: chrono::Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(15));
        Self {
            sessions: DashMap::new(),
            by_key: DashMap::new(),
            next_id: AtomicU32::new(1),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn add_session(&self, player_id: u32, remote_addr: &str) -> Result<Session, StoreError> {
        let session = Session {
            session_id: self.next_id.fetch_add(1, Ordering::Relaxed),
            player_id,
            key: Uuid::new_v4().to_string(),
            remote_addr: remote_addr.to_string(),
            expires_at: Utc::now() + self.ttl,
        };

        self.by_key.insert(session.key.clone(), session.session_id);
        self.sessions.insert(session.session_id, session.clone());
        debug!(
            session_id = session.session_id,
            player_id, "세션 생성: {}", remote_addr
        );
        Ok(session)
    }

    async fn get_session_by_key(&self, key: &str) -> Result<Session, StoreError> {
        let session_id = self
            .by_key
            .get(key)
            .map(|id| *id)
            .ok_or_else(|| StoreError::NotFound(format!("세션 키 {}", key)))?;

        let session = self
            .sessions
            .get(&session_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("세션 {}", session_id)))?;

        if session.is_expired_at(Utc::now()) {
            return Err(StoreError::Expired(format!("세션 {}", session_id)));
        }
        Ok(session)
    }

    async fn update_session_expiry(&self, session_id: u32) -> Result<Session, StoreError> {
        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| StoreError::NotFound(format!("세션 {}", session_id)))?;
        session.expires_at = Utc::now() + self.ttl;
        Ok(session.value().clone())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut expired_keys = Vec::new();
        self.sessions.retain(|_, session| {
            if session.is_expired_at(now) {
                expired_keys.push(session.key.clone());
                false
            } else {
                true
            }
        });

        for key in &expired_keys {
            self.by_key.remove(key);
        }
        Ok(expired_keys.len())
    }

    async fn delete_session(&self, session_id: u32) -> Result<(), StoreError> {
        match self.sessions.remove(&session_id) {
            Some((_, session)) => {
                self.by_key.remove(&session.key);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("세션 {}", session_id))),
        }
    }
}

/// 만료 세션 정리 작업
///
/// 주기적으로 `delete_expired_sessions`를 호출하며, `stop()`이나 상위 토큰 취소 시 종료합니다.
pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    interval: Duration,
    token: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>, interval: Duration, parent: &CancellationToken) -> Self {
        Self {
            store,
            interval,
            token: parent.child_token(),
            handle: Mutex::new(None),
        }
    }

    /// 정리 작업 시작
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            warn!("세션 정리 작업이 이미 실행 중입니다");
            return;
        }

        info!("🔄 세션 정리 작업 시작 ({:?} 간격)", self.interval);
        let store = self.store.clone();
        let token = self.token.clone();
        let period = self.interval;

        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // 첫 tick은 즉시 완료됨
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match store.delete_expired_sessions(Utc::now()).await {
                            Ok(0) => {}
                            Ok(count) => info!("만료 세션 정리: {}개", count),
                            Err(e) => warn!("만료 세션 정리 실패: {}", e),
                        }
                    }
                }
            }
            info!("세션 정리 작업 종료");
        }));
    }

    /// 정리 작업 중지
    pub async fn stop(&self) {
        self.token.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}
