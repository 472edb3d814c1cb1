//! 메시지 서버
//!
//! 친구 목록과 귓속말을 담당하는 메신저 서비스의 접속 지점입니다.
//! 현재는 세션 인증과 하트비트만 처리하고 나머지 프레임은 로그로 남깁니다.

pub mod handler;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use shared::net::TcpService;
use shared::protocol::CryptTables;
use shared::service::SessionStore;

pub use handler::{handle_connection, MessageConn, AUTH_FAILED, AUTH_OK};

/// 메신저 연결이 공유하는 협력 객체
pub struct MessageContext {
    pub sessions: Arc<dyn SessionStore>,
    pub tables: Arc<CryptTables>,
}

/// 메시지 서버
pub struct MessageServer {
    ctx: Arc<MessageContext>,
    tcp: TcpService,
}

impl MessageServer {
    pub fn new(ctx: MessageContext, parent: &CancellationToken) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tcp: TcpService::with_parent("MessageServer", parent),
        }
    }

    /// 주소에 바인드하고 실행
    pub async fn listen(&self, addr: &str) -> Result<()> {
        let listener = TcpService::bind(addr).await?;
        self.serve(listener).await
    }

    /// 바인드된 리스너로 실행
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let ctx = self.ctx.clone();
        self.tcp
            .serve(listener, move |stream, addr, token| {
                handle_connection(ctx.clone(), stream, addr, token)
            })
            .await
    }

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
