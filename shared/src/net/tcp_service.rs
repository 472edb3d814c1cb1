//! TCP 접속 수락 서비스
//!
//! 서비스마다 하나의 수락 루프를 돌리고, 접속한 소켓마다 태스크를 하나씩 띄웁니다.
//! 연결 태스크의 실패나 패닉은 로그로만 남기고 리스너는 계속 동작합니다.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::tool::error::AppError;

/// TCP 접속 수락 서비스
pub struct TcpService {
    name: &'static str,
    accept_token: CancellationToken,
    conn_token: CancellationToken,
    tracker: TaskTracker,
    local_addr: Mutex<Option<SocketAddr>>,
    is_running: AtomicBool,
}

impl TcpService {
    /// 새로운 수락 서비스 생성
    ///
    /// # Arguments
    /// * `name` - 로그에 표시할 서비스 이름
    pub fn new(name: &'static str) -> Self {
        Self::with_parent(name, &CancellationToken::new())
    }

    /// 상위 취소 토큰을 따르는 수락 서비스 생성
    pub fn with_parent(name: &'static str, parent: &CancellationToken) -> Self {
        let conn_token = parent.child_token();
        Self {
            name,
            accept_token: conn_token.child_token(),
            conn_token,
            tracker: TaskTracker::new(),
            local_addr: Mutex::new(None),
            is_running: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 주소에 바인드
    pub async fn bind(addr: &str) -> Result<TcpListener> {
        TcpListener::bind(addr)
            .await
            .with_context(|| format!("TCP 리스너 바인드 실패: {}", addr))
    }

    /// 주소에 바인드하고 수락 루프 실행
    pub async fn listen<H, Fut>(&self, addr: &str, handler: H) -> Result<()>
    where
        H: Fn(TcpStream, SocketAddr, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let listener = Self::bind(addr).await?;
        self.serve(listener, handler).await
    }

    /// 이미 바인드된 리스너로 수락 루프 실행
    ///
    /// `close()` 또는 상위 토큰이 취소될 때까지 반환하지 않습니다.
    pub async fn serve<H, Fut>(&self, listener: TcpListener, handler: H) -> Result<()>
    where
        H: Fn(TcpStream, SocketAddr, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!("[{}] 수락 루프가 이미 실행 중입니다", self.name);
            return Ok(());
        }

        let local = listener.local_addr().context("리스너 주소 조회 실패")?;
        *self.local_addr.lock() = Some(local);
        info!("✅ [{}] {}에서 접속 대기 중", self.name, local);

        let handler = Arc::new(handler);

        loop {
            tokio::select! {
                _ = self.accept_token.cancelled() => {
                    info!("[{}] 수락 루프 종료", self.name);
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("[{}] 새 연결: {}", self.name, addr);
                        self.spawn_connection(handler.clone(), stream, addr);
                    }
                    Err(e) => {
                        error!("[{}] 연결 수락 실패: {}", self.name, e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }

        self.is_running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_connection<H, Fut>(&self, handler: Arc<H>, stream: TcpStream, addr: SocketAddr)
    where
        H: Fn(TcpStream, SocketAddr, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = self.name;
        let token = self.conn_token.child_token();

        self.tracker.spawn(async move {
            // 핸들러를 별도 태스크로 돌려서 패닉을 JoinError로 받음
            let task = tokio::spawn(async move { handler(stream, addr, token).await });

            match task.await {
                Ok(Ok(())) => debug!("[{}] 연결 종료: {}", name, addr),
                Ok(Err(e)) => match e.downcast_ref::<AppError>() {
                    Some(app_error) => app_error.log(&format!("[{}] {}", name, addr)),
                    None => warn!("[{}] 연결 처리 오류 ({}): {:#}", name, addr, e),
                },
                Err(join_error) if join_error.is_panic() => {
                    error!("[{}] 연결 처리 중 패닉 발생: {}", name, addr);
                }
                Err(_) => debug!("[{}] 연결 태스크 취소: {}", name, addr),
            }
        });
    }

    /// 수락 중단 (기존 연결은 유지)
    pub fn close(&self) {
        self.accept_token.cancel();
    }

    /// 서비스 종료
    ///
    /// 수락을 멈추고 모든 연결 태스크에 취소를 알린 뒤, 최대 `grace` 동안 종료를 기다립니다.
    pub async fn shutdown(&self, grace: Duration) -> Result<()> {
        info!("🛑 [{}] 종료 중... (활성 연결 {}개)", self.name, self.tracker.len());
        self.close();
        self.conn_token.cancel();
        self.tracker.close();

        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!(
                "[{}] {:?} 안에 끝나지 않은 연결 {}개를 두고 종료합니다",
                self.name,
                grace,
                self.tracker.len()
            );
        } else {
            info!("✅ [{}] 종료 완료", self.name);
        }
        Ok(())
    }

    /// 바인드된 로컬 주소
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// 처리 중인 연결 수
    pub fn connection_count(&self) -> usize {
        self.tracker.len()
    }

    /// 수락 루프 실행 여부
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_panic_does_not_stop_listener() {
        let service = Arc::new(TcpService::new("test"));
        let listener = TcpService::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let serve = {
            let service = service.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                service
                    .serve(listener, move |mut stream, _addr, _token| {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            if n == 0 {
                                panic!("첫 연결에서 의도적인 패닉");
                            }
                            stream.write_all(b"ok").await?;
                            Ok(())
                        }
                    })
                    .await
            })
        };

        // 첫 연결: 핸들러가 패닉하고 소켓이 닫힘
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(first.read(&mut buf).await.unwrap(), 0);

        // 두 번째 연결은 정상 처리
        let mut second = TcpStream::connect(addr).await.unwrap();
        second.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ok");

        service.shutdown(Duration::from_secs(1)).await.unwrap();
        serve.await.unwrap().unwrap();
        assert!(!service.is_running());
        println!("✅ 패닉 격리 테스트 통과");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_connections() {
        let service = Arc::new(TcpService::new("test"));
        let listener = TcpService::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let serve = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .serve(listener, |_stream, _addr, token| async move {
                        token.cancelled().await;
                        Ok(())
                    })
                    .await
            })
        };

        let _client = TcpStream::connect(addr).await.unwrap();
        for _ in 0..50 {
            if service.connection_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(service.connection_count(), 1);
        assert_eq!(service.local_addr(), Some(addr));

        service.shutdown(Duration::from_secs(2)).await.unwrap();
        assert_eq!(service.connection_count(), 0);
        serve.await.unwrap().unwrap();
    }
}
