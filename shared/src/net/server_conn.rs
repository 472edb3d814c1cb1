//! 서버 측 연결 래퍼
//!
//! 소켓을 읽기/쓰기 절반으로 나눠서, 읽기는 연결 태스크가 직접 하고
//! 쓰기는 복제 가능한 [`ConnSender`]로 여러 액터가 공유합니다.
//! 한 소켓에 대한 쓰기는 뮤텍스로 직렬화됩니다.
//!
//! 읽지 않는 상대 때문에 쓰기가 막히면 [`DEFAULT_WRITE_TIMEOUT`] 뒤에 실패하고,
//! 그 연결은 멈춘 것으로 표시되어 이후 전송은 즉시 `Closed`로 실패합니다.

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace, warn};

use crate::protocol::cipher::CryptTables;
use crate::protocol::frame::{encode_server_frame, read_client_frame};
use crate::protocol::hello::random_key;
use crate::protocol::table::MessageSet;
use crate::tool::error::{AppError, TransportError};

enum SenderBackend<Out> {
    Socket {
        writer: Mutex<BufWriter<OwnedWriteHalf>>,
        tables: Arc<CryptTables>,
        key: u8,
    },
    Channel(mpsc::UnboundedSender<Out>),
}

/// 소켓 쓰기 하나의 최대 대기 시간
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(3);

struct SenderInner<Out> {
    backend: SenderBackend<Out>,
    addr: SocketAddr,
    write_timeout_ms: AtomicU64,
    stalled: AtomicBool,
}

impl<Out> SenderInner<Out> {
    fn new(backend: SenderBackend<Out>, addr: SocketAddr) -> Self {
        Self {
            backend,
            addr,
            write_timeout_ms: AtomicU64::new(DEFAULT_WRITE_TIMEOUT.as_millis() as u64),
            stalled: AtomicBool::new(false),
        }
    }
}

/// 연결 쓰기 끝점
///
/// 방/로비 액터는 연결 자체가 아니라 이 핸들만 보관하고 브로드캐스트에 사용합니다.
pub struct ConnSender<Out> {
    inner: Arc<SenderInner<Out>>,
}

impl<Out> Clone for ConnSender<Out> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Out> std::fmt::Debug for ConnSender<Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnSender")
            .field("addr", &self.inner.addr)
            .finish()
    }
}

impl<Out: MessageSet + Clone> ConnSender<Out> {
    fn socket(writer: OwnedWriteHalf, tables: Arc<CryptTables>, key: u8, addr: SocketAddr) -> Self {
        let backend = SenderBackend::Socket {
            writer: Mutex::new(BufWriter::new(writer)),
            tables,
            key,
        };
        Self {
            inner: Arc::new(SenderInner::new(backend, addr)),
        }
    }

    /// 소켓 없이 메시지를 채널로 받는 끝점 (프로세스 내부 클라이언트와 테스트용)
    pub fn channel(addr: SocketAddr) -> (Self, mpsc::UnboundedReceiver<Out>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = Self {
            inner: Arc::new(SenderInner::new(SenderBackend::Channel(tx), addr)),
        };
        (sender, rx)
    }

    /// 원격 주소
    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    /// 소켓 쓰기 제한 시간 변경 (복제본 전체에 적용)
    pub fn set_write_timeout(&self, timeout: Duration) {
        self.inner
            .write_timeout_ms
            .store(timeout.as_millis().max(1) as u64, Ordering::Relaxed);
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.inner.write_timeout_ms.load(Ordering::Relaxed))
    }

    /// 쓰기 시간 초과로 멈춘 연결인지 확인
    pub fn is_stalled(&self) -> bool {
        self.inner.stalled.load(Ordering::Acquire)
    }

    /// 제한 시간 안에 소켓에 쓰기
    ///
    /// 시간을 넘기면 프레임 경계가 깨졌을 수 있으므로 연결을 멈춘 것으로 표시합니다.
    async fn write_socket(
        &self,
        writer: &Mutex<BufWriter<OwnedWriteHalf>>,
        bytes: &[u8],
    ) -> Result<(), AppError> {
        if self.is_stalled() {
            return Err(TransportError::Closed.into());
        }
        let timeout = self.write_timeout();
        let write = async {
            let mut writer = writer.lock().await;
            writer.write_all(bytes).await?;
            writer.flush().await
        };
        match tokio::time::timeout(timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                self.inner.stalled.store(true, Ordering::Release);
                warn!("{} 쓰기 시간 초과 ({:?}), 연결을 멈춘 것으로 표시", self.inner.addr, timeout);
                Err(TransportError::WriteTimeout(timeout).into())
            }
        }
    }

    /// 메시지 전송
    pub async fn send(&self, message: &Out) -> Result<(), AppError> {
        match &self.inner.backend {
            SenderBackend::Socket {
                writer,
                tables,
                key,
            } => {
                let payload = message.encode_payload();
                let frame = encode_server_frame(tables, *key, rand::random(), &payload)?;
                self.write_socket(writer, &frame).await?;
                trace!("{} ← {} ({}바이트)", self.inner.addr, message.name(), frame.len());
                Ok(())
            }
            SenderBackend::Channel(tx) => tx
                .send(message.clone())
                .map_err(|_| AppError::Transport(TransportError::Closed)),
        }
    }

    /// 메시지 변환 후 전송
    pub async fn send_message(&self, message: impl Into<Out>) -> Result<(), AppError> {
        self.send(&message.into()).await
    }

    /// 난독화 없이 원시 바이트 전송 (연결 메시지용)
    pub async fn send_raw(&self, bytes: &[u8]) -> Result<(), AppError> {
        match &self.inner.backend {
            SenderBackend::Socket { writer, .. } => self.write_socket(writer, bytes).await,
            SenderBackend::Channel(_) => Ok(()),
        }
    }

    /// 쓰기 절반 종료
    pub async fn close(&self) {
        if let SenderBackend::Socket { writer, .. } = &self.inner.backend {
            let shutdown = async {
                let mut writer = writer.lock().await;
                let _ = writer.shutdown().await;
            };
            if tokio::time::timeout(self.write_timeout(), shutdown).await.is_err() {
                debug!("{} 쓰기 종료 시간 초과", self.inner.addr);
            }
        }
    }

    /// 같은 연결을 가리키는지 확인
    pub fn same_connection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// 서버 측 연결
///
/// # Type Parameters
/// * `In` - 이 서비스가 받는 메시지 집합
/// * `Out` - 이 서비스가 보내는 메시지 집합
pub struct ServerConn<In, Out> {
    reader: BufReader<OwnedReadHalf>,
    sender: ConnSender<Out>,
    tables: Arc<CryptTables>,
    key: u8,
    addr: SocketAddr,
    _in: PhantomData<fn() -> In>,
}

impl<In: MessageSet, Out: MessageSet + Clone> ServerConn<In, Out> {
    /// 무작위 연결 키로 연결 생성
    pub fn new(stream: TcpStream, addr: SocketAddr, tables: Arc<CryptTables>) -> Self {
        Self::with_key(stream, addr, tables, random_key())
    }

    /// 지정한 연결 키로 연결 생성
    pub fn with_key(stream: TcpStream, addr: SocketAddr, tables: Arc<CryptTables>, key: u8) -> Self {
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            sender: ConnSender::socket(write_half, tables.clone(), key, addr),
            tables,
            key,
            addr,
            _in: PhantomData,
        }
    }

    /// 연결 키
    pub fn key(&self) -> u8 {
        self.key
    }

    /// 원격 주소
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// 쓰기 끝점 복제
    pub fn sender(&self) -> ConnSender<Out> {
        self.sender.clone()
    }

    /// 연결 메시지 전송
    pub async fn send_hello(&self, bytes: &[u8]) -> Result<(), AppError> {
        self.sender.send_raw(bytes).await
    }

    /// 다음 메시지 수신
    ///
    /// 알 수 없는 ID나 잘못된 레이아웃은 `AppError::Protocol`로 반환되며 연결 단위로 치명적입니다.
    pub async fn read_message(&mut self) -> Result<In, AppError> {
        let payload = read_client_frame(&mut self.reader, &self.tables, self.key).await?;
        let message = In::decode_payload(payload)?;
        trace!("{} → {}", self.addr, message.name());
        Ok(message)
    }

    /// 다음 프레임을 평문 그대로 수신 (메시지 테이블 해석 없음)
    pub async fn read_raw(&mut self) -> Result<bytes::Bytes, AppError> {
        read_client_frame(&mut self.reader, &self.tables, self.key).await
    }

    /// 메시지 전송
    pub async fn send_message(&self, message: impl Into<Out>) -> Result<(), AppError> {
        self.sender.send_message(message).await
    }

    /// 쓰기 절반을 닫고 연결 종료
    pub async fn close(self) {
        self.sender.close().await;
    }
}
