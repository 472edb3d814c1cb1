//! 클라이언트 측 연결
//!
//! 통합 테스트와 부하 도구에서 실제 클라이언트처럼 서버에 접속할 때 사용합니다.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::protocol::cipher::CryptTables;
use crate::protocol::frame::{encode_client_frame, read_server_frame};
use crate::protocol::hello::{
    parse_game_hello, parse_login_hello, parse_message_hello, GAME_HELLO_LEN, LOGIN_HELLO_LEN,
    MESSAGE_HELLO_LEN,
};
use crate::protocol::table::MessageSet;
use crate::tool::error::AppError;

/// 접속 대상 서비스별 연결 메시지 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelloKind {
    Login,
    Game,
    Message,
}

/// 클라이언트 측 연결
///
/// `Out`은 클라이언트가 보내는 메시지 집합, `In`은 서버에서 받는 메시지 집합입니다.
pub struct ClientConn<Out, In> {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    tables: Arc<CryptTables>,
    key: u8,
    server_id: Option<u16>,
    _marker: PhantomData<fn(Out) -> In>,
}

impl<Out: MessageSet, In: MessageSet> ClientConn<Out, In> {
    /// 접속 후 연결 메시지를 읽어 키 확보
    pub async fn connect(addr: &str, kind: HelloKind, tables: Arc<CryptTables>) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("접속 실패: {}", addr))?;
        let _ = stream.set_nodelay(true);
        let (read_half, writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let (key, server_id) = match kind {
            HelloKind::Login => {
                let mut hello = [0u8; LOGIN_HELLO_LEN];
                reader.read_exact(&mut hello).await?;
                let (key, server_id) = parse_login_hello(&hello)?;
                (key, Some(server_id))
            }
            HelloKind::Game => {
                let mut hello = [0u8; GAME_HELLO_LEN];
                reader.read_exact(&mut hello).await?;
                (parse_game_hello(&hello)?, None)
            }
            HelloKind::Message => {
                let mut hello = [0u8; MESSAGE_HELLO_LEN];
                reader.read_exact(&mut hello).await?;
                (parse_message_hello(&hello)?, None)
            }
        };

        Ok(Self {
            reader,
            writer,
            tables,
            key,
            server_id,
            _marker: PhantomData,
        })
    }

    /// 서버가 배정한 연결 키
    pub fn key(&self) -> u8 {
        self.key
    }

    /// 로그인 연결 메시지에 실린 서버 ID
    pub fn server_id(&self) -> Option<u16> {
        self.server_id
    }

    /// 메시지 전송 (프레임마다 무작위 salt)
    pub async fn send(&mut self, message: impl Into<Out>) -> Result<()> {
        let message = message.into();
        let payload = message.encode_payload();
        let frame = encode_client_frame(&self.tables, self.key, rand::random(), &payload)
            .map_err(AppError::from)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// 원시 평문 페이로드 전송 (테이블에 없는 ID 테스트용)
    pub async fn send_raw(&mut self, plaintext: &[u8]) -> Result<()> {
        let frame = encode_client_frame(&self.tables, self.key, rand::random(), plaintext)
            .map_err(AppError::from)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// 다음 서버 메시지 수신
    pub async fn recv(&mut self) -> Result<In, AppError> {
        let payload = read_server_frame(&mut self.reader, &self.tables, self.key).await?;
        Ok(In::decode_payload(payload)?)
    }

    /// 제한 시간 안에 다음 서버 메시지 수신
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<In> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => Ok(result?),
            Err(_) => bail!("{:?} 안에 메시지가 오지 않았습니다", timeout),
        }
    }

    /// 조건에 맞는 메시지가 올 때까지 수신 (그 전 메시지는 버림)
    pub async fn recv_until<F>(&mut self, timeout: Duration, mut predicate: F) -> Result<In>
    where
        F: FnMut(&In) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let message = self.recv_timeout(remaining).await?;
            if predicate(&message) {
                return Ok(message);
            }
        }
    }

    /// 제한 시간 동안 아무 메시지도 오지 않는지 확인
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match tokio::time::timeout(window, self.recv()).await {
            Err(_) => Ok(()),
            Ok(Ok(message)) => bail!("예상하지 못한 메시지: {:?}", message),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    /// 쓰기 절반을 닫음
    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
