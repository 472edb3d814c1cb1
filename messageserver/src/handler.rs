//! 메신저 연결 처리
//!
//! 모든 프레임을 로그로 남기고, 인증 요청만 세션 저장소로 확인합니다.
//! 해석할 수 없는 프레임은 hexdump로 남기고 다음 프레임을 계속 읽습니다.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use shared::net::ServerConn;
use shared::protocol::hello::message_hello;
use shared::protocol::message::{
    ClientMessengerAuth, MessageClientMessage, MessageServerMessage, ServerMessengerAuthResult,
};
use shared::protocol::MessageSet;
use shared::tool::HexUtils;

use crate::MessageContext;

/// 메시지 서버 연결
pub type MessageConn = ServerConn<MessageClientMessage, MessageServerMessage>;

/// 인증 성공
pub const AUTH_OK: u32 = 0;
/// 인증 실패 (세션 없음, 만료, 플레이어 불일치)
pub const AUTH_FAILED: u32 = 1;

/// 연결 하나 처리
pub async fn handle_connection(
    ctx: Arc<MessageContext>,
    stream: TcpStream,
    addr: SocketAddr,
    token: CancellationToken,
) -> Result<()> {
    let mut conn = MessageConn::new(stream, addr, ctx.tables.clone());
    conn.send_hello(&message_hello(conn.key())).await?;

    loop {
        let frame = tokio::select! {
            _ = token.cancelled() => {
                debug!("메신저 연결 취소: {}", addr);
                break;
            }
            frame = conn.read_raw() => frame,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) if e.is_closed() => {
                debug!("메신저 연결 종료: {}", addr);
                break;
            }
            Err(e) => {
                conn.close().await;
                return Err(e.into());
            }
        };

        trace!("{} 프레임 ({}바이트)\n{}", addr, frame.len(), HexUtils::hex_dump(&frame));
        dispatch(&ctx, &conn, frame).await?;
    }

    conn.close().await;
    Ok(())
}

async fn dispatch(ctx: &MessageContext, conn: &MessageConn, frame: Bytes) -> Result<()> {
    let message = match MessageClientMessage::decode_payload(frame.clone()) {
        Ok(message) => message,
        Err(e) => {
            warn!(
                "해석할 수 없는 메신저 프레임 ({}): {}\n{}",
                conn.addr(),
                e,
                HexUtils::hex_dump(&frame)
            );
            return Ok(());
        }
    };
    debug!("{} → {}", conn.addr(), message.name());

    match message {
        MessageClientMessage::ClientMessengerAuth(auth) => {
            let status = authenticate(ctx, &auth).await;
            conn.send_message(ServerMessengerAuthResult { status }).await?;
        }
        MessageClientMessage::ClientMessengerHeartbeat(_) => {}
    }
    Ok(())
}

/// 세션 키와 플레이어 ID가 일치하는지 확인하고 세션 만료 시각을 연장
pub async fn authenticate(ctx: &MessageContext, auth: &ClientMessengerAuth) -> u32 {
    let session = match ctx.sessions.get_session_by_key(&auth.session_key).await {
        Ok(session) => session,
        Err(e) => {
            info!(player_id = auth.player_id, "메신저 인증 실패: {}", e);
            return AUTH_FAILED;
        }
    };

    if session.player_id != auth.player_id {
        warn!(
            player_id = auth.player_id,
            "메신저 인증 실패: 세션 소유자 {}와 불일치", session.player_id
        );
        return AUTH_FAILED;
    }

    if let Err(e) = ctx.sessions.update_session_expiry(session.session_id).await {
        warn!(session_id = session.session_id, "세션 만료 시각 갱신 실패: {}", e);
    }
    info!(player_id = auth.player_id, "메신저 인증 성공");
    AUTH_OK
}
