//! 브로드캐스트 전송
//!
//! 수신자들에게 동시에 전송하고, 실패는 로그로만 남깁니다.
//! 소켓 하나에 대한 쓰기는 `ConnSender` 안에서 직렬화되고 제한 시간이 있으므로
//! 읽지 않는 클라이언트가 있어도 액터는 최대 쓰기 제한 시간까지만 기다립니다.

use futures::future::join_all;
use tracing::{debug, warn};

use shared::protocol::{GameServerMessage, MessageSet};

use crate::GameSender;

/// 여러 연결에 같은 메시지 전송
///
/// 전송에 성공한 수신자 수를 반환합니다.
pub async fn broadcast<'a, I>(targets: I, message: &GameServerMessage, context: &str) -> usize
where
    I: IntoIterator<Item = &'a GameSender>,
{
    let sends = targets.into_iter().map(|conn| async move {
        let result = conn.send(message).await;
        (conn.addr(), result)
    });
    let results = join_all(sends).await;

    let mut delivered = 0;
    for (addr, result) in results {
        match result {
            Ok(()) => delivered += 1,
            Err(e) => warn!("[{}] {} 전송 실패 ({}): {}", context, message.name(), addr, e),
        }
    }
    debug!("[{}] {} → {}명", context, message.name(), delivered);
    delivered
}

/// 한 연결에 전송 (실패는 로그만)
pub async fn send_to(conn: &GameSender, message: impl Into<GameServerMessage>, context: &str) {
    let message = message.into();
    if let Err(e) = conn.send(&message).await {
        warn!("[{}] {} 전송 실패 ({}): {}", context, message.name(), conn.addr(), e);
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use tokio::net::{TcpListener, TcpStream};

    use shared::protocol::game::{GlobalEvent, ServerEvent};
    use shared::protocol::CryptTables;

    use super::*;
    use crate::tests::channel_sender;
    use crate::GameConn;

    #[tokio::test]
    async fn test_stalled_recipient_does_not_block_others() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let _peer = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, remote) = listener.accept().await.unwrap();
        let stalled = GameConn::with_key(stream, remote, CryptTables::builtin(), 2).sender();
        stalled.set_write_timeout(Duration::from_millis(200));

        let (healthy, mut rx) = channel_sender(43001);
        let message: GameServerMessage = ServerEvent {
            event: GlobalEvent::ChatMessage {
                nickname: "n".into(),
                message: "x".repeat(30_000),
            },
        }
        .into();

        // 상대 수신 버퍼가 찰 때까지 방송
        let started = Instant::now();
        let mut rounds = 0;
        while !stalled.is_stalled() {
            let delivered = broadcast([&stalled, &healthy], &message, "test").await;
            assert!(delivered >= 1);
            rounds += 1;
            assert!(started.elapsed() < Duration::from_secs(30), "쓰기가 멈춤");
        }

        // 멈춘 뒤에는 기다리지 않고 나머지에게만 전달
        let started = Instant::now();
        assert_eq!(broadcast([&stalled, &healthy], &message, "test").await, 1);
        assert!(started.elapsed() < Duration::from_millis(100));

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, rounds + 1);
    }
}
