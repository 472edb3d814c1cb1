//! 메신저 연결 테스트

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use shared::net::{ClientConn, HelloKind, TcpService};
use shared::protocol::message::*;
use shared::protocol::CryptTables;
use shared::service::{MemorySessionStore, SessionStore};

use crate::{MessageContext, MessageServer, AUTH_FAILED, AUTH_OK};

type Client = ClientConn<MessageClientMessage, MessageServerMessage>;

const WAIT: Duration = Duration::from_secs(3);

async fn start(sessions: Arc<MemorySessionStore>) -> (Arc<MessageServer>, String) {
    let ctx = MessageContext {
        sessions,
        tables: CryptTables::builtin(),
    };
    let server = Arc::new(MessageServer::new(ctx, &CancellationToken::new()));
    let listener = TcpService::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let serve = server.clone();
    tokio::spawn(async move { serve.serve(listener).await });
    (server, addr)
}

async fn auth_status(client: &mut Client, player_id: u32, session_key: &str) -> u32 {
    client
        .send(ClientMessengerAuth {
            player_id,
            session_key: session_key.into(),
        })
        .await
        .unwrap();
    match client.recv_timeout(WAIT).await.unwrap() {
        MessageServerMessage::ServerMessengerAuthResult(result) => result.status,
    }
}

#[tokio::test]
async fn test_messenger_auth() {
    let sessions = Arc::new(MemorySessionStore::default());
    let session = sessions.add_session(7, "127.0.0.1:1").await.unwrap();
    let (_server, addr) = start(sessions.clone()).await;

    let mut client: Client = ClientConn::connect(&addr, HelloKind::Message, CryptTables::builtin())
        .await
        .unwrap();

    assert_eq!(auth_status(&mut client, 7, &session.key).await, AUTH_OK);
    // 다른 플레이어의 세션 키
    assert_eq!(auth_status(&mut client, 8, &session.key).await, AUTH_FAILED);
    assert_eq!(auth_status(&mut client, 7, "no-such-key").await, AUTH_FAILED);
    println!("✅ 메신저 인증 테스트 통과");
}

#[tokio::test]
async fn test_unknown_frames_keep_connection() {
    let sessions = Arc::new(MemorySessionStore::default());
    let session = sessions.add_session(3, "127.0.0.1:1").await.unwrap();
    let (_server, addr) = start(sessions).await;

    let mut client: Client = ClientConn::connect(&addr, HelloKind::Message, CryptTables::builtin())
        .await
        .unwrap();

    // 테이블에 없는 ID, 하트비트는 응답 없음
    client.send_raw(&[0x77, 0x00, 0x01, 0x02]).await.unwrap();
    client.send(ClientMessengerHeartbeat {}).await.unwrap();
    client.expect_silence(Duration::from_millis(200)).await.unwrap();

    assert_eq!(auth_status(&mut client, 3, &session.key).await, AUTH_OK);
}

#[tokio::test]
async fn test_shutdown_closes_messenger() {
    let (server, addr) = start(Arc::new(MemorySessionStore::default())).await;
    let mut client: Client = ClientConn::connect(&addr, HelloKind::Message, CryptTables::builtin())
        .await
        .unwrap();

    server.shutdown(Duration::from_secs(2)).await.unwrap();
    assert_eq!(server.connection_count(), 0);
    assert!(client.recv().await.unwrap_err().is_closed());
}
