//! 네트워크 런타임
//!
//! - [`TcpService`]: 접속 수락 루프
//! - [`ServerConn`] / [`ConnSender`]: 서버 측 연결과 공유 가능한 쓰기 끝점
//! - [`ClientConn`]: 테스트와 도구용 클라이언트

pub mod client_conn;
pub mod server_conn;
pub mod tcp_service;

pub use client_conn::{ClientConn, HelloKind};
pub use server_conn::{ConnSender, ServerConn, DEFAULT_WRITE_TIMEOUT};
pub use tcp_service::TcpService;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::hello::{game_hello, login_hello, message_hello};
    use crate::protocol::login::{
        ClientLogin, LoginClientMessage, LoginServerMessage, LoginStatus, ServerLogin,
    };
    use crate::protocol::CryptTables;
    use crate::tool::error::{AppError, TransportError};
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_server_client_exchange() {
        let tables = CryptTables::builtin();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server_tables = tables.clone();
        let server = tokio::spawn(async move {
            let (stream, remote) = listener.accept().await.unwrap();
            let mut conn: ServerConn<LoginClientMessage, LoginServerMessage> =
                ServerConn::with_key(stream, remote, server_tables, 7);
            conn.send_hello(&login_hello(conn.key(), 10103)).await.unwrap();

            match conn.read_message().await.unwrap() {
                LoginClientMessage::ClientLogin(login) => assert_eq!(login.username, "alice"),
                other => panic!("ClientLogin이 아님: {:?}", other),
            }

            conn.send_message(ServerLogin {
                status: LoginStatus::Error { code: 5 },
            })
            .await
            .unwrap();
            conn.close().await;
        });

        let mut client: ClientConn<LoginClientMessage, LoginServerMessage> =
            ClientConn::connect(&addr, HelloKind::Login, tables).await.unwrap();
        assert_eq!(client.key(), 7);
        assert_eq!(client.server_id(), Some(10103));

        client
            .send(ClientLogin {
                username: "alice".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();

        let reply = client.recv_timeout(Duration::from_secs(2)).await.unwrap();
        assert_eq!(
            reply,
            LoginServerMessage::ServerLogin(ServerLogin {
                status: LoginStatus::Error { code: 5 }
            })
        );

        // 서버가 닫은 뒤에는 Closed
        let closed = client.recv().await.unwrap_err();
        assert!(closed.is_closed());
        server.await.unwrap();
        println!("✅ 서버/클라이언트 교환 테스트 통과");
    }

    #[tokio::test]
    async fn test_hello_kinds() {
        let tables = CryptTables::builtin();
        for (kind, hello) in [
            (HelloKind::Game, game_hello(3).to_vec()),
            (HelloKind::Message, message_hello(12).to_vec()),
        ] {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap().to_string();
            let server = tokio::spawn(async move {
                let (stream, remote) = listener.accept().await.unwrap();
                let conn: ServerConn<LoginClientMessage, LoginServerMessage> =
                    ServerConn::new(stream, remote, CryptTables::builtin());
                conn.send_hello(&hello).await.unwrap();
                tokio::time::sleep(Duration::from_millis(50)).await;
            });

            let client: ClientConn<LoginClientMessage, LoginServerMessage> =
                ClientConn::connect(&addr, kind, tables.clone()).await.unwrap();
            let expected = if kind == HelloKind::Game { 3 } else { 12 };
            assert_eq!(client.key(), expected);
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_channel_sender() {
        let (sender, mut rx) =
            ConnSender::<LoginServerMessage>::channel("127.0.0.1:1".parse().unwrap());
        let clone = sender.clone();
        assert!(clone.same_connection(&sender));

        clone
            .send_message(ServerLogin {
                status: LoginStatus::SetCharacter {},
            })
            .await
            .unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(LoginServerMessage::ServerLogin(_))
        ));

        drop(rx);
        let err = sender
            .send_message(ServerLogin::default())
            .await
            .unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_stalled_peer_write_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // 연결만 하고 아무것도 읽지 않는 상대
        let _peer = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (stream, remote) = listener.accept().await.unwrap();
        let conn: ServerConn<LoginClientMessage, LoginServerMessage> =
            ServerConn::with_key(stream, remote, CryptTables::builtin(), 1);
        let sender = conn.sender();
        sender.set_write_timeout(Duration::from_millis(200));

        let chunk = vec![0u8; 1 << 20];
        let error = tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                if let Err(e) = sender.send_raw(&chunk).await {
                    return e;
                }
            }
        })
        .await
        .expect("쓰기가 제한 시간 없이 멈춤");
        assert!(matches!(
            error,
            AppError::Transport(TransportError::WriteTimeout(_))
        ));
        assert!(sender.is_stalled());

        // 멈춘 연결은 기다리지 않고 바로 실패
        let started = std::time::Instant::now();
        let err = sender
            .send_message(ServerLogin::default())
            .await
            .unwrap_err();
        assert!(err.is_closed());
        assert!(started.elapsed() < Duration::from_millis(100));
        println!("✅ 멈춘 상대 쓰기 시간 초과 테스트 통과");
    }
}
