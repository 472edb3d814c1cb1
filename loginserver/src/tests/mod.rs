//! 로그인 흐름 통합 테스트 (실제 소켓 사용)

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use shared::config::GameConfig;
use shared::model::{ServerInfo, ServerType};
use shared::net::{ClientConn, HelloKind};
use shared::protocol::login::*;
use shared::protocol::CryptTables;
use shared::service::password_helper::MIN_COST;
use shared::service::{
    AccountStore, MemoryAccountStore, MemorySessionStore, MemoryTopology, SessionStore,
};

use crate::{LoginContext, LoginServer};

type Client = ClientConn<LoginClientMessage, LoginServerMessage>;

const WAIT: Duration = Duration::from_secs(3);

struct Harness {
    server: Arc<LoginServer>,
    addr: String,
    accounts: Arc<MemoryAccountStore>,
    sessions: Arc<MemorySessionStore>,
}

impl Harness {
    async fn start() -> Self {
        let accounts = Arc::new(MemoryAccountStore::new(MIN_COST));
        let sessions = Arc::new(MemorySessionStore::default());
        let topology = MemoryTopology::new(vec![
            server_info(ServerType::Game, 20201),
            server_info(ServerType::Message, 30303),
        ]);

        let ctx = LoginContext {
            accounts: accounts.clone(),
            sessions: sessions.clone(),
            topology: Arc::new(topology),
            game_config: Arc::new(GameConfig::default()),
            tables: CryptTables::builtin(),
            server_id: 10103,
        };
        let server = Arc::new(LoginServer::new(ctx, &CancellationToken::new()));
        let listener = shared::net::TcpService::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let serve = server.clone();
        tokio::spawn(async move { serve.serve(listener).await });

        Self {
            server,
            addr,
            accounts,
            sessions,
        }
    }

    async fn connect(&self) -> Client {
        ClientConn::connect(&self.addr, HelloKind::Login, CryptTables::builtin())
            .await
            .unwrap()
    }
}

fn server_info(server_type: ServerType, id: u32) -> ServerInfo {
    ServerInfo {
        server_type,
        id,
        name: format!("{}-{}", server_type, id),
        address: "127.0.0.1".into(),
        port: id as u16,
        num_users: 0,
        max_users: 100,
        flags: 0,
    }
}

async fn recv(client: &mut Client) -> LoginServerMessage {
    client.recv_timeout(WAIT).await.unwrap()
}

fn login(username: &str, password: &str) -> ClientLogin {
    ClientLogin {
        username: username.into(),
        password: password.into(),
    }
}

/// 세션 키 이후의 공통 흐름 검증, 세션 키 반환
async fn expect_session_handoff(client: &mut Client, username: &str) -> String {
    assert_eq!(
        recv(client).await,
        LoginServerMessage::Server0011(Server0011 { unknown: 0 })
    );
    let key = match recv(client).await {
        LoginServerMessage::ServerLoginSessionKey(msg) => msg.key,
        other => panic!("세션 키가 아님: {:?}", other),
    };
    match recv(client).await {
        LoginServerMessage::ServerLogin(ServerLogin {
            status: LoginStatus::Success { username: name, .. },
        }) => assert_eq!(name, username),
        other => panic!("로그인 성공이 아님: {:?}", other),
    }
    match recv(client).await {
        LoginServerMessage::ServerMessageServerList(list) => {
            assert_eq!(list.servers.len(), 1);
            assert_eq!(list.servers[0].server_id, 30303);
        }
        other => panic!("메시지 서버 목록이 아님: {:?}", other),
    }
    match recv(client).await {
        LoginServerMessage::ServerGameServerList(list) => {
            assert_eq!(list.servers[0].port, 20201);
        }
        other => panic!("게임 서버 목록이 아님: {:?}", other),
    }

    client
        .send(ClientSelectServer { server_id: 20201 })
        .await
        .unwrap();
    match recv(client).await {
        LoginServerMessage::ServerGameSessionKey(msg) => assert_eq!(msg.key, key),
        other => panic!("게임 세션 키가 아님: {:?}", other),
    }
    key
}

#[tokio::test]
async fn test_first_login_provisioning() {
    let harness = Harness::start().await;
    let player = harness.accounts.register("alice", "secret").await.unwrap();

    let mut client = harness.connect().await;
    assert_eq!(client.server_id(), Some(10103));
    client.send(login("alice", "secret")).await.unwrap();

    assert!(matches!(
        recv(&mut client).await,
        LoginServerMessage::ServerLogin(ServerLogin {
            status: LoginStatus::SetNickname { .. }
        })
    ));

    // 확인 요청은 그대로 되돌려줌
    client
        .send(ClientCheckNickname {
            nickname: "Alice".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        recv(&mut client).await,
        LoginServerMessage::ServerNicknameCheckResponse(ServerNicknameCheckResponse {
            status: 0,
            nickname: "Alice".into()
        })
    );

    client
        .send(ClientSetNickname {
            nickname: "Alice".into(),
        })
        .await
        .unwrap();
    assert!(matches!(
        recv(&mut client).await,
        LoginServerMessage::ServerLogin(ServerLogin {
            status: LoginStatus::SetCharacter {}
        })
    ));

    client
        .send(ClientSelectCharacter {
            char_type_id: 0x0400_0001,
            hair_color: 0,
        })
        .await
        .unwrap();

    let key = expect_session_handoff(&mut client, "alice").await;
    let session = harness.sessions.get_session_by_key(&key).await.unwrap();
    assert_eq!(session.player_id, player.player_id);

    let stored = harness.accounts.get_player(player.player_id).await.unwrap();
    assert_eq!(stored.nickname.as_deref(), Some("Alice"));
    assert_eq!(stored.characters.len(), 1);
    assert_eq!(stored.characters[0].char_type_id, 0x0400_0001);
    assert_eq!(stored.equipped.character_id, stored.characters[0].id);
    assert_ne!(stored.equipped.club_id, 0);
    assert_eq!(
        stored.inventory[0].item_type_id,
        GameConfig::default().default_club_set_type_id
    );
    println!("✅ 첫 로그인 프로비저닝 테스트 통과");
}

#[tokio::test]
async fn test_returning_player_skips_provisioning() {
    let harness = Harness::start().await;
    let player = harness.accounts.register("bob", "pw").await.unwrap();
    harness
        .accounts
        .set_nickname(player.player_id, "Bob")
        .await
        .unwrap();
    let club = harness
        .accounts
        .add_item(player.player_id, 1, 1)
        .await
        .unwrap();
    harness
        .accounts
        .set_club_set(player.player_id, club.item_id)
        .await
        .unwrap();
    harness
        .accounts
        .add_character(player.player_id, Default::default())
        .await
        .unwrap();

    let mut client = harness.connect().await;
    client.send(login("bob", "pw")).await.unwrap();
    expect_session_handoff(&mut client, "bob").await;

    // 이미 클럽 세트가 있으므로 새로 지급하지 않음
    assert_eq!(harness.accounts.inventory(player.player_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_bad_credentials() {
    let harness = Harness::start().await;
    harness.accounts.register("carol", "right").await.unwrap();

    for (username, password) in [("carol", "wrong"), ("nobody", "x")] {
        let mut client = harness.connect().await;
        client.send(login(username, password)).await.unwrap();
        match recv(&mut client).await {
            LoginServerMessage::ServerLogin(ServerLogin {
                status: LoginStatus::Error { code },
            }) => assert_ne!(code, 0),
            other => panic!("로그인 에러가 아님: {:?}", other),
        }
        // 응답 후 서버가 연결을 닫음
        assert!(client.recv().await.unwrap_err().is_closed());
    }
    assert!(harness.sessions.is_empty());
}

#[tokio::test]
async fn test_invalid_nickname_not_committed() {
    let harness = Harness::start().await;
    let player = harness.accounts.register("dave", "pw").await.unwrap();

    let mut client = harness.connect().await;
    client.send(login("dave", "pw")).await.unwrap();
    recv(&mut client).await;

    client
        .send(ClientSetNickname {
            nickname: "x".repeat(17),
        })
        .await
        .unwrap();
    match recv(&mut client).await {
        LoginServerMessage::ServerNicknameCheckResponse(msg) => assert_eq!(msg.status, 1),
        other => panic!("닉네임 거부가 아님: {:?}", other),
    }
    assert!(harness
        .accounts
        .get_player(player.player_id)
        .await
        .unwrap()
        .nickname
        .is_none());

    client
        .send(ClientSetNickname {
            nickname: "Dave".into(),
        })
        .await
        .unwrap();
    assert!(matches!(
        recv(&mut client).await,
        LoginServerMessage::ServerLogin(ServerLogin {
            status: LoginStatus::SetCharacter {}
        })
    ));
}

#[tokio::test]
async fn test_shutdown_closes_pending_logins() {
    let harness = Harness::start().await;
    let mut client = harness.connect().await;

    // ClientLogin을 보내지 않고 대기 중인 연결
    for _ in 0..50 {
        if harness.server.connection_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    harness.server.shutdown(Duration::from_secs(2)).await.unwrap();
    assert_eq!(harness.server.connection_count(), 0);
    assert!(client.recv().await.is_err());
}
