//! 로그인 → 게임 → 방 진행까지 세 서버를 실제 소켓으로 구동하는 통합 테스트

use std::sync::Arc;
use std::time::Duration;

use gamecenter::{BoundAddrs, GameCenterConfigBuilder, ServerManager};
use shared::config::ServerConfig;
use shared::net::{ClientConn, HelloKind};
use shared::protocol::game::*;
use shared::protocol::login::*;
use shared::protocol::message::*;
use shared::protocol::{CryptTables, MessageSet};
use shared::service::password_helper::MIN_COST;

type LoginClient = ClientConn<LoginClientMessage, LoginServerMessage>;
type GameClient = ClientConn<GameClientMessage, GameServerMessage>;
type MessengerClient = ClientConn<MessageClientMessage, MessageServerMessage>;

const WAIT: Duration = Duration::from_secs(3);
const QUIET: Duration = Duration::from_millis(300);

struct Cluster {
    manager: Arc<ServerManager>,
    addrs: BoundAddrs,
}

impl Cluster {
    async fn start() -> Self {
        let config = GameCenterConfigBuilder::new(ServerConfig::default())
            .unwrap()
            .ephemeral()
            .build()
            .unwrap();
        let manager = Arc::new(ServerManager::from_config(config, MIN_COST).unwrap());
        let addrs = manager.start_all().await.unwrap();
        Self { manager, addrs }
    }

    async fn stop(self) {
        self.manager.stop_all().await.unwrap();
    }

    async fn register(&self, username: &str) {
        self.manager
            .collaborators()
            .accounts
            .register(username, "secret")
            .await
            .unwrap();
    }

    async fn connect_login(&self) -> LoginClient {
        let addr = self.addrs.login.unwrap().to_string();
        ClientConn::connect(&addr, HelloKind::Login, CryptTables::builtin())
            .await
            .unwrap()
    }

    async fn connect_game(&self) -> GameClient {
        let addr = self.addrs.game.unwrap().to_string();
        ClientConn::connect(&addr, HelloKind::Game, CryptTables::builtin())
            .await
            .unwrap()
    }

    /// 첫 로그인 흐름 전체를 거쳐 세션 키 발급
    async fn login(&self, username: &str) -> LoggedIn {
        self.register(username).await;
        let mut client = self.connect_login().await;
        client
            .send(ClientLogin {
                username: username.into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        client
            .recv_until(WAIT, |m| is_status(m, |s| matches!(s, LoginStatus::SetNickname { .. })))
            .await
            .unwrap();
        client
            .send(ClientSetNickname {
                nickname: username.to_uppercase(),
            })
            .await
            .unwrap();
        client
            .recv_until(WAIT, |m| is_status(m, |s| matches!(s, LoginStatus::SetCharacter {})))
            .await
            .unwrap();
        client
            .send(ClientSelectCharacter {
                char_type_id: 0x0400_0001,
                hair_color: 0,
            })
            .await
            .unwrap();

        let key = match client
            .recv_until(WAIT, |m| matches!(m, LoginServerMessage::ServerLoginSessionKey(_)))
            .await
            .unwrap()
        {
            LoginServerMessage::ServerLoginSessionKey(msg) => msg.key,
            _ => unreachable!(),
        };
        let player_id = match client
            .recv_until(WAIT, |m| is_status(m, |s| matches!(s, LoginStatus::Success { .. })))
            .await
            .unwrap()
        {
            LoginServerMessage::ServerLogin(ServerLogin {
                status: LoginStatus::Success { player_id, .. },
            }) => player_id,
            _ => unreachable!(),
        };
        client.send(ClientSelectServer { server_id: 0 }).await.unwrap();
        client
            .recv_until(WAIT, |m| matches!(m, LoginServerMessage::ServerGameSessionKey(_)))
            .await
            .unwrap();

        let session = self
            .manager
            .collaborators()
            .sessions
            .get_session_by_key(&key)
            .await
            .unwrap();
        LoggedIn {
            username: username.to_string(),
            player_id,
            key,
            conn_id: session.session_id,
        }
    }

    /// 로그인 후 게임 서버 인증까지 마친 클라이언트
    async fn enter_game(&self, username: &str) -> Player {
        let login = self.login(username).await;
        let mut client = self.connect_game().await;
        client
            .send(ClientAuth {
                username: login.username.clone(),
                player_id: login.player_id,
                login_key: login.key.clone(),
                version: "824.00".into(),
            })
            .await
            .unwrap();
        client
            .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerChannelList(_)))
            .await
            .unwrap();
        Player {
            client,
            conn_id: login.conn_id,
        }
    }

    /// 게임 인증 후 멀티플레이 로비 입장
    async fn enter_lobby(&self, username: &str) -> Player {
        let mut player = self.enter_game(username).await;
        player.client.send(ClientMultiplayerJoin {}).await.unwrap();
        player
            .client
            .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerMultiplayerJoined(_)))
            .await
            .unwrap();
        player
    }

    async fn room_snapshot(&self, number: i16) -> gameserver::service::RoomSnapshot {
        let game = self.manager.game_server().unwrap();
        let room = game.lobby().get_room(number).unwrap();
        room.snapshot().await.unwrap()
    }
}

struct LoggedIn {
    username: String,
    player_id: u32,
    key: String,
    conn_id: u32,
}

struct Player {
    client: GameClient,
    conn_id: u32,
}

fn is_status(message: &LoginServerMessage, check: impl Fn(&LoginStatus) -> bool) -> bool {
    match message {
        LoginServerMessage::ServerLogin(login) => check(&login.status),
        _ => false,
    }
}

fn room_census_ids(message: &GameServerMessage) -> Option<Vec<u32>> {
    match message {
        GameServerMessage::ServerRoomCensus(ServerRoomCensus {
            census: RoomCensus::ListSet { users, .. },
        }) => Some(users.iter().map(|u| u.conn_id).collect()),
        _ => None,
    }
}

fn create_request(name: &str) -> ClientRoomCreate {
    ClientRoomCreate {
        max_users: 4,
        room_type: 0,
        num_holes: 3,
        course: 10,
        room_name: name.into(),
        ..Default::default()
    }
}

/// A가 방을 만들고 나머지가 순서대로 입장한 상태
async fn room_of(cluster: &Cluster, names: &[&str]) -> Vec<Player> {
    let mut players = Vec::new();
    for name in names {
        players.push(cluster.enter_lobby(name).await);
    }

    players[0].client.send(create_request("t")).await.unwrap();
    players[0]
        .client
        .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomJoin(_)))
        .await
        .unwrap();

    for i in 1..players.len() {
        players[i]
            .client
            .send(ClientRoomJoin {
                room_number: 0,
                password: String::new(),
            })
            .await
            .unwrap();
        let expected = i + 1;
        players[i]
            .client
            .recv_until(WAIT, |m| {
                room_census_ids(m).map_or(false, |ids| ids.len() == expected)
            })
            .await
            .unwrap();
    }
    players
}

#[tokio::test]
async fn test_register_login_and_select_server() {
    let cluster = Cluster::start().await;
    cluster.register("alice").await;

    let mut client = cluster.connect_login().await;
    client
        .send(ClientLogin {
            username: "alice".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();
    assert!(matches!(
        client.recv_timeout(WAIT).await.unwrap(),
        LoginServerMessage::ServerLogin(ServerLogin {
            status: LoginStatus::SetNickname { .. }
        })
    ));

    client
        .send(ClientSetNickname {
            nickname: "Alice".into(),
        })
        .await
        .unwrap();
    assert!(matches!(
        client.recv_timeout(WAIT).await.unwrap(),
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
    assert!(matches!(
        client.recv_timeout(WAIT).await.unwrap(),
        LoginServerMessage::Server0011(_)
    ));
    let key = match client.recv_timeout(WAIT).await.unwrap() {
        LoginServerMessage::ServerLoginSessionKey(msg) => msg.key,
        other => panic!("세션 키가 아님: {:?}", other),
    };
    match client.recv_timeout(WAIT).await.unwrap() {
        LoginServerMessage::ServerLogin(ServerLogin {
            status: LoginStatus::Success { nickname, .. },
        }) => assert_eq!(nickname, "Alice"),
        other => panic!("로그인 성공이 아님: {:?}", other),
    }

    // 토폴로지에는 실제 바인드된 포트가 광고됨
    match client.recv_timeout(WAIT).await.unwrap() {
        LoginServerMessage::ServerMessageServerList(list) => {
            assert_eq!(list.servers[0].port, cluster.addrs.message.unwrap().port());
        }
        other => panic!("메시지 서버 목록이 아님: {:?}", other),
    }
    match client.recv_timeout(WAIT).await.unwrap() {
        LoginServerMessage::ServerGameServerList(list) => {
            assert_eq!(list.servers[0].port, cluster.addrs.game.unwrap().port());
        }
        other => panic!("게임 서버 목록이 아님: {:?}", other),
    }

    client.send(ClientSelectServer { server_id: 0 }).await.unwrap();
    match client.recv_timeout(WAIT).await.unwrap() {
        LoginServerMessage::ServerGameSessionKey(msg) => assert_eq!(msg.key, key),
        other => panic!("게임 세션 키가 아님: {:?}", other),
    }

    // 같은 세션 키로 메신저 인증
    let addr = cluster.addrs.message.unwrap().to_string();
    let mut messenger: MessengerClient =
        ClientConn::connect(&addr, HelloKind::Message, CryptTables::builtin())
            .await
            .unwrap();
    let session = cluster
        .manager
        .collaborators()
        .sessions
        .get_session_by_key(&key)
        .await
        .unwrap();
    messenger
        .send(ClientMessengerAuth {
            player_id: session.player_id,
            session_key: key,
        })
        .await
        .unwrap();
    assert_eq!(
        messenger.recv_timeout(WAIT).await.unwrap(),
        MessageServerMessage::ServerMessengerAuthResult(ServerMessengerAuthResult {
            status: messageserver::AUTH_OK
        })
    );

    cluster.stop().await;
    println!("✅ 로그인 흐름 테스트 통과");
}

#[tokio::test]
async fn test_game_auth_and_lobby_join() {
    let cluster = Cluster::start().await;
    let login = cluster.login("alice").await;

    let mut client = cluster.connect_game().await;
    assert!(client.key() < 16);
    client
        .send(ClientAuth {
            username: login.username.clone(),
            player_id: login.player_id,
            login_key: login.key.clone(),
            version: "824.00".into(),
        })
        .await
        .unwrap();

    // 인벤토리 페이지 수는 지급된 아이템에 따라 다르므로 순서만 확인
    let mut order = Vec::new();
    loop {
        let message = client.recv_timeout(WAIT).await.unwrap();
        let done = matches!(message, GameServerMessage::ServerChannelList(_));
        match message {
            GameServerMessage::ServerPlayerInventory(_) => {}
            other => order.push(other.name()),
        }
        if done {
            break;
        }
    }
    assert_eq!(
        order,
        vec![
            "ServerPlayerData",
            "ServerCharData",
            "ServerAchievementProgress",
            "ServerMessageConnect",
            "ServerChannelList",
        ]
    );

    client.send(ClientMultiplayerJoin {}).await.unwrap();
    assert!(matches!(
        client.recv_timeout(WAIT).await.unwrap(),
        GameServerMessage::ServerUserCensus(ServerUserCensus {
            census: UserCensus::ListSet { .. }
        })
    ));
    assert!(matches!(
        client.recv_timeout(WAIT).await.unwrap(),
        GameServerMessage::ServerRoomList(ServerRoomList {
            update: RoomListUpdate::ListSet { .. }
        })
    ));
    assert!(matches!(
        client.recv_timeout(WAIT).await.unwrap(),
        GameServerMessage::ServerMultiplayerJoined(_)
    ));

    assert_eq!(cluster.manager.game_server().unwrap().online_count(), 1);
    cluster.stop().await;
}

#[tokio::test]
async fn test_room_create_and_join() {
    let cluster = Cluster::start().await;
    let mut a = cluster.enter_lobby("alice").await;
    let mut b = cluster.enter_lobby("bob").await;

    a.client.send(create_request("t")).await.unwrap();
    match a
        .client
        .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomJoin(_)))
        .await
        .unwrap()
    {
        GameServerMessage::ServerRoomJoin(join) => {
            assert_eq!(join.status, 0);
            assert_eq!(join.room_number, 0);
        }
        _ => unreachable!(),
    }
    // 로비 알림이 사이에 끼어들 수 있으므로 방 메시지만 골라서 확인
    match a
        .client
        .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomStatus(_)))
        .await
        .unwrap()
    {
        GameServerMessage::ServerRoomStatus(status) => assert_eq!(status.course, 10),
        _ => unreachable!(),
    }
    let census = a
        .client
        .recv_until(WAIT, |m| room_census_ids(m).is_some())
        .await
        .unwrap();
    assert_eq!(room_census_ids(&census).unwrap(), vec![a.conn_id]);

    // 로비의 bob은 방 추가 알림을 받음
    match b
        .client
        .recv_until(WAIT, |m| {
            matches!(
                m,
                GameServerMessage::ServerRoomList(ServerRoomList {
                    update: RoomListUpdate::Add { .. }
                })
            )
        })
        .await
        .unwrap()
    {
        GameServerMessage::ServerRoomList(ServerRoomList {
            update: RoomListUpdate::Add { room },
        }) => assert_eq!(room.name.as_str(), "t"),
        _ => unreachable!(),
    }

    b.client
        .send(ClientRoomJoin {
            room_number: 0,
            password: String::new(),
        })
        .await
        .unwrap();
    let expected = vec![a.conn_id, b.conn_id];
    for player in [&mut a, &mut b] {
        player
            .client
            .recv_until(WAIT, |m| room_census_ids(m).as_ref() == Some(&expected))
            .await
            .unwrap();
    }

    let snapshot = cluster.room_snapshot(0).await;
    let members: Vec<u32> = snapshot.players.iter().map(|p| p.conn_id).collect();
    assert_eq!(members, expected);
    assert_eq!(snapshot.owner_conn_id, a.conn_id);
    assert!(snapshot.players[0].has_flag(status_flags::MASTER));

    cluster.stop().await;
}

#[tokio::test]
async fn test_owner_only_settings() {
    let cluster = Cluster::start().await;
    let mut watcher = cluster.enter_lobby("watcher").await;
    let mut players = room_of(&cluster, &["alice", "bob"]).await;

    // 방장이 아닌 bob의 변경은 무시
    players[1]
        .client
        .send(ClientRoomEdit {
            room_number: 0,
            changes: vec![RoomSettingsChange::Course { course: 11 }].into(),
        })
        .await
        .unwrap();
    players[1]
        .client
        .send(ClientRoomInfo { room_number: 0 })
        .await
        .unwrap();
    players[1]
        .client
        .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomInfoResponse(_)))
        .await
        .unwrap();
    assert_eq!(cluster.room_snapshot(0).await.settings.course, 10);
    assert!(players[0]
        .client
        .recv_until(QUIET, |m| matches!(m, GameServerMessage::ServerRoomStatus(_)))
        .await
        .is_err());

    // 방장 alice의 변경은 방 전체와 로비에 전파
    players[0]
        .client
        .send(ClientRoomEdit {
            room_number: 0,
            changes: vec![RoomSettingsChange::Course { course: 11 }].into(),
        })
        .await
        .unwrap();
    for player in players.iter_mut() {
        match player
            .client
            .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomStatus(_)))
            .await
            .unwrap()
        {
            GameServerMessage::ServerRoomStatus(status) => assert_eq!(status.course, 11),
            _ => unreachable!(),
        }
    }
    match watcher
        .client
        .recv_until(WAIT, |m| match m {
            GameServerMessage::ServerRoomList(ServerRoomList {
                update: RoomListUpdate::Change { room },
            }) => room.course == 11,
            _ => false,
        })
        .await
        .unwrap()
    {
        GameServerMessage::ServerRoomList(ServerRoomList {
            update: RoomListUpdate::Change { room },
        }) => assert_eq!(room.number, 0),
        _ => unreachable!(),
    }

    cluster.stop().await;
    println!("✅ 방장 전용 설정 테스트 통과");
}

#[tokio::test]
async fn test_turn_progression() {
    let cluster = Cluster::start().await;
    let mut players = room_of(&cluster, &["alice", "bob"]).await;
    let (a_conn, b_conn) = (players[0].conn_id, players[1].conn_id);

    for player in players.iter_mut() {
        player.client.send(ClientPlayerReady { state: 0 }).await.unwrap();
    }
    players[0].client.send(ClientPlayerStartGame {}).await.unwrap();
    for player in players.iter_mut() {
        player
            .client
            .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomGameData(_)))
            .await
            .unwrap();
    }

    for player in players.iter_mut() {
        player
            .client
            .send(ClientLoadProgress { progress: 100 })
            .await
            .unwrap();
        player.client.send(ClientReadyStartHole {}).await.unwrap();
    }
    for player in players.iter_mut() {
        match player
            .client
            .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomStartHole(_)))
            .await
            .unwrap()
        {
            GameServerMessage::ServerRoomStartHole(start) => assert_eq!(start.conn_id, a_conn),
            _ => unreachable!(),
        }
    }

    // alice의 샷
    let shooter = &mut players[0].client;
    shooter.send(ClientShotRotate { angle: 0.5 }).await.unwrap();
    shooter.send(ClientShotPower { level: 2 }).await.unwrap();
    shooter
        .send(ClientShotCommit {
            data: Default::default(),
        })
        .await
        .unwrap();

    let sync = ShotSyncData {
        active_conn_id: a_conn,
        x: 1.0,
        y: 2.0,
        z: 3.0,
        ..Default::default()
    };
    for player in players.iter_mut() {
        player
            .client
            .send(ClientShotSync { data: sync.clone() })
            .await
            .unwrap();
    }

    players[0]
        .client
        .send(ClientRoomSync { unknown: 0 })
        .await
        .unwrap();
    assert!(players[0]
        .client
        .recv_until(QUIET, |m| matches!(m, GameServerMessage::ServerRoomShotEnd(_)))
        .await
        .is_err());

    players[1]
        .client
        .send(ClientRoomSync { unknown: 0 })
        .await
        .unwrap();
    for player in players.iter_mut() {
        match player
            .client
            .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomShotEnd(_)))
            .await
            .unwrap()
        {
            GameServerMessage::ServerRoomShotEnd(end) => assert_eq!(end.conn_id, a_conn),
            _ => unreachable!(),
        }
        match player.client.recv_timeout(WAIT).await.unwrap() {
            GameServerMessage::ServerRoomActiveUserAnnounce(next) => {
                assert_eq!(next.conn_id, b_conn)
            }
            other => panic!("다음 타자 알림이 아님: {:?}", other),
        }
    }

    cluster.stop().await;
    println!("✅ 턴 진행 테스트 통과");
}

#[tokio::test]
async fn test_ownership_transfer_on_leave() {
    let cluster = Cluster::start().await;
    let mut watcher = cluster.enter_lobby("watcher").await;
    let mut players = room_of(&cluster, &["alice", "bob", "carol"]).await;
    let b_conn = players[1].conn_id;
    watcher
        .client
        .recv_until(WAIT, |m| match m {
            GameServerMessage::ServerRoomList(ServerRoomList {
                update: RoomListUpdate::Change { room },
            }) => room.num_users == 3,
            _ => false,
        })
        .await
        .unwrap();

    players[0]
        .client
        .send(ClientRoomLeave {
            unknown: 0,
            room_number: 0,
        })
        .await
        .unwrap();
    players[0]
        .client
        .recv_until(WAIT, |m| matches!(m, GameServerMessage::ServerRoomLeave(_)))
        .await
        .unwrap();

    for player in players.iter_mut().skip(1) {
        let census = player
            .client
            .recv_until(WAIT, |m| {
                room_census_ids(m).map_or(false, |ids| ids.len() == 2)
            })
            .await
            .unwrap();
        match census {
            GameServerMessage::ServerRoomCensus(ServerRoomCensus {
                census: RoomCensus::ListSet { users, .. },
            }) => {
                assert_eq!(users[0].conn_id, b_conn);
                assert!(users[0].has_flag(status_flags::MASTER));
                assert!(!users[1].has_flag(status_flags::MASTER));
            }
            _ => unreachable!(),
        }
    }

    assert_eq!(cluster.room_snapshot(0).await.owner_conn_id, b_conn);
    match watcher
        .client
        .recv_until(WAIT, |m| match m {
            GameServerMessage::ServerRoomList(ServerRoomList {
                update: RoomListUpdate::Change { room },
            }) => room.num_users == 2,
            _ => false,
        })
        .await
        .unwrap()
    {
        GameServerMessage::ServerRoomList(ServerRoomList {
            update: RoomListUpdate::Change { room },
        }) => assert_eq!(room.number, 0),
        _ => unreachable!(),
    }

    cluster.stop().await;
    println!("✅ 방장 위임 테스트 통과");
}

#[tokio::test]
async fn test_expired_session_rejected() {
    let config = GameCenterConfigBuilder::new(ServerConfig {
        session_ttl_secs: 1,
        ..Default::default()
    })
    .unwrap()
    .ephemeral()
    .build()
    .unwrap();
    let manager = Arc::new(ServerManager::from_config(config, MIN_COST).unwrap());
    let addrs = manager.start_all().await.unwrap();
    let cluster = Cluster { manager, addrs };

    let login = cluster.login("alice").await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let mut client = cluster.connect_game().await;
    client
        .send(ClientAuth {
            username: login.username.clone(),
            player_id: login.player_id,
            login_key: login.key.clone(),
            version: "824.00".into(),
        })
        .await
        .unwrap();
    assert!(matches!(
        client.recv_timeout(WAIT).await.unwrap(),
        GameServerMessage::ServerAuthError(_)
    ));

    cluster.stop().await;
}

#[tokio::test]
async fn test_stop_and_restart() {
    let cluster = Cluster::start().await;
    assert!(cluster.manager.is_running());
    let _player = cluster.enter_game("alice").await;

    tokio_test::assert_ok!(cluster.manager.stop_all().await);
    assert!(!cluster.manager.is_running());
    assert_eq!(cluster.manager.bound_addrs(), BoundAddrs::default());

    // 두 번째 중지는 경고만
    tokio_test::assert_ok!(cluster.manager.stop_all().await);

    let addrs = cluster.manager.start_all().await.unwrap();
    assert!(addrs.login.is_some() && addrs.game.is_some() && addrs.message.is_some());
    cluster.manager.stop_all().await.unwrap();
}
