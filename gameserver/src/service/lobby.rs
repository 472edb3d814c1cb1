//! 로비 액터
//!
//! 멀티플레이 로비의 인원 목록과 방 목록을 관리합니다. 로비 알림은 방에 들어가
//! 있지 않은 플레이어(`room_number == -1`)에게만 보냅니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shared::protocol::game::{
    GlobalEvent, LobbyPlayerEntry, RoomListEntry, RoomListUpdate, ServerEvent,
    ServerMultiplayerJoined, ServerMultiplayerLeft, ServerRoomList, ServerUserCensus, UserCensus,
};
use shared::protocol::GameServerMessage;
use shared::tool::error::{ActorError, RoomError};

use super::broadcast::{broadcast, send_to};
use super::room::{RoomActor, RoomHandle, RoomJoinRequest, RoomSettings};
use super::room_storage::RoomStorage;
use crate::actor::{mailbox, run_actor, Actor, ActorHandle, Flow, Promise, DEFAULT_MAILBOX_CAPACITY};
use crate::GameSender;

/// 인원 목록 한 페이지의 최대 항목 수
pub const CENSUS_PAGE_SIZE: usize = 36;

/// 로비 액터가 받는 메시지
#[derive(Debug)]
pub enum LobbyEvent {
    PlayerJoin { entry: LobbyPlayerEntry, conn: GameSender },
    PlayerLeave { conn_id: u32, notify: bool },
    PlayerUpdate { entry: LobbyPlayerEntry },
    PlayerUpdateRoom { conn_id: u32, room_number: i16 },
    RoomCreate { settings: RoomSettings, creator: RoomJoinRequest },
    RoomUpdate { entry: RoomListEntry },
    RoomRemove { number: i16 },
    Chat { nickname: String, message: String },
    /// 현재 로비 인원 조회
    Census,
    /// 현재 방 목록 조회
    RoomList,
}

#[derive(Debug, Clone)]
pub enum LobbyReply {
    Done,
    Room(RoomHandle),
    Players(Vec<LobbyPlayerEntry>),
    Rooms(Vec<RoomListEntry>),
}

pub type LobbyResult = Result<LobbyReply, RoomError>;

/// 로비 핸들
#[derive(Debug, Clone)]
pub struct LobbyHandle {
    actor: ActorHandle<LobbyEvent, LobbyResult>,
    rooms: Arc<RoomStorage<RoomHandle>>,
}

impl LobbyHandle {
    /// 요청을 보내고 처리 결과를 기다림
    pub async fn request(&self, event: LobbyEvent) -> LobbyResult {
        self.actor.send(event).await?
    }

    pub async fn notify(&self, event: LobbyEvent) -> Result<(), ActorError> {
        self.actor.send_async(event).await
    }

    /// 방 번호로 활성 방 조회 (메일박스를 거치지 않음)
    pub fn get_room(&self, number: i16) -> Option<RoomHandle> {
        self.rooms.get_room(number).filter(|room| !room.is_closed())
    }

    pub fn active_room_count(&self) -> usize {
        self.rooms.active_count()
    }

    pub async fn join(&self, entry: LobbyPlayerEntry, conn: GameSender) -> Result<(), RoomError> {
        self.request(LobbyEvent::PlayerJoin { entry, conn }).await?;
        Ok(())
    }

    pub async fn leave(&self, conn_id: u32, notify: bool) -> Result<(), RoomError> {
        self.request(LobbyEvent::PlayerLeave { conn_id, notify })
            .await?;
        Ok(())
    }

    /// 로비 인원 정보 갱신 (로비 전체에 변경 알림)
    pub async fn update(&self, entry: LobbyPlayerEntry) -> Result<(), RoomError> {
        self.request(LobbyEvent::PlayerUpdate { entry }).await?;
        Ok(())
    }

    /// 방 생성 (생성자는 방 액터가 시작하면서 바로 입장)
    pub async fn create_room(
        &self,
        settings: RoomSettings,
        creator: RoomJoinRequest,
    ) -> Result<RoomHandle, RoomError> {
        match self
            .request(LobbyEvent::RoomCreate { settings, creator })
            .await?
        {
            LobbyReply::Room(room) => Ok(room),
            _ => Err(RoomError::Actor(ActorError::Closed)),
        }
    }

    pub async fn players(&self) -> Result<Vec<LobbyPlayerEntry>, RoomError> {
        match self.request(LobbyEvent::Census).await? {
            LobbyReply::Players(players) => Ok(players),
            _ => Err(RoomError::Actor(ActorError::Closed)),
        }
    }

    pub async fn room_list(&self) -> Result<Vec<RoomListEntry>, RoomError> {
        match self.request(LobbyEvent::RoomList).await? {
            LobbyReply::Rooms(rooms) => Ok(rooms),
            _ => Err(RoomError::Actor(ActorError::Closed)),
        }
    }
}

struct LobbyMember {
    entry: LobbyPlayerEntry,
    conn: GameSender,
}

/// 로비 액터
pub struct LobbyActor {
    /// 입장 순서대로 유지
    players: Vec<LobbyMember>,
    rooms: Arc<RoomStorage<RoomHandle>>,
    room_entries: BTreeMap<i16, RoomListEntry>,
    handle: LobbyHandle,
    token: CancellationToken,
    room_mailbox_capacity: usize,
}

impl LobbyActor {
    /// 로비 액터 시작
    ///
    /// 방 액터는 모두 `token`의 자식 토큰으로 실행됩니다.
    pub fn spawn(token: CancellationToken) -> (LobbyHandle, JoinHandle<()>) {
        let (actor, mailbox) = mailbox(DEFAULT_MAILBOX_CAPACITY);
        let handle = LobbyHandle {
            actor,
            rooms: Arc::new(RoomStorage::new()),
        };
        let lobby = LobbyActor {
            players: Vec::new(),
            rooms: handle.rooms.clone(),
            room_entries: BTreeMap::new(),
            handle: handle.clone(),
            token: token.clone(),
            room_mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        };
        let task = tokio::spawn(run_actor(lobby, mailbox, token));
        (handle, task)
    }

    fn in_lobby_area(&self) -> impl Iterator<Item = &GameSender> {
        self.players
            .iter()
            .filter(|m| m.entry.room_number == -1)
            .map(|m| &m.conn)
    }

    async fn broadcast(&self, message: impl Into<GameServerMessage>) {
        let message = message.into();
        broadcast(self.in_lobby_area(), &message, "Lobby").await;
    }

    fn position(&self, conn_id: u32) -> Option<usize> {
        self.players.iter().position(|m| m.entry.conn_id == conn_id)
    }

    /// 인원 목록 전체와 방 목록 전송
    async fn send_lobby_state(&self, conn: &GameSender) {
        let entries: Vec<LobbyPlayerEntry> = self.players.iter().map(|m| m.entry.clone()).collect();
        for (page, chunk) in census_pages(&entries).into_iter().enumerate() {
            let census = if page == 0 {
                UserCensus::ListSet { users: chunk.into() }
            } else {
                UserCensus::ListAppend { users: chunk.into() }
            };
            send_to(conn, ServerUserCensus { census }, "Lobby").await;
        }

        let rooms: Vec<RoomListEntry> = self.room_entries.values().cloned().collect();
        send_to(
            conn,
            ServerRoomList {
                update: RoomListUpdate::ListSet { rooms: rooms.into() },
            },
            "Lobby",
        )
        .await;
    }

    async fn player_join(&mut self, entry: LobbyPlayerEntry, conn: GameSender) {
        let conn_id = entry.conn_id;
        if let Some(index) = self.position(conn_id) {
            debug!(conn_id, "이미 로비에 있는 플레이어 재입장");
            self.players.remove(index);
        }

        self.broadcast(ServerUserCensus {
            census: UserCensus::Add {
                users: vec![entry.clone()].into(),
            },
        })
        .await;

        info!(conn_id, "로비 입장: {}", entry.nickname.as_str());
        self.players.push(LobbyMember {
            entry,
            conn: conn.clone(),
        });

        self.send_lobby_state(&conn).await;
        send_to(&conn, ServerMultiplayerJoined {}, "Lobby").await;
    }

    async fn player_leave(&mut self, conn_id: u32, notify: bool) {
        let Some(index) = self.position(conn_id) else {
            return;
        };
        let member = self.players.remove(index);
        info!(conn_id, "로비 퇴장");

        self.broadcast(ServerUserCensus {
            census: UserCensus::Remove { conn_id },
        })
        .await;
        if notify {
            send_to(&member.conn, ServerMultiplayerLeft {}, "Lobby").await;
        }
    }

    async fn broadcast_change(&self, index: usize) {
        self.broadcast(ServerUserCensus {
            census: UserCensus::Change {
                users: vec![self.players[index].entry.clone()].into(),
            },
        })
        .await;
    }

    async fn player_update(&mut self, entry: LobbyPlayerEntry) {
        let Some(index) = self.position(entry.conn_id) else {
            return;
        };
        self.players[index].entry = entry;
        self.broadcast_change(index).await;
    }

    async fn player_update_room(&mut self, conn_id: u32, room_number: i16) {
        let Some(index) = self.position(conn_id) else {
            return;
        };
        let previous = self.players[index].entry.room_number;
        self.players[index].entry.room_number = room_number;

        if previous != -1 && room_number == -1 {
            let conn = self.players[index].conn.clone();
            self.send_lobby_state(&conn).await;
        }
        self.broadcast_change(index).await;
    }

    async fn room_create(
        &mut self,
        settings: RoomSettings,
        mut creator: RoomJoinRequest,
    ) -> LobbyResult {
        let settings = settings.normalized();
        creator.password = settings.password.clone();

        let lobby = self.handle.clone();
        let token = self.token.child_token();
        let capacity = self.room_mailbox_capacity;
        let room_settings = settings.clone();
        let created = self.rooms.new_room(move |number| {
            RoomActor::new(number, room_settings, lobby, Some(creator)).spawn(capacity, token)
        });

        let Some((number, room)) = created else {
            warn!("방 번호를 모두 사용했습니다");
            return Err(RoomError::Full(-1));
        };

        let entry = settings.list_entry(number, 1, true);
        info!(room = number, "방 생성: {}", settings.name);
        self.room_entries.insert(number, entry.clone());
        self.broadcast(ServerRoomList {
            update: RoomListUpdate::Add { room: entry },
        })
        .await;
        Ok(LobbyReply::Room(room))
    }

    async fn room_update(&mut self, entry: RoomListEntry) {
        let Some(current) = self.room_entries.get_mut(&entry.number) else {
            debug!(room = entry.number, "없는 방의 갱신 무시");
            return;
        };
        *current = entry.clone();
        self.broadcast(ServerRoomList {
            update: RoomListUpdate::Change { room: entry },
        })
        .await;
    }

    async fn room_remove(&mut self, number: i16) {
        self.rooms.remove_room(number);
        self.room_entries.remove(&number);
        let culled = self.rooms.cull();
        debug!(room = number, culled, "방 제거");

        self.broadcast(ServerRoomList {
            update: RoomListUpdate::Remove {
                room_number: number,
            },
        })
        .await;
    }

    async fn dispatch(&mut self, event: LobbyEvent) -> LobbyResult {
        match event {
            LobbyEvent::PlayerJoin { entry, conn } => self.player_join(entry, conn).await,
            LobbyEvent::PlayerLeave { conn_id, notify } => self.player_leave(conn_id, notify).await,
            LobbyEvent::PlayerUpdate { entry } => self.player_update(entry).await,
            LobbyEvent::PlayerUpdateRoom {
                conn_id,
                room_number,
            } => self.player_update_room(conn_id, room_number).await,
            LobbyEvent::RoomCreate { settings, creator } => {
                return self.room_create(settings, creator).await
            }
            LobbyEvent::RoomUpdate { entry } => self.room_update(entry).await,
            LobbyEvent::RoomRemove { number } => self.room_remove(number).await,
            LobbyEvent::Chat { nickname, message } => {
                self.broadcast(ServerEvent {
                    event: GlobalEvent::ChatMessage { nickname, message },
                })
                .await
            }
            LobbyEvent::Census => {
                return Ok(LobbyReply::Players(
                    self.players.iter().map(|m| m.entry.clone()).collect(),
                ))
            }
            LobbyEvent::RoomList => {
                return Ok(LobbyReply::Rooms(self.room_entries.values().cloned().collect()))
            }
        }
        Ok(LobbyReply::Done)
    }
}

#[async_trait]
impl Actor for LobbyActor {
    type Event = LobbyEvent;
    type Reply = LobbyResult;

    fn name(&self) -> String {
        "Lobby".to_string()
    }

    async fn handle(&mut self, event: LobbyEvent, promise: Promise<LobbyResult>) -> Flow {
        let result = self.dispatch(event).await;
        promise.resolve(result);
        Flow::Continue
    }

    async fn stopped(&mut self) {
        info!(
            "로비 종료 (플레이어 {}명, 방 {}개)",
            self.players.len(),
            self.room_entries.len()
        );
    }
}

/// 인원 목록을 페이지 단위로 분할 (빈 목록도 한 페이지)
pub fn census_pages(entries: &[LobbyPlayerEntry]) -> Vec<Vec<LobbyPlayerEntry>> {
    if entries.is_empty() {
        return vec![Vec::new()];
    }
    entries
        .chunks(CENSUS_PAGE_SIZE)
        .map(|chunk| chunk.to_vec())
        .collect()
}
