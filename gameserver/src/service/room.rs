//! 방 액터
//!
//! 방 하나의 인원, 설정, 게임 단계, 턴 선출, 샷 동기화를 하나의 태스크에서 관리합니다.
//!
//! ```text
//! Lobby ── 방장 시작 ──▶ WaitingLoad ── 전원 로딩 완료 ──▶ InGame
//! InGame ── 마지막 홀 종료 ──▶ Lobby
//! InGame ── 홀 종료 ──▶ InGame (다음 홀)
//! 인원 0명 ──▶ 종료
//! ```

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shared::protocol::common::SystemTime;
use shared::protocol::game::{
    status_flags, ClientRoomCreate, GameInit, GamePlayerSlot, GameResult, GlobalEvent, HoleInfo, RoomCensus,
    RoomListEntry, RoomPlayerEntry, RoomSettingsChange, Server0092, Server009F, Server011F,
    Server0230, Server0231, ServerEvent, ServerPlayerClubChange, ServerPlayerCometRelief,
    ServerPlayerFirstShotReady, ServerPlayerItemUse, ServerPlayerLoadProgress, ServerPlayerPower,
    ServerPlayerReady, ServerPlayerRotate, ServerPlayerShotCommit, ServerPlayerTypingIndicator,
    ServerRoomAction, ServerRoomActiveUserAnnounce, ServerRoomCensus, ServerRoomFinishGame,
    ServerRoomFinishHole, ServerRoomGameData, ServerRoomGameInit, ServerRoomJoin, ServerRoomLeave,
    ServerRoomShotEnd, ServerRoomShotSync, ServerRoomStartHole, ServerRoomStatus,
    ServerRoomWeather, ServerRoomWind, ShotSyncData,
};
use shared::protocol::wire::{List8, Rest};
use shared::protocol::GameServerMessage;
use shared::tool::error::{ActorError, RoomError};

use super::broadcast::{broadcast, send_to};
use super::lobby::{LobbyEvent, LobbyHandle};
use crate::actor::{spawn_actor, Actor, ActorHandle, Flow, Promise};
use crate::GameSender;

/// 라운드 하나의 홀 수
pub const COURSE_HOLES: usize = 18;

/// 홀 시작 정보 프레임 (의미가 알려지지 않은 고정 값)
const HOLE_INFO_0092: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x3f];
const HOLE_INFO_009F: &[u8] = &[0x01, 0x00, 0x00, 0x00];
const HOLE_INFO_011F: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// 방 게임 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Lobby,
    WaitingLoad,
    InGame,
}

/// 방 설정
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomSettings {
    pub name: String,
    pub password: String,
    pub room_type: u8,
    pub course: u8,
    pub num_holes: u8,
    pub hole_progression: u8,
    pub shot_timer_ms: u32,
    pub game_timer_ms: u32,
    pub max_users: u8,
    pub natural_wind: u32,
    pub artifact: u32,
}

impl RoomSettings {
    /// 생성 요청 값 보정 (홀 수 1~18, 최대 인원 1명 이상)
    pub fn normalized(mut self) -> Self {
        self.num_holes = self.num_holes.clamp(1, COURSE_HOLES as u8);
        self.max_users = self.max_users.max(1);
        self
    }

    /// 설정 변경 항목 하나 적용
    ///
    /// 현재 인원보다 작은 최대 인원은 무시하고 `false`를 반환합니다.
    pub fn apply(&mut self, change: &RoomSettingsChange, num_users: usize) -> bool {
        match change {
            RoomSettingsChange::RoomName { name } => self.name = name.clone(),
            RoomSettingsChange::Password { password } => self.password = password.clone(),
            RoomSettingsChange::RoomType { room_type } => self.room_type = *room_type,
            RoomSettingsChange::Course { course } => self.course = *course,
            RoomSettingsChange::NumHoles { num_holes } => {
                self.num_holes = (*num_holes).clamp(1, COURSE_HOLES as u8)
            }
            RoomSettingsChange::HoleProgression { mode } => self.hole_progression = *mode,
            RoomSettingsChange::ShotTimer { seconds } => self.shot_timer_ms = *seconds as u32 * 1000,
            RoomSettingsChange::MaxUsers { max_users } => {
                if (*max_users as usize) < num_users.max(1) {
                    return false;
                }
                self.max_users = *max_users;
            }
            RoomSettingsChange::GameTimer { minutes } => {
                self.game_timer_ms = *minutes as u32 * 60_000
            }
            RoomSettingsChange::Artifact { artifact_id } => self.artifact = *artifact_id,
            RoomSettingsChange::NaturalWind { enabled } => self.natural_wind = *enabled,
        }
        true
    }

    /// 이 설정으로 만든 로비 방 목록 항목
    pub fn list_entry(&self, number: i16, num_users: usize, open: bool) -> RoomListEntry {
        RoomListEntry {
            name: self.name.as_str().into(),
            public: self.password.is_empty() as u8,
            open: open as u8,
            max_users: self.max_users,
            num_users: num_users.min(u8::MAX as usize) as u8,
            number,
            num_holes: self.num_holes,
            room_type: self.room_type,
            course: self.course,
            hole_progression: self.hole_progression,
            shot_timer_ms: self.shot_timer_ms,
            game_timer_ms: self.game_timer_ms,
            natural_wind: self.natural_wind,
            artifact: self.artifact,
        }
    }
}

impl From<&ClientRoomCreate> for RoomSettings {
    fn from(request: &ClientRoomCreate) -> Self {
        RoomSettings {
            name: request.room_name.clone(),
            password: request.password.clone(),
            room_type: request.room_type,
            course: request.course,
            num_holes: request.num_holes,
            hole_progression: request.hole_progression,
            shot_timer_ms: request.shot_timer_ms,
            game_timer_ms: request.game_timer_ms,
            max_users: request.max_users,
            natural_wind: request.natural_wind,
            artifact: request.artifact,
        }
        .normalized()
    }
}

/// 방 입장 요청
#[derive(Debug, Clone)]
pub struct RoomJoinRequest {
    pub entry: RoomPlayerEntry,
    pub conn: GameSender,
    pub password: String,
}

/// 그대로 중계하는 샷 관련 입력
#[derive(Debug, Clone, PartialEq)]
pub enum ShotAction {
    Commit(Rest),
    Rotate(f32),
    Power(u8),
    ClubChange(u8),
    ItemUse(u32),
    Typing(u16),
    CometRelief { x: f32, y: f32, z: f32 },
}

impl ShotAction {
    /// 보낸 플레이어의 `conn_id`를 붙인 방송 메시지
    pub fn to_message(&self, conn_id: u32) -> GameServerMessage {
        match self {
            ShotAction::Commit(data) => ServerPlayerShotCommit {
                conn_id,
                data: data.clone(),
            }
            .into(),
            ShotAction::Rotate(angle) => ServerPlayerRotate {
                conn_id,
                angle: *angle,
            }
            .into(),
            ShotAction::Power(level) => ServerPlayerPower {
                conn_id,
                level: *level,
            }
            .into(),
            ShotAction::ClubChange(club) => ServerPlayerClubChange {
                conn_id,
                club: *club,
            }
            .into(),
            ShotAction::ItemUse(item_type_id) => ServerPlayerItemUse {
                conn_id,
                item_type_id: *item_type_id,
            }
            .into(),
            ShotAction::Typing(status) => ServerPlayerTypingIndicator {
                conn_id,
                status: *status,
            }
            .into(),
            ShotAction::CometRelief { x, y, z } => ServerPlayerCometRelief {
                conn_id,
                x: *x,
                y: *y,
                z: *z,
            }
            .into(),
        }
    }
}

/// 방 액터가 받는 메시지
#[derive(Debug)]
pub enum RoomEvent {
    PlayerJoin(RoomJoinRequest),
    PlayerLeave { conn_id: u32 },
    SettingsChange { conn_id: u32, changes: Vec<RoomSettingsChange> },
    PlayerReady { conn_id: u32, ready: bool },
    PlayerIdle { conn_id: u32, idle: bool },
    PlayerKick { conn_id: u32, kick_conn_id: u32 },
    StartGame { conn_id: u32 },
    LoadingProgress { conn_id: u32, progress: u8 },
    GameReady { conn_id: u32 },
    Shot { conn_id: u32, action: ShotAction },
    ShotSync { conn_id: u32, data: ShotSyncData },
    TurnEnd { conn_id: u32 },
    HoleEnd { conn_id: u32 },
    ActiveUserAcknowledge { conn_id: u32 },
    FirstShotReady { conn_id: u32 },
    RoomAction { conn_id: u32, data: Rest },
    Chat { conn_id: u32, nickname: String, message: String },
    /// 로비 방 목록 항목 조회
    Info,
    /// 현재 상태 조회
    Snapshot,
}

/// 방 액터 응답
#[derive(Debug, Clone)]
pub enum RoomReply {
    Done,
    Info(RoomListEntry),
    Snapshot(RoomSnapshot),
}

pub type RoomResult = Result<RoomReply, RoomError>;

/// 방 상태 스냅샷
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub number: i16,
    pub settings: RoomSettings,
    pub phase: GamePhase,
    pub open: bool,
    pub owner_conn_id: u32,
    pub current_hole: u8,
    pub active_conn_id: u32,
    pub players: Vec<RoomPlayerEntry>,
}

/// 방 액터 핸들
#[derive(Debug, Clone)]
pub struct RoomHandle {
    number: i16,
    actor: ActorHandle<RoomEvent, RoomResult>,
}

impl RoomHandle {
    pub fn number(&self) -> i16 {
        self.number
    }

    /// 요청을 보내고 처리 결과를 기다림
    pub async fn request(&self, event: RoomEvent) -> RoomResult {
        self.actor.send(event).await?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        match self.request(RoomEvent::Snapshot).await? {
            RoomReply::Snapshot(snapshot) => Ok(snapshot),
            _ => Err(RoomError::Actor(ActorError::Closed)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.actor.is_closed()
    }

    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.number == other.number && self.actor.same_actor(&other.actor)
    }
}

#[derive(Debug, Default, Clone)]
struct PlayerGameState {
    game_ready: bool,
    shot_sync: Option<ShotSyncData>,
    turn_end: bool,
    hole_end: bool,
}

struct RoomPlayer {
    entry: RoomPlayerEntry,
    conn: GameSender,
    game: PlayerGameState,
}

/// 방 액터
pub struct RoomActor {
    number: i16,
    settings: RoomSettings,
    open: bool,
    owner_conn_id: u32,
    phase: GamePhase,
    current_hole: u8,
    hole_started: bool,
    active_conn_id: u32,
    shot_sync: Option<ShotSyncData>,
    players: Vec<RoomPlayer>,
    lobby: LobbyHandle,
    creator: Option<RoomJoinRequest>,
}

impl RoomActor {
    pub fn new(
        number: i16,
        settings: RoomSettings,
        lobby: LobbyHandle,
        creator: Option<RoomJoinRequest>,
    ) -> Self {
        Self {
            number,
            settings: settings.normalized(),
            open: true,
            owner_conn_id: 0,
            phase: GamePhase::Lobby,
            current_hole: 0,
            hole_started: false,
            active_conn_id: 0,
            shot_sync: None,
            players: Vec::new(),
            lobby,
            creator,
        }
    }

    /// 방 액터 시작
    pub fn spawn(self, capacity: usize, token: CancellationToken) -> RoomHandle {
        let number = self.number;
        let (actor, _task) = spawn_actor(self, capacity, token);
        RoomHandle { number, actor }
    }

    /// 로비 방 목록 항목
    pub fn list_entry(&self) -> RoomListEntry {
        self.settings
            .list_entry(self.number, self.players.len(), self.open)
    }

    fn status(&self) -> ServerRoomStatus {
        ServerRoomStatus {
            room_type: self.settings.room_type,
            course: self.settings.course,
            num_holes: self.settings.num_holes,
            hole_progression: self.settings.hole_progression,
            natural_wind: self.settings.natural_wind,
            max_users: self.settings.max_users,
            shot_timer_ms: self.settings.shot_timer_ms,
            game_timer_ms: self.settings.game_timer_ms,
            artifact: self.settings.artifact,
            room_name: self.settings.name.clone(),
            has_password: !self.settings.password.is_empty() as u8,
        }
    }

    fn census(&self) -> ServerRoomCensus {
        ServerRoomCensus {
            census: RoomCensus::ListSet {
                users: self.players.iter().map(|p| p.entry.clone()).collect::<Vec<_>>().into(),
                unknown: -1,
            },
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            number: self.number,
            settings: self.settings.clone(),
            phase: self.phase,
            open: self.open,
            owner_conn_id: self.owner_conn_id,
            current_hole: self.current_hole,
            active_conn_id: self.active_conn_id,
            players: self.players.iter().map(|p| p.entry.clone()).collect(),
        }
    }

    fn context(&self) -> String {
        format!("Room#{}", self.number)
    }

    fn index_of(&self, conn_id: u32) -> Result<usize, RoomError> {
        self.players
            .iter()
            .position(|p| p.entry.conn_id == conn_id)
            .ok_or(RoomError::NotInRoom)
    }

    fn require_owner(&self, conn_id: u32) -> Result<(), RoomError> {
        self.index_of(conn_id)?;
        if conn_id != self.owner_conn_id {
            return Err(RoomError::NotOwner);
        }
        Ok(())
    }

    async fn broadcast(&self, message: impl Into<GameServerMessage>) {
        let message = message.into();
        broadcast(self.players.iter().map(|p| &p.conn), &message, &self.context()).await;
    }

    async fn notify_lobby(&self, event: LobbyEvent) {
        if let Err(e) = self.lobby.notify(event).await {
            debug!(room = self.number, "로비 알림 실패: {}", e);
        }
    }

    async fn notify_lobby_room(&self) {
        self.notify_lobby(LobbyEvent::RoomUpdate {
            entry: self.list_entry(),
        })
        .await;
    }

    fn lowest_free_slot(&self) -> u8 {
        (1..=u8::MAX)
            .find(|slot| !self.players.iter().any(|p| p.entry.slot == *slot))
            .unwrap_or(u8::MAX)
    }

    async fn join(&mut self, request: RoomJoinRequest) -> RoomResult {
        let RoomJoinRequest {
            mut entry,
            conn,
            password,
        } = request;

        if self.players.iter().any(|p| p.entry.conn_id == entry.conn_id) {
            return Ok(RoomReply::Done);
        }
        if self.players.len() >= self.settings.max_users as usize {
            return Err(RoomError::Full(self.number));
        }
        if self.phase != GamePhase::Lobby {
            return Err(RoomError::InGame(self.number));
        }
        if !self.settings.password.is_empty() && password != self.settings.password {
            return Err(RoomError::WrongPassword(self.number));
        }

        entry.status_flags = 0;
        entry.slot = self.lowest_free_slot();
        if self.players.is_empty() {
            entry.set_flag(status_flags::MASTER, true);
            self.owner_conn_id = entry.conn_id;
        }
        let conn_id = entry.conn_id;
        info!(room = self.number, conn_id, "방 입장: {}", entry.nickname.as_str());

        self.players.push(RoomPlayer {
            entry,
            conn: conn.clone(),
            game: PlayerGameState::default(),
        });

        let context = self.context();
        send_to(
            &conn,
            ServerRoomJoin {
                status: 0,
                room_name: self.settings.name.clone(),
                room_number: self.number,
            },
            &context,
        )
        .await;
        send_to(&conn, self.status(), &context).await;
        self.broadcast(self.census()).await;

        self.notify_lobby(LobbyEvent::PlayerUpdateRoom {
            conn_id,
            room_number: self.number,
        })
        .await;
        self.notify_lobby_room().await;
        Ok(RoomReply::Done)
    }

    async fn leave(&mut self, conn_id: u32) -> RoomResult {
        let index = self.index_of(conn_id)?;
        let was_active = self.phase == GamePhase::InGame
            && self.hole_started
            && self.active_conn_id == conn_id;
        let leaver = self.players.remove(index);
        info!(room = self.number, conn_id, "방 퇴장");

        send_to(
            &leaver.conn,
            ServerRoomLeave { room_number: -1 },
            &self.context(),
        )
        .await;
        self.notify_lobby(LobbyEvent::PlayerUpdateRoom {
            conn_id,
            room_number: -1,
        })
        .await;

        if self.players.is_empty() {
            return Ok(RoomReply::Done);
        }

        self.broadcast(ServerRoomCensus {
            census: RoomCensus::ListRemove { conn_id },
        })
        .await;

        if conn_id == self.owner_conn_id {
            let heir = &mut self.players[0];
            heir.entry.set_flag(status_flags::MASTER, true);
            self.owner_conn_id = heir.entry.conn_id;
            info!(room = self.number, "방장 변경: {}", self.owner_conn_id);
            self.broadcast(self.census()).await;
        }
        self.notify_lobby_room().await;

        self.reevaluate_after_leave(conn_id, index, was_active).await;
        Ok(RoomReply::Done)
    }

    /// 퇴장으로 인원이 줄어든 뒤 대기 중인 집계 다시 확인
    ///
    /// 나간 사람이 현재 타자였고 남은 인원이 모두 턴을 마쳤다면 그 턴을 먼저 끝낸 뒤
    /// `index`(나간 자리)부터 다음 타자를 뽑습니다.
    async fn reevaluate_after_leave(&mut self, conn_id: u32, index: usize, was_active: bool) {
        match self.phase {
            GamePhase::Lobby => {}
            GamePhase::WaitingLoad => self.start_if_all_ready().await,
            GamePhase::InGame if !self.hole_started => self.start_if_all_ready().await,
            GamePhase::InGame => {
                self.flush_shot_sync_if_complete().await;
                let turn_complete = self.players.iter().all(|p| p.game.turn_end);

                if was_active {
                    if turn_complete {
                        self.broadcast(ServerRoomShotEnd { conn_id }).await;
                        for player in &mut self.players {
                            player.game.turn_end = false;
                        }
                    }
                    self.elect_from(index).await;
                } else if turn_complete {
                    self.end_turn().await;
                }
            }
        }
    }

    /// `start` 자리부터 홀을 끝내지 않은 첫 플레이어를 타자로 지정
    async fn elect_from(&mut self, start: usize) {
        let n = self.players.len();
        let next = (0..n)
            .map(|k| &self.players[(start + k) % n])
            .find(|p| !p.game.hole_end)
            .map(|p| p.entry.conn_id);
        match next {
            Some(next) => {
                self.active_conn_id = next;
                debug!(room = self.number, "다음 타자: {}", next);
                self.broadcast(ServerRoomActiveUserAnnounce { conn_id: next })
                    .await;
            }
            None => self.finish_hole().await,
        }
    }

    async fn change_settings(&mut self, conn_id: u32, changes: Vec<RoomSettingsChange>) -> RoomResult {
        if let Err(e) = self.require_owner(conn_id) {
            debug!(room = self.number, conn_id, "방장이 아닌 설정 변경 무시");
            return Err(e);
        }

        let num_users = self.players.len();
        for change in &changes {
            if !self.settings.apply(change, num_users) {
                debug!(room = self.number, "무시된 설정 변경: {:?}", change);
            }
        }
        self.broadcast(self.status()).await;
        self.notify_lobby_room().await;
        Ok(RoomReply::Done)
    }

    async fn set_ready(&mut self, conn_id: u32, ready: bool) -> RoomResult {
        let index = self.index_of(conn_id)?;
        self.players[index].entry.set_flag(status_flags::READY, ready);
        // 준비 완료가 0
        self.broadcast(ServerPlayerReady {
            conn_id,
            state: if ready { 0 } else { 1 },
        })
        .await;
        Ok(RoomReply::Done)
    }

    async fn set_idle(&mut self, conn_id: u32, idle: bool) -> RoomResult {
        let index = self.index_of(conn_id)?;
        self.players[index].entry.set_flag(status_flags::AWAY, idle);
        self.broadcast(self.census()).await;
        Ok(RoomReply::Done)
    }

    async fn kick(&mut self, conn_id: u32, kick_conn_id: u32) -> RoomResult {
        self.require_owner(conn_id)?;
        info!(room = self.number, "강퇴: {} (방장 {})", kick_conn_id, conn_id);
        self.leave(kick_conn_id).await
    }

    async fn start_game(&mut self, conn_id: u32) -> RoomResult {
        self.require_owner(conn_id)?;
        if self.phase != GamePhase::Lobby {
            return Err(RoomError::InGame(self.number));
        }

        self.open = false;
        self.phase = GamePhase::WaitingLoad;
        self.current_hole = 1;
        self.hole_started = false;
        self.shot_sync = None;
        for player in &mut self.players {
            player.game = PlayerGameState::default();
        }
        info!(room = self.number, "게임 시작 ({}명)", self.players.len());

        self.broadcast(Server0230 {}).await;
        self.broadcast(Server0231 {}).await;

        let start_time = SystemTime::now();
        let slots: Vec<GamePlayerSlot> = self
            .players
            .iter()
            .map(|p| GamePlayerSlot {
                slot: p.entry.slot,
                conn_id: p.entry.conn_id,
                start_time: start_time.clone(),
            })
            .collect();
        self.broadcast(ServerRoomGameInit {
            init: GameInit::Full {
                players: slots.into(),
            },
        })
        .await;

        let random_seed: u32 = rand::random();
        self.broadcast(ServerRoomGameData {
            course: self.settings.course,
            hole_progression: self.settings.hole_progression,
            num_holes: self.settings.num_holes,
            shot_timer_ms: self.settings.shot_timer_ms,
            game_timer_ms: self.settings.game_timer_ms,
            holes: generate_holes(random_seed, self.settings.course),
            random_seed,
            ..Default::default()
        })
        .await;

        self.notify_lobby_room().await;
        Ok(RoomReply::Done)
    }

    async fn game_ready(&mut self, conn_id: u32) -> RoomResult {
        let index = self.index_of(conn_id)?;
        let waiting = match self.phase {
            GamePhase::WaitingLoad => true,
            GamePhase::InGame => !self.hole_started,
            GamePhase::Lobby => false,
        };
        if !waiting {
            debug!(room = self.number, conn_id, "홀 진행 중 준비 완료 무시");
            return Ok(RoomReply::Done);
        }

        self.players[index].game.game_ready = true;
        self.start_if_all_ready().await;
        Ok(RoomReply::Done)
    }

    async fn start_if_all_ready(&mut self) {
        if !self.players.iter().all(|p| p.game.game_ready) {
            return;
        }
        if self.phase == GamePhase::WaitingLoad {
            self.phase = GamePhase::InGame;
        }
        self.start_hole().await;
    }

    async fn start_hole(&mut self) {
        self.hole_started = true;
        self.shot_sync = None;
        for player in &mut self.players {
            player.game.turn_end = false;
            player.game.hole_end = false;
            player.game.shot_sync = None;
        }

        let (wind, heading) = {
            let mut rng = rand::thread_rng();
            let wind = if self.settings.natural_wind != 0 {
                rng.gen_range(0..4)
            } else {
                rng.gen_range(0..9)
            };
            (wind, rng.gen_range(0..360))
        };

        // 턴 순서: 남아 있는 플레이어 중 가장 먼저 들어온 사람
        self.active_conn_id = self.players[0].entry.conn_id;
        info!(
            room = self.number,
            hole = self.current_hole,
            "홀 시작, 첫 타자 {}", self.active_conn_id
        );

        self.broadcast(ServerRoomWeather { weather: 0 }).await;
        self.broadcast(ServerRoomWind {
            wind,
            unknown: 0,
            heading,
            reset: 1,
        })
        .await;
        self.broadcast(ServerRoomStartHole {
            conn_id: self.active_conn_id,
        })
        .await;
        self.broadcast(Server0092 {
            data: Rest::from(HOLE_INFO_0092),
        })
        .await;
        self.broadcast(Server009F {
            data: Rest::from(HOLE_INFO_009F),
        })
        .await;
        self.broadcast(Server011F {
            data: Rest::from(HOLE_INFO_011F),
        })
        .await;
    }

    async fn shot_sync(&mut self, conn_id: u32, data: ShotSyncData) -> RoomResult {
        let index = self.index_of(conn_id)?;
        match &self.shot_sync {
            None => self.shot_sync = Some(data.clone()),
            Some(expected) if *expected != data => {
                warn!(room = self.number, conn_id, "샷 동기화 불일치: {:?} / {:?}", expected, data);
            }
            Some(_) => {}
        }
        self.players[index].game.shot_sync = Some(data);
        self.flush_shot_sync_if_complete().await;
        Ok(RoomReply::Done)
    }

    async fn flush_shot_sync_if_complete(&mut self) {
        if self.shot_sync.is_none() || !self.players.iter().all(|p| p.game.shot_sync.is_some()) {
            return;
        }
        if let Some(data) = self.shot_sync.take() {
            for player in &mut self.players {
                player.game.shot_sync = None;
            }
            self.broadcast(ServerRoomShotSync { data }).await;
        }
    }

    async fn turn_end(&mut self, conn_id: u32) -> RoomResult {
        let index = self.index_of(conn_id)?;
        if self.phase != GamePhase::InGame || !self.hole_started {
            debug!(room = self.number, conn_id, "게임 중이 아닌 턴 종료 무시");
            return Ok(RoomReply::Done);
        }
        self.players[index].game.turn_end = true;
        if self.players.iter().all(|p| p.game.turn_end) {
            self.end_turn().await;
        }
        Ok(RoomReply::Done)
    }

    /// 현재 타자 다음 순서 중 홀을 끝내지 않은 플레이어 (한 바퀴 돌아 자기 자신 포함)
    fn next_active(&self) -> Option<u32> {
        let n = self.players.len();
        let current = self
            .players
            .iter()
            .position(|p| p.entry.conn_id == self.active_conn_id)
            .unwrap_or(n.saturating_sub(1));
        (1..=n)
            .map(|k| &self.players[(current + k) % n])
            .find(|p| !p.game.hole_end)
            .map(|p| p.entry.conn_id)
    }

    async fn end_turn(&mut self) {
        self.broadcast(ServerRoomShotEnd {
            conn_id: self.active_conn_id,
        })
        .await;
        for player in &mut self.players {
            player.game.turn_end = false;
        }

        match self.next_active() {
            Some(next) => {
                self.active_conn_id = next;
                debug!(room = self.number, "다음 타자: {}", next);
                self.broadcast(ServerRoomActiveUserAnnounce { conn_id: next })
                    .await;
            }
            None => self.finish_hole().await,
        }
    }

    async fn finish_hole(&mut self) {
        if self.current_hole >= self.settings.num_holes {
            self.finish_game().await;
            return;
        }

        info!(room = self.number, hole = self.current_hole, "홀 종료");
        self.broadcast(ServerRoomFinishHole {}).await;
        for player in &mut self.players {
            player.game = PlayerGameState::default();
        }
        self.hole_started = false;
        self.current_hole += 1;
    }

    async fn finish_game(&mut self) {
        info!(room = self.number, "라운드 종료");
        for player in &self.players {
            self.broadcast(ServerEvent {
                event: GlobalEvent::GameEnd {
                    nickname: player.entry.nickname.as_str().to_string(),
                    score: 0,
                    pang: 0,
                },
            })
            .await;
        }

        // 임시 순위: 입장 순서
        let results: Vec<GameResult> = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| GameResult {
                conn_id: p.entry.conn_id,
                place: (i + 1).min(u8::MAX as usize) as u8,
                ..Default::default()
            })
            .collect();
        self.broadcast(ServerRoomFinishGame {
            results: List8(results),
        })
        .await;

        self.phase = GamePhase::Lobby;
        self.open = true;
        self.current_hole = 0;
        self.hole_started = false;
        self.shot_sync = None;
        for player in &mut self.players {
            player.game = PlayerGameState::default();
            player.entry.set_flag(status_flags::READY, false);
        }
        self.notify_lobby_room().await;
    }

    async fn dispatch(&mut self, event: RoomEvent) -> RoomResult {
        match event {
            RoomEvent::PlayerJoin(request) => self.join(request).await,
            RoomEvent::PlayerLeave { conn_id } => self.leave(conn_id).await,
            RoomEvent::SettingsChange { conn_id, changes } => {
                self.change_settings(conn_id, changes).await
            }
            RoomEvent::PlayerReady { conn_id, ready } => self.set_ready(conn_id, ready).await,
            RoomEvent::PlayerIdle { conn_id, idle } => self.set_idle(conn_id, idle).await,
            RoomEvent::PlayerKick {
                conn_id,
                kick_conn_id,
            } => self.kick(conn_id, kick_conn_id).await,
            RoomEvent::StartGame { conn_id } => self.start_game(conn_id).await,
            RoomEvent::LoadingProgress { conn_id, progress } => {
                self.index_of(conn_id)?;
                self.broadcast(ServerPlayerLoadProgress { conn_id, progress })
                    .await;
                Ok(RoomReply::Done)
            }
            RoomEvent::GameReady { conn_id } => self.game_ready(conn_id).await,
            RoomEvent::Shot { conn_id, action } => {
                self.index_of(conn_id)?;
                self.broadcast(action.to_message(conn_id)).await;
                Ok(RoomReply::Done)
            }
            RoomEvent::ShotSync { conn_id, data } => self.shot_sync(conn_id, data).await,
            RoomEvent::TurnEnd { conn_id } => self.turn_end(conn_id).await,
            RoomEvent::HoleEnd { conn_id } => {
                let index = self.index_of(conn_id)?;
                self.players[index].game.hole_end = true;
                debug!(room = self.number, conn_id, "홀 아웃");
                Ok(RoomReply::Done)
            }
            RoomEvent::ActiveUserAcknowledge { conn_id } => {
                self.index_of(conn_id)?;
                Ok(RoomReply::Done)
            }
            RoomEvent::FirstShotReady { conn_id } => {
                self.index_of(conn_id)?;
                self.broadcast(ServerPlayerFirstShotReady { conn_id }).await;
                Ok(RoomReply::Done)
            }
            RoomEvent::RoomAction { conn_id, data } => {
                self.index_of(conn_id)?;
                self.broadcast(ServerRoomAction { conn_id, data }).await;
                Ok(RoomReply::Done)
            }
            RoomEvent::Chat {
                conn_id,
                nickname,
                message,
            } => {
                self.index_of(conn_id)?;
                self.broadcast(ServerEvent {
                    event: GlobalEvent::ChatMessage { nickname, message },
                })
                .await;
                Ok(RoomReply::Done)
            }
            RoomEvent::Info => Ok(RoomReply::Info(self.list_entry())),
            RoomEvent::Snapshot => Ok(RoomReply::Snapshot(self.snapshot())),
        }
    }
}

#[async_trait]
impl Actor for RoomActor {
    type Event = RoomEvent;
    type Reply = RoomResult;

    fn name(&self) -> String {
        self.context()
    }

    async fn started(&mut self) -> Flow {
        let Some(creator) = self.creator.take() else {
            return Flow::Continue;
        };
        let conn_id = creator.entry.conn_id;
        match self.join(creator).await {
            Ok(_) => Flow::Continue,
            Err(e) => {
                warn!(room = self.number, conn_id, "방장 입장 실패: {}", e);
                Flow::Stop
            }
        }
    }

    async fn handle(&mut self, event: RoomEvent, promise: Promise<RoomResult>) -> Flow {
        let result = self.dispatch(event).await;
        if let Err(e) = &result {
            debug!(room = self.number, "요청 거절: {}", e);
        }
        promise.resolve(result);

        if self.players.is_empty() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    async fn stopped(&mut self) {
        info!(room = self.number, "방 종료");
        self.notify_lobby(LobbyEvent::RoomRemove {
            number: self.number,
        })
        .await;
    }
}

/// 시드로 만든 라운드 홀 배치
pub fn generate_holes(seed: u32, course: u8) -> [HoleInfo; COURSE_HOLES] {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed as u64);
    std::array::from_fn(|i| HoleInfo {
        hole_id: rng.gen(),
        pin: rng.gen_range(0..3),
        course,
        number: i as u8 + 1,
    })
}
