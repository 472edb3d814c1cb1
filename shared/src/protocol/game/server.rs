//! 게임 서버가 보내는 메시지

use super::types::{
    AchievementEntry, ChannelEntry, GamePlayerSlot, GameResult, HoleInfo, InventoryItemEntry,
    LobbyPlayerEntry, PlayerMainData, RoomListEntry, RoomPlayerEntry, ShotSyncData,
};
use crate::protocol::common::{CharacterData, ServerList, SystemTime};
use crate::protocol::wire::{FixedBytes, List16, List32, List8, Rest};
use crate::{message_table, wire_struct, wire_union};

wire_union! {
    /// 전역 이벤트
    pub enum GlobalEvent: u8 {
        ChatMessage = 0x00 { nickname: String, message: String },
        GameEnd = 0x10 { nickname: String, score: i32, pang: u64 },
    }
}

wire_struct! {
    pub struct ServerEvent {
        pub event: GlobalEvent,
    }
}

wire_struct! {
    pub struct ServerPlayerData {
        pub sub_type: u8,
        pub data: PlayerMainData,
    }
}

wire_union! {
    /// 로비 인원 변경 알림
    pub enum UserCensus: u8 {
        Add = 0x01 { users: List8<LobbyPlayerEntry> },
        Remove = 0x02 { conn_id: u32 },
        Change = 0x03 { users: List8<LobbyPlayerEntry> },
        ListSet = 0x04 { users: List8<LobbyPlayerEntry> },
        ListAppend = 0x05 { users: List8<LobbyPlayerEntry> },
    }
}

wire_struct! {
    pub struct ServerUserCensus {
        pub census: UserCensus,
    }
}

wire_union! {
    /// 로비 방 목록 변경 알림
    pub enum RoomListUpdate: u8 {
        ListSet = 0x00 { rooms: List8<RoomListEntry> },
        Add = 0x01 { room: RoomListEntry },
        Remove = 0x02 { room_number: i16 },
        Change = 0x03 { room: RoomListEntry },
    }
}

wire_struct! {
    pub struct ServerRoomList {
        pub update: RoomListUpdate,
    }
}

wire_union! {
    /// 방 인원 변경 알림
    pub enum RoomCensus: u8 {
        ListSet = 0x00 { users: List8<RoomPlayerEntry>, unknown: i16 },
        ListAdd = 0x01 { user: RoomPlayerEntry },
        ListRemove = 0x02 { conn_id: u32 },
        ListChange = 0x03 { user: RoomPlayerEntry },
    }
}

wire_struct! {
    pub struct ServerRoomCensus {
        pub census: RoomCensus,
    }
}

wire_struct! {
    /// 방 입장 결과 (`status != 0`이면 실패)
    pub struct ServerRoomJoin {
        pub status: u16,
        pub room_name: String,
        pub room_number: i16,
    }
}

wire_struct! {
    pub struct ServerRoomStatus {
        pub room_type: u8,
        pub course: u8,
        pub num_holes: u8,
        pub hole_progression: u8,
        pub natural_wind: u32,
        pub max_users: u8,
        pub shot_timer_ms: u32,
        pub game_timer_ms: u32,
        pub artifact: u32,
        pub room_name: String,
        pub has_password: u8,
    }
}

wire_struct! {
    /// 방 퇴장 (`room_number = -1`)
    pub struct ServerRoomLeave {
        pub room_number: i16,
    }
}

wire_struct! {
    pub struct ServerChannelList {
        pub channels: List8<ChannelEntry>,
    }
}

wire_struct! {
    pub struct ServerChannelJoined {
        pub status: u8,
    }
}

wire_struct! {
    /// 라운드 정보 (코스, 18홀, 타이머, 시드)
    pub struct ServerRoomGameData {
        pub course: u8,
        pub unknown: u8,
        pub hole_progression: u8,
        pub num_holes: u8,
        pub unknown2: u32,
        pub shot_timer_ms: u32,
        pub game_timer_ms: u32,
        pub holes: [HoleInfo; 18],
        pub random_seed: u32,
        pub unknown3: FixedBytes<18>,
    }
}

wire_struct! {
    pub struct ServerRoomStartHole {
        pub conn_id: u32,
    }
}

wire_struct! {
    pub struct ServerPlayerShotCommit {
        pub conn_id: u32,
        pub data: Rest,
    }
}

wire_struct! {
    pub struct ServerPlayerRotate {
        pub conn_id: u32,
        pub angle: f32,
    }
}

wire_struct! {
    pub struct ServerPlayerPower {
        pub conn_id: u32,
        pub level: u8,
    }
}

wire_struct! {
    pub struct ServerPlayerClubChange {
        pub conn_id: u32,
        pub club: u8,
    }
}

wire_struct! {
    pub struct ServerPlayerItemUse {
        pub conn_id: u32,
        pub item_type_id: u32,
    }
}

wire_struct! {
    pub struct ServerRoomWind {
        pub wind: u8,
        pub unknown: u8,
        pub heading: u16,
        pub reset: u8,
    }
}

wire_struct! {
    pub struct ServerPlayerTypingIndicator {
        pub conn_id: u32,
        pub status: u16,
    }
}

wire_struct! {
    pub struct ServerPlayerCometRelief {
        pub conn_id: u32,
        pub x: f32,
        pub y: f32,
        pub z: f32,
    }
}

wire_struct! {
    /// 다음 샷을 칠 플레이어
    pub struct ServerRoomActiveUserAnnounce {
        pub conn_id: u32,
    }
}

wire_struct! {
    pub struct ServerRoomShotSync {
        pub data: ShotSyncData,
    }
}

wire_struct! {
    pub struct ServerRoomFinishHole {}
}

wire_struct! {
    pub struct ServerRoomFinishGame {
        pub results: List8<GameResult>,
    }
}

wire_struct! {
    pub struct ServerRoomAction {
        pub conn_id: u32,
        pub data: Rest,
    }
}

wire_struct! {
    pub struct ServerCharData {
        pub characters: List16<CharacterData>,
    }
}

wire_struct! {
    /// 인벤토리 한 페이지
    pub struct ServerPlayerInventory {
        pub total: u16,
        pub items: List16<InventoryItemEntry>,
    }
}

wire_union! {
    /// 게임 시작 시 플레이어 배치
    pub enum GameInit: u8 {
        Full = 0x00 { players: List8<GamePlayerSlot> },
        Minimal = 0x04 { conn_id: u32, start_time: SystemTime },
    }
}

wire_struct! {
    pub struct ServerRoomGameInit {
        pub init: GameInit,
    }
}

wire_struct! {
    /// 준비 상태 (`state = 0`이 준비 완료)
    pub struct ServerPlayerReady {
        pub conn_id: u32,
        pub state: u8,
    }
}

wire_struct! {
    pub struct ServerMultiplayerJoined {}
}

wire_struct! {
    pub struct ServerRoomInfoResponse {
        pub found: u8,
        pub room: RoomListEntry,
    }
}

wire_struct! {
    pub struct ServerPlayerFirstShotReady {
        pub conn_id: u32,
    }
}

wire_struct! {
    /// 홀 시작 정보 프레임
    pub struct Server0092 {
        pub data: Rest,
    }
}

wire_struct! {
    pub struct ServerRoomWeather {
        pub weather: u16,
    }
}

wire_struct! {
    /// 홀 시작 정보 프레임
    pub struct Server009F {
        pub data: Rest,
    }
}

wire_struct! {
    pub struct ServerPlayerLoadProgress {
        pub conn_id: u32,
        pub progress: u8,
    }
}

wire_struct! {
    /// 모든 플레이어가 턴을 마친 샷
    pub struct ServerRoomShotEnd {
        pub conn_id: u32,
    }
}

wire_struct! {
    pub struct ServerMultiplayerLeft {}
}

wire_struct! {
    /// 홀 시작 정보 프레임
    pub struct Server011F {
        pub data: Rest,
    }
}

wire_struct! {
    /// 메신저 서버 접속 안내
    pub struct ServerMessageConnect {}
}

wire_struct! {
    pub struct ServerGameServerList {
        pub servers: ServerList,
    }
}

wire_struct! {
    pub struct ServerAuthError {
        pub code: u32,
    }
}

wire_struct! {
    pub struct ServerAchievementProgress {
        pub remaining: u32,
        pub achievements: List32<AchievementEntry>,
    }
}

wire_struct! {
    /// 게임 시작 전 고정 프레임
    pub struct Server0230 {}
}

wire_struct! {
    /// 게임 시작 전 고정 프레임
    pub struct Server0231 {}
}

wire_struct! {
    /// 출석 보상 상태
    pub struct ServerLoginBonusStatus {
        pub status: u8,
        pub item_type_id: u32,
        pub quantity: u32,
        pub consecutive_days: u32,
    }
}

wire_struct! {
    pub struct ServerEventLobbyJoined {}
}

wire_struct! {
    pub struct ServerEventLobbyLeft {}
}

message_table! {
    /// 게임 서버가 보내는 메시지
    pub enum GameServerMessage {
        0x0040 => ServerEvent,
        0x0044 => ServerPlayerData,
        0x0046 => ServerUserCensus,
        0x0047 => ServerRoomList,
        0x0048 => ServerRoomCensus,
        0x0049 => ServerRoomJoin,
        0x004a => ServerRoomStatus,
        0x004c => ServerRoomLeave,
        0x004d => ServerChannelList,
        0x004e => ServerChannelJoined,
        0x0052 => ServerRoomGameData,
        0x0053 => ServerRoomStartHole,
        0x0055 => ServerPlayerShotCommit,
        0x0056 => ServerPlayerRotate,
        0x0058 => ServerPlayerPower,
        0x0059 => ServerPlayerClubChange,
        0x005a => ServerPlayerItemUse,
        0x005b => ServerRoomWind,
        0x005d => ServerPlayerTypingIndicator,
        0x005e => ServerPlayerCometRelief,
        0x0063 => ServerRoomActiveUserAnnounce,
        0x0064 => ServerRoomShotSync,
        0x0065 => ServerRoomFinishHole,
        0x0066 => ServerRoomFinishGame,
        0x0068 => ServerRoomAction,
        0x0070 => ServerCharData,
        0x0073 => ServerPlayerInventory,
        0x0076 => ServerRoomGameInit,
        0x0078 => ServerPlayerReady,
        0x0086 => ServerMultiplayerJoined,
        0x0089 => ServerRoomInfoResponse,
        0x0090 => ServerPlayerFirstShotReady,
        0x0092 => Server0092,
        0x009e => ServerRoomWeather,
        0x009f => Server009F,
        0x00a3 => ServerPlayerLoadProgress,
        0x00cc => ServerRoomShotEnd,
        0x00f6 => ServerMultiplayerLeft,
        0x011f => Server011F,
        0x012f => ServerMessageConnect,
        0x0152 => ServerGameServerList,
        0x016a => ServerAuthError,
        0x021d => ServerAchievementProgress,
        0x0230 => Server0230,
        0x0231 => Server0231,
        0x0248 => ServerLoginBonusStatus,
        0x0251 => ServerEventLobbyJoined,
        0x0252 => ServerEventLobbyLeft,
    }
}
