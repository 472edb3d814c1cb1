//! 게임 서버 메시지가 공유하는 구조체

use crate::protocol::common::{CharacterData, SystemTime};
use crate::protocol::wire::{FixedBytes, FixedStr, List8};
use crate::{wire_struct, wire_union};

/// 방 플레이어 상태 플래그
pub mod status_flags {
    /// 자리 비움
    pub const AWAY: u8 = 0x01;
    /// 방장
    pub const MASTER: u8 = 0x08;
    /// 준비 완료
    pub const READY: u8 = 0x20;
}

wire_struct! {
    /// 장착 아이템 ID
    pub struct EquipmentIds {
        pub character_id: u32,
        pub caddie_id: u32,
        pub club_set_id: u32,
        pub mascot_id: u32,
        pub ball_type_id: u32,
    }
}

wire_struct! {
    /// 플레이어 기본 정보 (`ServerPlayerData`)
    pub struct PlayerMainData {
        pub username: FixedStr<22>,
        pub nickname: FixedStr<22>,
        pub guild_name: FixedStr<21>,
        pub rank: u8,
        pub player_id: u32,
        pub pang: u64,
        pub points: u64,
        pub games_played: u32,
        pub equipment: EquipmentIds,
    }
}

wire_struct! {
    /// 로비 인원 목록 항목
    pub struct LobbyPlayerEntry {
        pub conn_id: u32,
        pub player_id: u32,
        pub nickname: FixedStr<22>,
        pub guild_name: FixedStr<21>,
        pub rank: u8,
        pub room_number: i16,
        pub title_id: u32,
        pub mascot_type_id: u32,
    }
}

wire_struct! {
    /// 방 인원 목록 항목
    pub struct RoomPlayerEntry {
        pub conn_id: u32,
        pub nickname: FixedStr<22>,
        pub guild_name: FixedStr<21>,
        pub slot: u8,
        pub title_id: u32,
        pub char_type_id: u32,
        pub status_flags: u8,
        pub rank: u8,
        pub position_x: f32,
        pub position_y: f32,
        pub position_z: f32,
        pub angle: f32,
        pub average_score: f32,
        pub player_id: u32,
        pub mascot_type_id: u32,
        pub character: CharacterData,
    }
}

impl RoomPlayerEntry {
    pub fn has_flag(&self, flag: u8) -> bool {
        self.status_flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u8, enabled: bool) {
        if enabled {
            self.status_flags |= flag;
        } else {
            self.status_flags &= !flag;
        }
    }
}

wire_struct! {
    /// 로비 방 목록 항목
    pub struct RoomListEntry {
        pub name: FixedStr<64>,
        pub public: u8,
        pub open: u8,
        pub max_users: u8,
        pub num_users: u8,
        pub number: i16,
        pub num_holes: u8,
        pub room_type: u8,
        pub course: u8,
        pub hole_progression: u8,
        pub shot_timer_ms: u32,
        pub game_timer_ms: u32,
        pub natural_wind: u32,
        pub artifact: u32,
    }
}

wire_struct! {
    /// 채널 목록 항목
    pub struct ChannelEntry {
        pub name: FixedStr<64>,
        pub max_users: u16,
        pub num_users: u16,
        pub id: u8,
        pub flags: u32,
    }
}

wire_struct! {
    pub struct InventoryItemEntry {
        pub item_id: u32,
        pub item_type_id: u32,
        pub quantity: u32,
    }
}

wire_struct! {
    pub struct AchievementEntry {
        pub type_id: u32,
        pub achievement_id: u32,
        pub count: u32,
    }
}

wire_struct! {
    pub struct PurchaseItem {
        pub item_type_id: u32,
        pub quantity: u16,
        pub pang_price: u32,
        pub cookie_price: u32,
    }
}

wire_struct! {
    /// 라운드에 쓰이는 홀 정보
    pub struct HoleInfo {
        pub hole_id: u32,
        pub pin: u8,
        pub course: u8,
        pub number: u8,
    }
}

wire_struct! {
    /// 샷이 끝난 뒤 모든 플레이어가 제출하는 공 상태
    pub struct ShotSyncData {
        pub active_conn_id: u32,
        pub x: f32,
        pub y: f32,
        pub z: f32,
        pub status: u8,
        pub pang: u32,
        pub bonus_pang: u32,
        pub unknown: FixedBytes<16>,
    }
}

wire_struct! {
    /// `GameInit{Full}`의 플레이어 슬롯
    pub struct GamePlayerSlot {
        pub slot: u8,
        pub conn_id: u32,
        pub start_time: SystemTime,
    }
}

wire_struct! {
    /// 라운드 결과 항목
    pub struct GameResult {
        pub conn_id: u32,
        pub place: u8,
        pub score: i8,
        pub pang: u64,
        pub bonus_pang: u64,
    }
}

wire_union! {
    /// 방 설정 변경 항목 (하나의 항목이 하나의 필드만 바꿈)
    pub enum RoomSettingsChange: u8 {
        RoomName = 0x00 { name: String },
        Password = 0x01 { password: String },
        RoomType = 0x02 { room_type: u8 },
        Course = 0x03 { course: u8 },
        NumHoles = 0x04 { num_holes: u8 },
        HoleProgression = 0x05 { mode: u8 },
        ShotTimer = 0x06 { seconds: u8 },
        MaxUsers = 0x07 { max_users: u8 },
        GameTimer = 0x08 { minutes: u8 },
        Artifact = 0x09 { artifact_id: u32 },
        NaturalWind = 0x0a { enabled: u32 },
    }
}

/// 방 설정 변경 목록
pub type RoomSettingsChanges = List8<RoomSettingsChange>;
