//! 게임 서버가 받는 메시지

use super::types::{PurchaseItem, RoomSettingsChanges, ShotSyncData};
use crate::protocol::wire::{List16, Rest};
use crate::{message_table, wire_struct};

wire_struct! {
    /// 로그인 서버에서 받은 세션 키로 인증
    pub struct ClientAuth {
        pub username: String,
        pub player_id: u32,
        pub login_key: String,
        pub version: String,
    }
}

wire_struct! {
    /// 로비/방 채팅
    pub struct ClientMessageSend {
        pub nickname: String,
        pub message: String,
    }
}

wire_struct! {
    pub struct ClientJoinChannel {
        pub channel_id: u8,
    }
}

wire_struct! {
    pub struct ClientRoomCreate {
        pub unknown: u8,
        pub shot_timer_ms: u32,
        pub game_timer_ms: u32,
        pub max_users: u8,
        pub room_type: u8,
        pub num_holes: u8,
        pub course: u8,
        pub hole_progression: u8,
        pub natural_wind: u32,
        pub room_name: String,
        pub password: String,
        pub artifact: u32,
    }
}

wire_struct! {
    pub struct ClientRoomJoin {
        pub room_number: i16,
        pub password: String,
    }
}

wire_struct! {
    pub struct ClientRoomEdit {
        pub room_number: i16,
        pub changes: RoomSettingsChanges,
    }
}

wire_struct! {
    /// 준비 상태 변경 (`0`이 준비, `1`이 준비 해제)
    pub struct ClientPlayerReady {
        pub state: u8,
    }
}

impl ClientPlayerReady {
    pub fn is_ready(&self) -> bool {
        self.state == 0
    }
}

wire_struct! {
    pub struct ClientPlayerStartGame {}
}

wire_struct! {
    pub struct ClientRoomLeave {
        pub unknown: u8,
        pub room_number: i16,
    }
}

wire_struct! {
    /// 로딩이 끝나 홀 시작 준비 완료
    pub struct ClientReadyStartHole {}
}

wire_struct! {
    /// 샷 확정 (내용은 해석하지 않고 그대로 중계)
    pub struct ClientShotCommit {
        pub data: Rest,
    }
}

wire_struct! {
    pub struct ClientShotRotate {
        pub angle: f32,
    }
}

wire_struct! {
    pub struct ClientShotPower {
        pub level: u8,
    }
}

wire_struct! {
    pub struct ClientShotClubChange {
        pub club: u8,
    }
}

wire_struct! {
    pub struct ClientShotItemUse {
        pub item_type_id: u32,
    }
}

wire_struct! {
    pub struct ClientUserTypingIndicator {
        pub status: u16,
    }
}

wire_struct! {
    pub struct ClientShotCometRelief {
        pub x: f32,
        pub y: f32,
        pub z: f32,
    }
}

wire_struct! {
    pub struct ClientLoadProgress {
        pub progress: u8,
    }
}

wire_struct! {
    pub struct ClientShotSync {
        pub data: ShotSyncData,
    }
}

wire_struct! {
    /// 턴 종료 알림
    pub struct ClientRoomSync {
        pub unknown: u8,
    }
}

wire_struct! {
    pub struct ClientBuyItem {
        pub items: List16<PurchaseItem>,
    }
}

wire_struct! {
    pub struct ClientEquipmentUpdate {
        pub kind: u8,
        pub data: Rest,
    }
}

wire_struct! {
    pub struct ClientShotActiveUserAcknowledge {}
}

wire_struct! {
    pub struct ClientRoomKick {
        pub conn_id: u32,
    }
}

wire_struct! {
    pub struct ClientRoomInfo {
        pub room_number: i16,
    }
}

wire_struct! {
    pub struct ClientHoleEnd {}
}

wire_struct! {
    pub struct ClientSetIdleStatus {
        pub idle: u8,
    }
}

wire_struct! {
    /// 클라이언트 측 예외 보고
    pub struct ClientException {
        pub unknown: u8,
        pub message: String,
    }
}

wire_struct! {
    pub struct ClientFirstShotReady {}
}

wire_struct! {
    pub struct ClientRequestServerList {}
}

wire_struct! {
    pub struct ClientRoomAction {
        pub data: Rest,
    }
}

wire_struct! {
    pub struct ClientMultiplayerJoin {}
}

wire_struct! {
    pub struct ClientMultiplayerLeave {}
}

wire_struct! {
    pub struct ClientRequestDailyReward {}
}

wire_struct! {
    pub struct ClientEventLobbyJoin {}
}

wire_struct! {
    pub struct ClientEventLobbyLeave {}
}

message_table! {
    /// 게임 서버가 받는 메시지
    pub enum GameClientMessage {
        0x0002 => ClientAuth,
        0x0003 => ClientMessageSend,
        0x0004 => ClientJoinChannel,
        0x0008 => ClientRoomCreate,
        0x0009 => ClientRoomJoin,
        0x000a => ClientRoomEdit,
        0x000d => ClientPlayerReady,
        0x000e => ClientPlayerStartGame,
        0x000f => ClientRoomLeave,
        0x0011 => ClientReadyStartHole,
        0x0012 => ClientShotCommit,
        0x0013 => ClientShotRotate,
        0x0015 => ClientShotPower,
        0x0016 => ClientShotClubChange,
        0x0017 => ClientShotItemUse,
        0x0018 => ClientUserTypingIndicator,
        0x0019 => ClientShotCometRelief,
        0x001a => ClientLoadProgress,
        0x001b => ClientShotSync,
        0x001c => ClientRoomSync,
        0x001d => ClientBuyItem,
        0x0020 => ClientEquipmentUpdate,
        0x0022 => ClientShotActiveUserAcknowledge,
        0x0026 => ClientRoomKick,
        0x002d => ClientRoomInfo,
        0x0031 => ClientHoleEnd,
        0x0032 => ClientSetIdleStatus,
        0x0033 => ClientException,
        0x0034 => ClientFirstShotReady,
        0x0043 => ClientRequestServerList,
        0x0063 => ClientRoomAction,
        0x0081 => ClientMultiplayerJoin,
        0x0082 => ClientMultiplayerLeave,
        0x016e => ClientRequestDailyReward,
        0x0176 => ClientEventLobbyJoin,
        0x0177 => ClientEventLobbyLeave,
    }
}
