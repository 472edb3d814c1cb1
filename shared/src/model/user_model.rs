//! 플레이어 모델
//!
//! 계정 저장소가 돌려주는 플레이어 스냅샷입니다. 게임 코어는 이 값을 읽기만 합니다.

use crate::config::game_config::PART_SLOTS;
use crate::protocol::common::CharacterData;
use crate::protocol::game::{
    EquipmentIds, InventoryItemEntry, LobbyPlayerEntry, PlayerMainData, RoomPlayerEntry,
};

/// 장착 아이템
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Equipment {
    pub character_id: u32,
    pub caddie_id: u32,
    pub club_id: u32,
    pub mascot_id: u32,
    pub ball_type_id: u32,
}

/// 캐릭터
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Character {
    pub id: u32,
    pub char_type_id: u32,
    pub hair_color: u8,
    pub shirt: u8,
    pub part_type_ids: [u32; PART_SLOTS],
    pub part_ids: [u32; PART_SLOTS],
    pub aux_parts: [u32; 5],
    pub cut_in_id: u32,
    pub stats: [u8; 5],
    pub mastery: u32,
}

impl Character {
    pub fn to_wire(&self) -> CharacterData {
        CharacterData {
            id: self.id,
            char_type_id: self.char_type_id,
            hair_color: self.hair_color,
            shirt: self.shirt,
            part_type_ids: self.part_type_ids,
            part_ids: self.part_ids,
            aux_parts: self.aux_parts,
            cut_in_id: self.cut_in_id,
            stats: self.stats,
            mastery: self.mastery,
        }
    }
}

/// 인벤토리 아이템
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryItem {
    pub item_id: u32,
    pub item_type_id: u32,
    pub quantity: u32,
}

impl InventoryItem {
    pub fn to_wire(&self) -> InventoryItemEntry {
        InventoryItemEntry {
            item_id: self.item_id,
            item_type_id: self.item_type_id,
            quantity: self.quantity,
        }
    }
}

/// 플레이어 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Player {
    pub player_id: u32,
    pub username: String,
    /// 처음 로그인할 때 정하기 전까지는 `None`
    pub nickname: Option<String>,
    pub password_hash: String,
    pub pang: u64,
    pub points: u64,
    pub rank: u8,
    pub equipped: Equipment,
    pub characters: Vec<Character>,
    pub inventory: Vec<InventoryItem>,
}

impl Player {
    /// 화면에 표시할 이름 (닉네임이 없으면 계정 이름)
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }

    /// 장착 중인 캐릭터 (없으면 첫 번째 캐릭터)
    pub fn active_character(&self) -> Option<&Character> {
        self.characters
            .iter()
            .find(|c| c.id == self.equipped.character_id)
            .or_else(|| self.characters.first())
    }

    /// `ServerPlayerData` 본문
    pub fn main_data(&self) -> PlayerMainData {
        PlayerMainData {
            username: self.username.as_str().into(),
            nickname: self.display_name().into(),
            guild_name: Default::default(),
            rank: self.rank,
            player_id: self.player_id,
            pang: self.pang,
            points: self.points,
            games_played: 0,
            equipment: EquipmentIds {
                character_id: self.equipped.character_id,
                caddie_id: self.equipped.caddie_id,
                club_set_id: self.equipped.club_id,
                mascot_id: self.equipped.mascot_id,
                ball_type_id: self.equipped.ball_type_id,
            },
        }
    }

    /// 로비 인원 목록 항목
    pub fn lobby_entry(&self, conn_id: u32) -> LobbyPlayerEntry {
        LobbyPlayerEntry {
            conn_id,
            player_id: self.player_id,
            nickname: self.display_name().into(),
            rank: self.rank,
            room_number: -1,
            ..Default::default()
        }
    }

    /// 방 인원 목록 항목 (슬롯과 상태 플래그는 방이 채움)
    pub fn room_entry(&self, conn_id: u32) -> RoomPlayerEntry {
        let character = self.active_character().cloned().unwrap_or_default();
        RoomPlayerEntry {
            conn_id,
            nickname: self.display_name().into(),
            char_type_id: character.char_type_id,
            rank: self.rank,
            player_id: self.player_id,
            character: character.to_wire(),
            ..Default::default()
        }
    }
}
