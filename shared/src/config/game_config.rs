//! 게임 설정 매니페스트
//!
//! ```json
//! {
//!   "default_club_set_type_id": 268435553,
//!   "characters": [{ "char_type_id": 67108864, "default_part_type_ids": [136314880] }],
//!   "channels": [{ "id": 0, "name": "Free #1", "max_users": 100 }]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 캐릭터 파츠 슬롯 수
pub const PART_SLOTS: usize = 24;

const DEFAULT_CLUB_SET_TYPE_ID: u32 = 0x1000_0000;

/// 캐릭터 종류별 기본 파츠
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDefaults {
    pub char_type_id: u32,
    #[serde(default)]
    pub default_part_type_ids: Vec<u32>,
}

/// 채널 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: u8,
    pub name: String,
    pub max_users: u16,
}

/// 게임 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub default_club_set_type_id: u32,
    pub characters: Vec<CharacterDefaults>,
    pub channels: Vec<ChannelConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        // 기본 캐릭터 9종 (파츠 없음)
        let characters = (0..9)
            .map(|i| CharacterDefaults {
                char_type_id: 0x0400_0000 + i,
                default_part_type_ids: Vec::new(),
            })
            .collect();

        Self {
            default_club_set_type_id: DEFAULT_CLUB_SET_TYPE_ID,
            characters,
            channels: vec![ChannelConfig {
                id: 0,
                name: "Free #1".to_string(),
                max_users: 100,
            }],
        }
    }
}

impl GameConfig {
    /// JSON 문자열에서 로드
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("게임 설정 JSON 파싱 실패")?;
        config.validate()?;
        Ok(config)
    }

    /// 파일에서 로드
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("게임 설정 파일을 읽을 수 없습니다: {}", path.display()))?;
        let config = Self::from_json(&json)?;
        info!(
            "게임 설정 로드: {} (캐릭터 {}종, 채널 {}개)",
            path.display(),
            config.characters.len(),
            config.channels.len()
        );
        Ok(config)
    }

    /// 경로가 있으면 파일에서, 없으면 기본값
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        for character in &self.characters {
            if character.default_part_type_ids.len() > PART_SLOTS {
                bail!(
                    "캐릭터 {:#x}의 기본 파츠가 {}개를 넘습니다",
                    character.char_type_id,
                    PART_SLOTS
                );
            }
        }

        let mut ids = HashSet::new();
        for channel in &self.channels {
            if !ids.insert(channel.id) {
                bail!("채널 ID 중복: {}", channel.id);
            }
        }
        Ok(())
    }

    /// 캐릭터 종류의 기본 파츠 (24슬롯, 빈 칸은 0)
    pub fn part_type_ids(&self, char_type_id: u32) -> [u32; PART_SLOTS] {
        let mut parts = [0u32; PART_SLOTS];
        if let Some(defaults) = self
            .characters
            .iter()
            .find(|c| c.char_type_id == char_type_id)
        {
            for (slot, id) in parts.iter_mut().zip(&defaults.default_part_type_ids) {
                *slot = *id;
            }
        }
        parts
    }

    pub fn channel(&self, id: u8) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.id == id)
    }
}
