//! 여러 서비스의 메시지가 공유하는 구조체

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

use super::wire::{FixedStr, List8};
use crate::wire_struct;

wire_struct! {
    /// Win32 `SYSTEMTIME`과 같은 배치의 시각
    pub struct SystemTime {
        pub year: u16,
        pub month: u16,
        pub day_of_week: u16,
        pub day: u16,
        pub hour: u16,
        pub minute: u16,
        pub second: u16,
        pub millis: u16,
    }
}

impl SystemTime {
    /// 현재 로컬 시각
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        Self {
            year: time.year().clamp(0, u16::MAX as i32) as u16,
            month: time.month() as u16,
            day_of_week: time.weekday().num_days_from_sunday() as u16,
            day: time.day() as u16,
            hour: time.hour() as u16,
            minute: time.minute() as u16,
            second: time.second() as u16,
            millis: (time.timestamp_subsec_millis() % 1000) as u16,
        }
    }
}

wire_struct! {
    /// 서버 목록 항목
    pub struct ServerEntry {
        pub name: FixedStr<40>,
        pub server_id: u32,
        pub max_users: u32,
        pub num_users: u32,
        pub address: FixedStr<18>,
        pub port: u16,
        pub unknown: u16,
        pub flags: u32,
    }
}

/// 서버 목록 (`u8` 개수 접두)
pub type ServerList = List8<ServerEntry>;

wire_struct! {
    /// 캐릭터 외형과 능력치
    pub struct CharacterData {
        pub id: u32,
        pub char_type_id: u32,
        pub hair_color: u8,
        pub shirt: u8,
        pub part_type_ids: [u32; 24],
        pub part_ids: [u32; 24],
        pub aux_parts: [u32; 5],
        pub cut_in_id: u32,
        pub stats: [u8; 5],
        pub mastery: u32,
    }
}
