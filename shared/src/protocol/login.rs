//! 로그인 서버 메시지

use super::common::ServerList;
use crate::{message_table, wire_struct, wire_union};

wire_struct! {
    /// 계정 인증 요청
    pub struct ClientLogin {
        pub username: String,
        pub password: String,
    }
}

wire_struct! {
    /// 접속할 게임 서버 선택
    pub struct ClientSelectServer {
        pub server_id: u32,
    }
}

wire_struct! {
    pub struct ClientSetNickname {
        pub nickname: String,
    }
}

wire_struct! {
    pub struct ClientCheckNickname {
        pub nickname: String,
    }
}

wire_struct! {
    /// 첫 캐릭터 선택
    pub struct ClientSelectCharacter {
        pub char_type_id: u32,
        pub hair_color: u16,
    }
}

message_table! {
    /// 로그인 서버가 받는 메시지
    pub enum LoginClientMessage {
        0x0001 => ClientLogin,
        0x0003 => ClientSelectServer,
        0x0006 => ClientSetNickname,
        0x0007 => ClientCheckNickname,
        0x0008 => ClientSelectCharacter,
    }
}

wire_union! {
    /// `ServerLogin` 상태별 본문
    pub enum LoginStatus: u8 {
        Success = 0x00 { username: String, player_id: u32, nickname: String },
        SetNickname = 0xd8 { unknown: u32 },
        SetCharacter = 0xd9 {},
        Error = 0xe3 { code: u32 },
    }
}

wire_struct! {
    pub struct ServerLogin {
        pub status: LoginStatus,
    }
}

wire_struct! {
    pub struct ServerGameServerList {
        pub servers: ServerList,
    }
}

wire_struct! {
    /// 게임 서버 접속용 세션 키 (로그인 세션 키와 동일한 값)
    pub struct ServerGameSessionKey {
        pub status: u32,
        pub key: String,
    }
}

wire_struct! {
    pub struct ServerMessageServerList {
        pub servers: ServerList,
    }
}

wire_struct! {
    pub struct ServerNicknameCheckResponse {
        pub status: u32,
        pub nickname: String,
    }
}

wire_struct! {
    pub struct ServerLoginSessionKey {
        pub key: String,
    }
}

wire_struct! {
    /// 세션 키 직전에 보내는 고정 프레임
    pub struct Server0011 {
        pub unknown: u16,
    }
}

message_table! {
    /// 로그인 서버가 보내는 메시지
    pub enum LoginServerMessage {
        0x0001 => ServerLogin,
        0x0002 => ServerGameServerList,
        0x0003 => ServerGameSessionKey,
        0x0009 => ServerMessageServerList,
        0x000e => ServerNicknameCheckResponse,
        0x0010 => ServerLoginSessionKey,
        0x0011 => Server0011,
    }
}
