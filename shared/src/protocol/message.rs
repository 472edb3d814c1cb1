//! 메시지 서버(메신저) 메시지

use crate::{message_table, wire_struct};

wire_struct! {
    /// 메신저 접속 인증 (로그인에서 받은 세션 키 사용)
    pub struct ClientMessengerAuth {
        pub player_id: u32,
        pub session_key: String,
    }
}

wire_struct! {
    pub struct ClientMessengerHeartbeat {}
}

message_table! {
    /// 메시지 서버가 받는 메시지
    pub enum MessageClientMessage {
        0x0008 => ClientMessengerHeartbeat,
        0x0012 => ClientMessengerAuth,
    }
}

wire_struct! {
    /// 인증 결과 (`0` = 성공)
    pub struct ServerMessengerAuthResult {
        pub status: u32,
    }
}

message_table! {
    /// 메시지 서버가 보내는 메시지
    pub enum MessageServerMessage {
        0x002e => ServerMessengerAuthResult,
    }
}
