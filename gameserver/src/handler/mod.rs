//! 게임 서버 핸들러 레이어
//!
//! 연결 하나가 받은 메시지를 분류해서 로비와 방 액터의 이벤트로 바꿉니다.

pub mod connection_handler;
pub mod game_handler;
pub mod room_handler;

pub use connection_handler::{handle_connection, inventory_pages, ConnectionState, GameConn};
