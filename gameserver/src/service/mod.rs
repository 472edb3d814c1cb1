//! 게임 서버 서비스 레이어
//!
//! ```text
//! Service Layer
//! ├── LobbyActor (로비 인원, 방 목록, 방 생성)
//! ├── RoomActor (방 인원, 설정, 게임 진행)
//! ├── RoomStorage (방 번호 배정과 조회)
//! └── broadcast (동시 전송)
//! ```

pub mod broadcast;
pub mod lobby;
pub mod room;
pub mod room_storage;

pub use broadcast::{broadcast, send_to};
pub use lobby::{LobbyActor, LobbyEvent, LobbyHandle, LobbyReply, CENSUS_PAGE_SIZE};
pub use room::{
    GamePhase, RoomActor, RoomEvent, RoomHandle, RoomJoinRequest, RoomReply, RoomSettings,
    RoomSnapshot, ShotAction,
};
pub use room_storage::RoomStorage;
