//! 패킷 코덱
//!
//! 프레이밍([`frame`]), 스트림 난독화([`cipher`]), 연결 메시지([`hello`]),
//! 바이너리 레이아웃([`wire`])과 방향별 메시지 테이블([`table`])로 구성됩니다.
//! 서비스별 메시지는 [`login`], [`game`], [`message`] 모듈에 정의되어 있습니다.

pub mod cipher;
pub mod common;
pub mod frame;
pub mod game;
pub mod hello;
pub mod login;
pub mod message;
pub mod table;
pub mod wire;

pub use cipher::CryptTables;
pub use game::{GameClientMessage, GameServerMessage};
pub use login::{LoginClientMessage, LoginServerMessage};
pub use message::{MessageClientMessage, MessageServerMessage};
pub use table::{MessageSet, MessageTable};
