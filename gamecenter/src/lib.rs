//! 게임센터
//!
//! 로그인, 게임, 메시지 서버를 하나의 프로세스에서 함께 실행하는 런처입니다.
//! 세 서비스는 세션 저장소와 계정 저장소, 토폴로지를 공유합니다.

pub mod server;

pub use server::{
    BoundAddrs, Collaborators, GameCenterConfig, GameCenterConfigBuilder, ServerManager,
};
