//! 통합 서버 구성
//!
//! - **config**: 바인드 주소와 활성화 여부
//! - **starters**: 공유 협력 객체와 서버 인스턴스 조립
//! - **manager**: 시작/중지와 종료 시그널 처리

pub mod config;
pub mod manager;
pub mod starters;

pub use config::{GameCenterConfig, GameCenterConfigBuilder, ServerEndpoint};
pub use manager::{BoundAddrs, ServerManager};
pub use starters::{Collaborators, LOGIN_SERVER_ID, MESSAGE_SERVER_ID};
