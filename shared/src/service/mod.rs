//! 외부 협력 서비스
//!
//! 세션 저장소, 토폴로지 조회, 계정 저장소를 트레이트로 정의하고
//! 단일 프로세스용 메모리 구현을 제공합니다.

pub mod account_service;
pub mod password_helper;
pub mod session_service;
pub mod topology_service;

pub use account_service::{open_account_store, AccountStore, MemoryAccountStore};
pub use session_service::{MemorySessionStore, Session, SessionStore, SessionSweeper};
pub use topology_service::{HttpTopologyClient, MemoryTopology, TopologyClient, TopologyManifest};
