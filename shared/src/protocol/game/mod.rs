//! 게임 서버 메시지
//!
//! 클라이언트 메시지는 크게 네 부류로 나뉩니다.
//! - 부수 메시지: 예외 보고, 타이핑 표시, 출석 보상 요청
//! - 로비 입퇴장: `ClientMultiplayerJoin/Leave`, 이벤트 로비
//! - 방 생명주기: 생성, 입장, 퇴장, 강퇴, 설정 변경, 정보 조회
//! - 게임 진행: 준비, 시작, 로딩, 샷, 턴 종료, 홀 종료, 채팅

pub mod client;
pub mod server;
pub mod types;

pub use client::*;
pub use server::*;
pub use types::*;
