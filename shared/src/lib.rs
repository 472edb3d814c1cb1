//! 골프 게임 서버 공통 라이브러리
//!
//! 로그인/게임/메시지 서버가 함께 사용하는 구성 요소를 모아둔 크레이트입니다.
//!
//! # 주요 모듈
//! - **protocol**: 프레이밍, 스트림 난독화, 메시지 테이블과 바이너리 코덱
//! - **net**: 접속 수락 루프와 연결 래퍼 (`ServerConn`)
//! - **service**: 세션 저장소, 토폴로지 클라이언트, 계정 저장소
//! - **config / logging / tool**: 환경 설정, 로깅 초기화, 에러 정의

pub mod config;
pub mod logging;
pub mod model;
pub mod net;
pub mod protocol;
pub mod service;
pub mod tool;

pub use tool::error::{AppError, ErrorSeverity};
