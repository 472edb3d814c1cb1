//! 서버 에러 관리 시스템
//!
//! 프로토콜, 전송, 인증, 방, 저장소 계층의 에러를 분류하고
//! 심각도에 맞춰 로깅하는 기능을 제공합니다.
//!
//! 연결 단위로 치명적인 에러(`Protocol`, `Transport`)는 소켓을 닫고,
//! 나머지는 요청만 실패시킨 뒤 연결을 유지합니다.

use thiserror::Error;
use tracing::{debug, error, info, warn};

/// 패킷 코덱 에러
///
/// 프레임 해석과 메시지 디코딩 중에 발생합니다. 연결 단위로 치명적입니다.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("버퍼 부족: {context} (필요 {needed}바이트, 남은 {remaining}바이트)")]
    ShortRead {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("크기 불일치: {context} (개수 {count}, 남은 {remaining}바이트)")]
    SizeMismatch {
        context: &'static str,
        count: usize,
        remaining: usize,
    },

    #[error("알 수 없는 구분자: {context} = {value:#x}")]
    UnknownDiscriminator { context: &'static str, value: u32 },

    #[error("알 수 없는 메시지 ID: {0:#06x}")]
    UnknownMessage(u16),

    #[error("메시지 테이블에 없는 메시지: {0}")]
    UnknownMessageName(String),

    #[error("체크섬 불일치: 기대값 {expected:#04x}, 수신값 {actual:#04x}")]
    BadChecksum { expected: u8, actual: u8 },

    #[error("잘못된 연결 키: {0} (0~15 범위여야 합니다)")]
    InvalidKey(u8),

    #[error("프레임 크기 초과: {0}바이트")]
    FrameTooLarge(usize),

    #[error("암호 테이블 크기 오류: {0}바이트")]
    InvalidCryptTable(usize),
}

/// 소켓 전송 에러
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("상대방이 연결을 종료했습니다")]
    Closed,

    #[error("프레임 수신 중 연결이 끊어졌습니다 ({0})")]
    Truncated(&'static str),

    #[error("소켓 쓰기 시간 초과 ({0:?})")]
    WriteTimeout(std::time::Duration),

    #[error("소켓 I/O 오류: {0}")]
    Io(#[from] std::io::Error),
}

/// 인증 에러
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("존재하지 않는 사용자: {0}")]
    UnknownUsername(String),

    #[error("비밀번호 불일치: {0}")]
    InvalidPassword(String),

    #[error("유효하지 않은 세션 키")]
    InvalidSessionKey,

    #[error("만료된 세션: {0}")]
    SessionExpired(u32),

    #[error("플레이어를 찾을 수 없습니다: {0}")]
    PlayerNotFound(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// `ServerLogin{Error}`에 실리는 클라이언트 에러 코드
    pub fn login_error_code(&self) -> u32 {
        match self {
            AuthError::UnknownUsername(_) => 0x0001_2C02,
            AuthError::InvalidPassword(_) => 0x0001_2C01,
            AuthError::InvalidSessionKey | AuthError::SessionExpired(_) => 0x0001_2C03,
            AuthError::PlayerNotFound(_) => 0x0001_2C02,
            AuthError::Store(_) => 0x0001_2C10,
        }
    }
}

/// 방 처리 에러 (연결을 끊지 않음)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("방이 가득 찼습니다: {0}")]
    Full(i16),

    #[error("존재하지 않는 방: {0}")]
    UnknownRoom(i16),

    #[error("방장만 가능한 작업입니다")]
    NotOwner,

    #[error("방 비밀번호가 틀렸습니다: {0}")]
    WrongPassword(i16),

    #[error("이미 게임이 진행 중인 방입니다: {0}")]
    InGame(i16),

    #[error("방에 참가하지 않은 상태입니다")]
    NotInRoom,

    #[error(transparent)]
    Actor(#[from] ActorError),
}

impl RoomError {
    /// `ServerRoomJoin` 실패 응답에 쓰이는 상태 코드
    pub fn join_status(&self) -> u16 {
        match self {
            RoomError::UnknownRoom(_) | RoomError::NotInRoom => 1,
            RoomError::Full(_) => 2,
            RoomError::WrongPassword(_) => 3,
            RoomError::InGame(_) => 4,
            RoomError::NotOwner | RoomError::Actor(_) => 5,
        }
    }
}

/// 외부 저장소(세션, 계정, 토폴로지) 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("데이터를 찾을 수 없습니다: {0}")]
    NotFound(String),

    #[error("만료된 데이터: {0}")]
    Expired(String),

    #[error("중복된 데이터: {0}")]
    Duplicate(String),

    #[error("저장소 백엔드 오류: {0}")]
    Backend(String),
}

/// 액터 메일박스 에러
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorError {
    #[error("액터가 이미 종료되었습니다")]
    ActorDead,

    #[error("액터가 응답 없이 종료되었습니다")]
    Closed,

    #[error("액터 메일박스가 가득 찼습니다")]
    MailboxFull,
}

/// 공통 애플리케이션 에러
///
/// 각 계층의 에러를 하나로 감싸서 연결 핸들러와 런처가 일관되게 처리할 수 있도록 합니다.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("프로토콜 오류: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("전송 오류: {0}")]
    Transport(#[from] TransportError),

    #[error("인증 오류: {0}")]
    Auth(#[from] AuthError),

    #[error("방 오류: {0}")]
    Room(#[from] RoomError),

    #[error("저장소 오류: {0}")]
    Store(#[from] StoreError),

    #[error("액터 오류: {0}")]
    Actor(#[from] ActorError),

    #[error("설정 오류: {0}")]
    Configuration(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Transport(TransportError::Io(e))
    }
}

impl AppError {
    /// 에러의 심각도를 반환합니다.
    ///
    /// # Returns
    /// * `ErrorSeverity` - 에러의 심각도 레벨
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // Critical: 서버 구성 자체가 잘못됨
            AppError::Configuration(_) => ErrorSeverity::Critical,

            // High: 저장소 장애, 액터 비정상 종료
            AppError::Store(_) | AppError::Actor(_) => ErrorSeverity::High,

            // Medium: 클라이언트가 보낸 잘못된 데이터
            AppError::Protocol(_) | AppError::Auth(_) => ErrorSeverity::Medium,

            // Low: 일반적인 연결 종료, 방 규칙 위반
            AppError::Transport(_) | AppError::Room(_) => ErrorSeverity::Low,
        }
    }

    /// 연결을 종료해야 하는 에러인지 확인합니다.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Protocol(_) | AppError::Transport(_) | AppError::Auth(_)
        )
    }

    /// 상대방의 정상 종료인지 확인합니다.
    pub fn is_closed(&self) -> bool {
        matches!(self, AppError::Transport(TransportError::Closed))
    }

    /// 에러를 로깅합니다.
    ///
    /// 심각도에 따라 적절한 로깅 레벨을 사용합니다.
    pub fn log(&self, context: &str) {
        let error_msg = self.to_string();

        match self.severity() {
            ErrorSeverity::Critical => error!("[CRITICAL] {} - {}", context, error_msg),
            ErrorSeverity::High => error!("[HIGH] {} - {}", context, error_msg),
            ErrorSeverity::Medium => warn!("[MEDIUM] {} - {}", context, error_msg),
            ErrorSeverity::Low if self.is_closed() => debug!("{} - {}", context, error_msg),
            ErrorSeverity::Low => info!("[LOW] {} - {}", context, error_msg),
        }
    }
}

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Critical, // 시스템 장애
    High,     // 요청 처리 실패
    Medium,   // 클라이언트 입력 오류
    Low,      // 일반적인 경고
}
