//! 접속 직후 서버가 보내는 연결 메시지
//!
//! 연결 메시지는 난독화되지 않은 원시 바이트이며, 이후 모든 프레임에 쓰일
//! 연결 키를 담고 있습니다. 서비스마다 배치가 다릅니다.

use rand::Rng;

use super::cipher::KEY_COUNT;
use crate::tool::error::ProtocolError;

/// 로그인 서버 연결 메시지 길이 (`u16` × 8)
pub const LOGIN_HELLO_LEN: usize = 16;

/// 게임 서버 연결 메시지 길이 (고정 8바이트 + 키)
pub const GAME_HELLO_LEN: usize = 9;

/// 메시지 서버 연결 메시지 길이 (`u16` × 6)
pub const MESSAGE_HELLO_LEN: usize = 12;

const GAME_HELLO_PREFIX: [u8; 8] = [0x00, 0x06, 0x00, 0x00, 0x3f, 0x00, 0x01, 0x01];

/// 새 연결 키 (0~15 균등 분포)
pub fn random_key() -> u8 {
    rand::thread_rng().gen_range(0..KEY_COUNT)
}

fn put_words(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn read_word(bytes: &[u8], index: usize) -> u16 {
    u16::from_le_bytes([bytes[index * 2], bytes[index * 2 + 1]])
}

fn checked_key(key: u8) -> Result<u8, ProtocolError> {
    if key >= KEY_COUNT {
        return Err(ProtocolError::InvalidKey(key));
    }
    Ok(key)
}

/// 로그인 서버 연결 메시지
///
/// `{0x0000, 0x000B, 0x0000, key, 0x0000, 0x0000, server_id, 0x0000}`
pub fn login_hello(key: u8, server_id: u16) -> [u8; LOGIN_HELLO_LEN] {
    let words = [0x0000, 0x000b, 0x0000, u16::from(key), 0x0000, 0x0000, server_id, 0x0000];
    let mut out = [0u8; LOGIN_HELLO_LEN];
    out.copy_from_slice(&put_words(&words));
    out
}

/// 로그인 서버 연결 메시지 해석
///
/// # Returns
/// `(key, server_id)`
pub fn parse_login_hello(bytes: &[u8; LOGIN_HELLO_LEN]) -> Result<(u8, u16), ProtocolError> {
    let key = checked_key(bytes[6])?;
    Ok((key, read_word(bytes, 6)))
}

/// 게임 서버 연결 메시지
pub fn game_hello(key: u8) -> [u8; GAME_HELLO_LEN] {
    let mut out = [0u8; GAME_HELLO_LEN];
    out[..8].copy_from_slice(&GAME_HELLO_PREFIX);
    out[8] = key;
    out
}

/// 게임 서버 연결 메시지에서 키 추출
pub fn parse_game_hello(bytes: &[u8; GAME_HELLO_LEN]) -> Result<u8, ProtocolError> {
    checked_key(bytes[8])
}

/// 메시지 서버 연결 메시지
///
/// `{0x0000, 0x0009, 0x0000, 0x0101, key, 0x0000}`
pub fn message_hello(key: u8) -> [u8; MESSAGE_HELLO_LEN] {
    let words = [0x0000, 0x0009, 0x0000, 0x0101, u16::from(key), 0x0000];
    let mut out = [0u8; MESSAGE_HELLO_LEN];
    out.copy_from_slice(&put_words(&words));
    out
}

/// 메시지 서버 연결 메시지에서 키 추출
pub fn parse_message_hello(bytes: &[u8; MESSAGE_HELLO_LEN]) -> Result<u8, ProtocolError> {
    checked_key(bytes[8])
}
