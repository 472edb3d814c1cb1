//! 프레임 계층
//!
//! - 클라이언트 → 서버: `{salt: u8, len: u16 LE, checksum: u8}` + 난독화된 페이로드
//! - 서버 → 클라이언트: `{flag: u8, len: u16 LE}` + 난독화된 페이로드
//!
//! `len`은 헤더를 제외한 페이로드 길이이고, 평문 페이로드는 `u16` 메시지 ID로 시작합니다.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::cipher::CryptTables;
use crate::tool::error::{AppError, ProtocolError, TransportError};

/// 클라이언트 프레임 헤더 길이
pub const CLIENT_HEADER_LEN: usize = 4;

/// 서버 프레임 헤더 길이
pub const SERVER_HEADER_LEN: usize = 3;

/// 페이로드 최대 길이
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// 서버 프레임 생성
pub fn encode_server_frame(
    tables: &CryptTables,
    key: u8,
    flag: u8,
    plaintext: &[u8],
) -> Result<BytesMut, ProtocolError> {
    if plaintext.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::FrameTooLarge(plaintext.len()));
    }
    let mut payload = plaintext.to_vec();
    tables.obfuscate(key, flag, &mut payload)?;

    let mut frame = BytesMut::with_capacity(SERVER_HEADER_LEN + payload.len());
    frame.put_u8(flag);
    frame.put_u16_le(payload.len() as u16);
    frame.put_slice(&payload);
    Ok(frame)
}

/// 클라이언트 프레임 생성 (테스트 클라이언트와 도구에서 사용)
pub fn encode_client_frame(
    tables: &CryptTables,
    key: u8,
    salt: u8,
    plaintext: &[u8],
) -> Result<BytesMut, ProtocolError> {
    if plaintext.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::FrameTooLarge(plaintext.len()));
    }
    let checksum = tables.checksum(key, salt)?;
    let mut payload = plaintext.to_vec();
    tables.obfuscate(key, salt, &mut payload)?;

    let mut frame = BytesMut::with_capacity(CLIENT_HEADER_LEN + payload.len());
    frame.put_u8(salt);
    frame.put_u16_le(payload.len() as u16);
    frame.put_u8(checksum);
    frame.put_slice(&payload);
    Ok(frame)
}

/// 클라이언트 프레임 헤더 해석 및 체크섬 검증
///
/// # Returns
/// `(salt, payload_len)`
pub fn parse_client_header(
    tables: &CryptTables,
    key: u8,
    header: &[u8; CLIENT_HEADER_LEN],
) -> Result<(u8, usize), ProtocolError> {
    let salt = header[0];
    let len = u16::from_le_bytes([header[1], header[2]]) as usize;
    let expected = tables.checksum(key, salt)?;
    if header[3] != expected {
        return Err(ProtocolError::BadChecksum {
            expected,
            actual: header[3],
        });
    }
    Ok((salt, len))
}

async fn read_exact_or<R>(
    reader: &mut R,
    buf: &mut [u8],
    at_boundary: bool,
    context: &'static str,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            if at_boundary {
                Err(TransportError::Closed.into())
            } else {
                Err(TransportError::Truncated(context).into())
            }
        }
        Err(e) => Err(TransportError::Io(e).into()),
    }
}

/// 클라이언트 프레임 하나를 읽어 평문 페이로드 반환
pub async fn read_client_frame<R>(
    reader: &mut R,
    tables: &CryptTables,
    key: u8,
) -> Result<Bytes, AppError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; CLIENT_HEADER_LEN];
    // 첫 바이트 전에 끊기면 정상 종료, 그 뒤에 끊기면 잘린 프레임
    read_exact_or(reader, &mut header[..1], true, "header").await?;
    read_exact_or(reader, &mut header[1..], false, "header").await?;

    let (salt, len) = parse_client_header(tables, key, &header)?;
    let mut payload = vec![0u8; len];
    read_exact_or(reader, &mut payload, false, "payload").await?;
    tables.deobfuscate(key, salt, &mut payload)?;
    Ok(Bytes::from(payload))
}

/// 서버 프레임 하나를 읽어 평문 페이로드 반환 (클라이언트 측)
pub async fn read_server_frame<R>(
    reader: &mut R,
    tables: &CryptTables,
    key: u8,
) -> Result<Bytes, AppError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; SERVER_HEADER_LEN];
    read_exact_or(reader, &mut header[..1], true, "header").await?;
    read_exact_or(reader, &mut header[1..], false, "header").await?;

    let flag = header[0];
    let len = u16::from_le_bytes([header[1], header[2]]) as usize;
    let mut payload = vec![0u8; len];
    read_exact_or(reader, &mut payload, false, "payload").await?;
    tables.deobfuscate(key, flag, &mut payload)?;
    Ok(Bytes::from(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_frame_round_trip() {
        let tables = CryptTables::builtin();
        let plain = [0x01u8, 0x00, 0x05, 0x00, b'a', b'l', b'i', b'c', b'e'];
        let frame = encode_client_frame(&tables, 7, 0x42, &plain).unwrap();
        assert_eq!(frame.len(), CLIENT_HEADER_LEN + plain.len());
        assert_eq!(frame[0], 0x42);
        assert_eq!(u16::from_le_bytes([frame[1], frame[2]]) as usize, plain.len());

        let mut reader = &frame[..];
        let payload = read_client_frame(&mut reader, &tables, 7).await.unwrap();
        assert_eq!(&payload[..], &plain);
    }

    #[tokio::test]
    async fn test_server_frame_round_trip() {
        let tables = CryptTables::builtin();
        let plain = b"\x10\x00session";
        let frame = encode_server_frame(&tables, 15, 0x99, plain).unwrap();
        assert_eq!(frame.len(), SERVER_HEADER_LEN + plain.len());

        let mut reader = &frame[..];
        let payload = read_server_frame(&mut reader, &tables, 15).await.unwrap();
        assert_eq!(&payload[..], plain);
    }

    #[tokio::test]
    async fn test_bad_checksum() {
        let tables = CryptTables::builtin();
        let mut frame = encode_client_frame(&tables, 2, 0x10, b"\x01\x00").unwrap();
        frame[3] ^= 0xff;

        let mut reader = &frame[..];
        let err = read_client_frame(&mut reader, &tables, 2).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Protocol(ProtocolError::BadChecksum { .. })
        ));
    }

    #[tokio::test]
    async fn test_eof_handling() {
        let tables = CryptTables::builtin();

        let mut empty: &[u8] = &[];
        let err = read_client_frame(&mut empty, &tables, 0).await.unwrap_err();
        assert!(err.is_closed());

        let frame = encode_client_frame(&tables, 0, 1, b"\x01\x00\x02\x00").unwrap();
        let mut truncated = &frame[..frame.len() - 1];
        let err = read_client_frame(&mut truncated, &tables, 0).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Transport(TransportError::Truncated("payload"))
        ));
    }
}
