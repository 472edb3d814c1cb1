//! 16진수 변환 유틸리티
//!
//! 알 수 없는 프레임을 로그로 남기거나 캡처한 패킷을 테스트 데이터로 옮길 때 사용합니다.

use anyhow::{anyhow, Result};

/// 한 줄에 출력할 바이트 수
const DUMP_LINE_WIDTH: usize = 16;

/// 16진수 변환 유틸리티
pub struct HexUtils;

impl HexUtils {
    /// 바이트 배열을 16진수 문자열로 변환
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        hex::encode(bytes)
    }

    /// 16진수 문자열을 바이트 배열로 변환
    ///
    /// 공백과 `0x` 접두사는 무시합니다.
    pub fn hex_to_bytes(text: &str) -> Result<Vec<u8>> {
        let cleaned: String = text
            .replace("0x", "")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        hex::decode(&cleaned).map_err(|e| anyhow!("잘못된 16진수 문자열: {} ({})", cleaned, e))
    }

    /// 로그 출력용 hexdump 형식 문자열 생성
    ///
    /// # Examples
    /// ```
    /// use shared::tool::HexUtils;
    ///
    /// let dump = HexUtils::hex_dump(b"PANG");
    /// assert!(dump.starts_with("0000  50 41 4e 47"));
    /// ```
    pub fn hex_dump(bytes: &[u8]) -> String {
        bytes
            .chunks(DUMP_LINE_WIDTH)
            .enumerate()
            .map(|(line, chunk)| {
                let hex_part = chunk
                    .iter()
                    .map(|b| format!("{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(" ");
                let ascii_part: String = chunk
                    .iter()
                    .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
                    .collect();
                format!(
                    "{:04x}  {:<width$}  {}",
                    line * DUMP_LINE_WIDTH,
                    hex_part,
                    ascii_part,
                    width = DUMP_LINE_WIDTH * 3 - 1
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let bytes = HexUtils::hex_to_bytes("0x00 0b 00 0f").unwrap();
        assert_eq!(bytes, vec![0x00, 0x0b, 0x00, 0x0f]);
        assert_eq!(HexUtils::bytes_to_hex(&bytes), "000b000f");
    }

    #[test]
    fn test_hex_dump_lines() {
        let data: Vec<u8> = (0u8..20).collect();
        let dump = HexUtils::hex_dump(&data);
        assert_eq!(dump.lines().count(), 2);
        assert!(dump.lines().nth(1).unwrap().starts_with("0010  10 11 12 13"));
    }

    #[test]
    fn test_invalid_hex() {
        assert!(HexUtils::hex_to_bytes("0g").is_err());
    }
}
