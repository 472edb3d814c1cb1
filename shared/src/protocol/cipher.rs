//! 프레임 스트림 난독화
//!
//! 연결 키(0~15)와 프레임마다 바뀌는 솔트 바이트로 두 개의 4096바이트 치환 테이블을
//! 조회해 4바이트 시드를 만들고, 그 시드로 시작하는 XOR 체인을 적용합니다.
//!
//! ```text
//! idx  = key << 8 | salt
//! s[j] = salt_table[(idx + j) & 0xFFF] ^ key_table[(idx + 3j) & 0xFFF]   (j = 0..4)
//! 난독화:   c[i] = p[i] ^ s[i]      (i < 4)
//!           c[i] = p[i] ^ p[i - 4]  (i >= 4)
//! 복원:     p[i] = c[i] ^ s[i]      (i < 4)
//!           p[i] = c[i] ^ p[i - 4]  (i >= 4)
//! 체크섬:   key_table[idx] ^ salt_table[idx]
//! ```
//!
//! 실제 클라이언트와 통신하려면 `CRYPT_TABLE_PATH` 파일(키 테이블 4096바이트 +
//! 솔트 테이블 4096바이트)이 필요합니다. 고정 시드로 생성한 내장 테이블은 테스트와
//! 로컬 개발용이며 실제 클라이언트는 이 테이블을 모릅니다.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::tool::error::ProtocolError;

/// 테이블 하나의 크기
pub const TABLE_SIZE: usize = 0x1000;

/// 연결 키 개수 (키는 `0..KEY_COUNT`)
pub const KEY_COUNT: u8 = 16;

const TABLE_MASK: usize = TABLE_SIZE - 1;

/// 내장 테이블 생성 시드
const BUILTIN_SEED: u32 = 0x5041_4E47;

static BUILTIN_TABLES: Lazy<Arc<CryptTables>> =
    Lazy::new(|| Arc::new(CryptTables::generate(BUILTIN_SEED)));

/// 난독화 치환 테이블 쌍
#[derive(Clone, PartialEq, Eq)]
pub struct CryptTables {
    key_table: Vec<u8>,
    salt_table: Vec<u8>,
}

impl std::fmt::Debug for CryptTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptTables")
            .field("key_table", &format_args!("[{} bytes]", self.key_table.len()))
            .field("salt_table", &format_args!("[{} bytes]", self.salt_table.len()))
            .finish()
    }
}

impl CryptTables {
    /// 내장 테이블 (프로세스 전체에서 공유, 테스트용)
    pub fn builtin() -> Arc<CryptTables> {
        BUILTIN_TABLES.clone()
    }

    /// 내장 테스트 테이블과 같은지 확인
    pub fn is_builtin(&self) -> bool {
        self == BUILTIN_TABLES.as_ref()
    }

    /// xorshift32 시퀀스로 테이블 쌍 생성
    pub fn generate(seed: u32) -> Self {
        let mut state = if seed == 0 { BUILTIN_SEED } else { seed };
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 11) as u8
        };

        let key_table = (0..TABLE_SIZE).map(|_| next()).collect();
        let salt_table = (0..TABLE_SIZE).map(|_| next()).collect();
        Self {
            key_table,
            salt_table,
        }
    }

    /// 키 테이블 + 솔트 테이블을 이어붙인 바이트열에서 생성
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() != TABLE_SIZE * 2 {
            return Err(ProtocolError::InvalidCryptTable(data.len()));
        }
        let (key_table, salt_table) = data.split_at(TABLE_SIZE);
        Ok(Self {
            key_table: key_table.to_vec(),
            salt_table: salt_table.to_vec(),
        })
    }

    /// 파일에서 테이블 로드
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("암호 테이블 파일 읽기 실패: {}", path.display()))?;
        Self::from_bytes(&data)
            .with_context(|| format!("암호 테이블 형식 오류: {}", path.display()))
    }

    /// 경로가 주어지면 파일에서, 아니면 내장 테이블 사용
    ///
    /// 내장 테이블로 대체할 때는 실제 클라이언트가 접속할 수 없으므로 경고를 남깁니다.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Arc<CryptTables>> {
        match path {
            Some(path) => {
                let tables = Self::load(path)?;
                info!("암호 테이블 로드: {}", path.display());
                Ok(Arc::new(tables))
            }
            None => {
                warn!("⚠️ CRYPT_TABLE_PATH 미설정: 내장 테스트 테이블 사용 (실제 클라이언트와 통신 불가)");
                Ok(Self::builtin())
            }
        }
    }

    fn index(key: u8, salt: u8) -> Result<usize, ProtocolError> {
        if key >= KEY_COUNT {
            return Err(ProtocolError::InvalidKey(key));
        }
        Ok((usize::from(key) << 8) | usize::from(salt))
    }

    fn seed(&self, idx: usize) -> [u8; 4] {
        std::array::from_fn(|j| {
            self.salt_table[(idx + j) & TABLE_MASK] ^ self.key_table[(idx + 3 * j) & TABLE_MASK]
        })
    }

    /// 클라이언트 프레임 헤더의 체크섬 바이트
    pub fn checksum(&self, key: u8, salt: u8) -> Result<u8, ProtocolError> {
        let idx = Self::index(key, salt)?;
        Ok(self.key_table[idx] ^ self.salt_table[idx])
    }

    /// 평문을 제자리에서 난독화
    pub fn obfuscate(&self, key: u8, salt: u8, data: &mut [u8]) -> Result<(), ProtocolError> {
        let seed = self.seed(Self::index(key, salt)?);
        // 뒤에서부터 처리해야 p[i - 4]가 아직 평문으로 남아 있음
        for i in (4..data.len()).rev() {
            data[i] ^= data[i - 4];
        }
        for (byte, s) in data.iter_mut().zip(seed) {
            *byte ^= s;
        }
        Ok(())
    }

    /// 난독화된 데이터를 제자리에서 복원
    pub fn deobfuscate(&self, key: u8, salt: u8, data: &mut [u8]) -> Result<(), ProtocolError> {
        let seed = self.seed(Self::index(key, salt)?);
        for (byte, s) in data.iter_mut().zip(seed) {
            *byte ^= s;
        }
        for i in 4..data.len() {
            data[i] ^= data[i - 4];
        }
        Ok(())
    }
}
