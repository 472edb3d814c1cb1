//! 메시지 테이블
//!
//! 방향(클라이언트→서버, 서버→클라이언트)과 서비스마다 `u16` 메시지 ID와
//! 메시지 변형을 1:1로 매핑합니다. 각 테이블은 `message_table!` 매크로로
//! 빌드 시점에 열거되며, 런타임 리플렉션은 사용하지 않습니다.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;

use bytes::{Buf, BufMut, Bytes, BytesMut};
pub use once_cell::sync::Lazy;
use tracing::debug;

use crate::tool::error::ProtocolError;

/// ID ↔ 이름 매핑 테이블
#[derive(Debug)]
pub struct MessageTable {
    name: &'static str,
    by_id: BTreeMap<u16, &'static str>,
    by_name: HashMap<&'static str, u16>,
}

impl MessageTable {
    /// 테이블 생성
    ///
    /// # Panics
    /// 서로 다른 두 변형이 같은 ID(또는 같은 이름)를 가지면 패닉합니다.
    /// 테이블은 프로세스 시작 시 한 번만 만들어지므로 잘못된 선언은 즉시 드러납니다.
    pub fn new(name: &'static str, entries: &[(u16, &'static str)]) -> Self {
        let mut by_id = BTreeMap::new();
        let mut by_name = HashMap::new();

        for &(id, variant) in entries {
            if let Some(existing) = by_id.insert(id, variant) {
                panic!(
                    "{}: 메시지 ID {:#06x} 충돌 ({} / {})",
                    name, id, existing, variant
                );
            }
            if by_name.insert(variant, id).is_some() {
                panic!("{}: 메시지 이름 중복 ({})", name, variant);
            }
        }

        Self {
            name,
            by_id,
            by_name,
        }
    }

    /// 테이블 이름
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// ID로 변형 이름 조회
    pub fn name_of(&self, id: u16) -> Result<&'static str, ProtocolError> {
        self.by_id
            .get(&id)
            .copied()
            .ok_or(ProtocolError::UnknownMessage(id))
    }

    /// 변형 이름으로 ID 조회
    pub fn id_of(&self, variant: &str) -> Result<u16, ProtocolError> {
        self.by_name
            .get(variant)
            .copied()
            .ok_or_else(|| ProtocolError::UnknownMessageName(variant.to_string()))
    }

    /// 등록된 모든 ID (오름차순)
    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.by_id.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// 한 방향의 메시지 집합
///
/// `message_table!`이 생성하는 열거형이 구현합니다.
pub trait MessageSet: Sized + Debug + Send + 'static {
    /// 이 집합의 ID 테이블
    fn table() -> &'static MessageTable;

    /// 메시지 ID
    fn id(&self) -> u16;

    /// 변형 이름 (로그용)
    fn name(&self) -> &'static str;

    /// ID에 해당하는 기본값 메시지 생성
    fn build(id: u16) -> Result<Self, ProtocolError>;

    /// ID에 해당하는 본문 디코딩
    fn decode_body(id: u16, body: &mut Bytes) -> Result<Self, ProtocolError>;

    /// 본문 인코딩 (ID 제외)
    fn encode_body(&self, buf: &mut BytesMut);

    /// 평문 페이로드(ID + 본문) 디코딩
    ///
    /// 본문 뒤에 남는 바이트는 치명적이지 않으므로 디버그 로그만 남깁니다.
    fn decode_payload(mut payload: Bytes) -> Result<Self, ProtocolError> {
        if payload.remaining() < 2 {
            return Err(ProtocolError::ShortRead {
                context: "message id",
                needed: 2,
                remaining: payload.remaining(),
            });
        }
        let id = payload.get_u16_le();
        let message = Self::decode_body(id, &mut payload)?;
        if payload.has_remaining() {
            debug!(
                "{}: {} 뒤에 {}바이트가 남았습니다",
                Self::table().name(),
                message.name(),
                payload.remaining()
            );
        }
        Ok(message)
    }

    /// 평문 페이로드(ID + 본문) 인코딩
    fn encode_payload(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u16_le(self.id());
        self.encode_body(&mut buf);
        buf
    }
}

/// 메시지 집합 열거형과 테이블 선언
///
/// ```ignore
/// message_table! {
///     pub enum LoginClientMessage {
///         0x0001 => ClientLogin,
///         0x0003 => ClientSelectServer,
///     }
/// }
/// ```
#[macro_export]
macro_rules! message_table {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($id:literal => $variant:ident),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $($variant($variant)),*
        }

        impl $crate::protocol::table::MessageSet for $name {
            fn table() -> &'static $crate::protocol::table::MessageTable {
                static TABLE: $crate::protocol::table::Lazy<$crate::protocol::table::MessageTable> =
                    $crate::protocol::table::Lazy::new(|| {
                        $crate::protocol::table::MessageTable::new(
                            stringify!($name),
                            &[$(($id, stringify!($variant))),*],
                        )
                    });
                &TABLE
            }

            fn id(&self) -> u16 {
                match self {
                    $($name::$variant(_) => $id),*
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $($name::$variant(_) => stringify!($variant)),*
                }
            }

            fn build(id: u16) -> ::std::result::Result<Self, $crate::tool::error::ProtocolError> {
                match id {
                    $($id => Ok($name::$variant(<$variant as ::std::default::Default>::default())),)*
                    other => Err($crate::tool::error::ProtocolError::UnknownMessage(other)),
                }
            }

            fn decode_body(
                id: u16,
                body: &mut $crate::protocol::wire::Bytes,
            ) -> ::std::result::Result<Self, $crate::tool::error::ProtocolError> {
                match id {
                    $($id => Ok($name::$variant(
                        <$variant as $crate::protocol::wire::Wire>::decode(body)?,
                    )),)*
                    other => Err($crate::tool::error::ProtocolError::UnknownMessage(other)),
                }
            }

            fn encode_body(&self, buf: &mut $crate::protocol::wire::BytesMut) {
                match self {
                    $($name::$variant(message) => {
                        $crate::protocol::wire::Wire::encode(message, buf)
                    }),*
                }
            }
        }

        $(
            impl ::std::convert::From<$variant> for $name {
                fn from(message: $variant) -> Self {
                    $name::$variant(message)
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let table = MessageTable::new("Test", &[(0x0001, "Alpha"), (0x0040, "Beta")]);
        assert_eq!(table.name_of(0x0040).unwrap(), "Beta");
        assert_eq!(table.id_of("Alpha").unwrap(), 0x0001);
        assert_eq!(
            table.name_of(0x0002),
            Err(ProtocolError::UnknownMessage(0x0002))
        );
        assert!(matches!(
            table.id_of("Gamma"),
            Err(ProtocolError::UnknownMessageName(_))
        ));
        assert_eq!(table.ids().collect::<Vec<_>>(), vec![0x0001, 0x0040]);
    }

    #[test]
    #[should_panic(expected = "충돌")]
    fn test_id_collision_panics() {
        MessageTable::new("Test", &[(0x0001, "Alpha"), (0x0001, "Beta")]);
    }
}
