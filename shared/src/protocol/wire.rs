//! 바이너리 코덱 기본 타입
//!
//! 모든 메시지 레이아웃은 리틀 엔디언 고정 배치입니다. 필드 타입별로
//! [`Wire`]를 구현하고, 메시지 구조체는 `wire_struct!`, 태그 기반 하위 유니온은
//! `wire_union!` 매크로로 선언합니다.
//!
//! | 타입 | 배치 |
//! |------|------|
//! | `String` | `u16` 길이 + 바이트 |
//! | `FixedStr<N>` | `N`바이트, 남는 공간은 NUL |
//! | `FixedBytes<N>` | `N`바이트 그대로 |
//! | `List8/16/32<T>` | 개수(`u8`/`u16`/`u32`) + 원소 |
//! | `Rest` | 남은 바이트 전부 |

use std::ops::{Deref, DerefMut};

pub use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::tool::error::ProtocolError;

/// 와이어 인코딩/디코딩 가능한 타입
pub trait Wire: Sized {
    /// 디코딩에 필요한 최소 바이트 수
    ///
    /// 개수가 앞에 붙는 목록을 디코딩할 때 개수와 남은 버퍼가 맞는지 검사하는 데 사용합니다.
    const MIN_SIZE: usize;

    fn encode(&self, buf: &mut BytesMut);

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError>;
}

/// 남은 버퍼가 `needed` 이상인지 확인
pub fn ensure_remaining(
    buf: &Bytes,
    needed: usize,
    context: &'static str,
) -> Result<(), ProtocolError> {
    if buf.remaining() < needed {
        return Err(ProtocolError::ShortRead {
            context,
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

macro_rules! wire_primitive {
    ($($ty:ty => $get:ident, $put:ident;)*) => {
        $(
            impl Wire for $ty {
                const MIN_SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(&self, buf: &mut BytesMut) {
                    buf.$put(*self);
                }

                fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
                    ensure_remaining(buf, Self::MIN_SIZE, stringify!($ty))?;
                    Ok(buf.$get())
                }
            }
        )*
    };
}

wire_primitive! {
    u8 => get_u8, put_u8;
    i8 => get_i8, put_i8;
    u16 => get_u16_le, put_u16_le;
    i16 => get_i16_le, put_i16_le;
    u32 => get_u32_le, put_u32_le;
    i32 => get_i32_le, put_i32_le;
    u64 => get_u64_le, put_u64_le;
    i64 => get_i64_le, put_i64_le;
    f32 => get_f32_le, put_f32_le;
}

impl Wire for bool {
    const MIN_SIZE: usize = 1;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(u8::from(*self));
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(u8::decode(buf)? != 0)
    }
}

/// 길이 접두 문자열 (`u16` 길이 + 바이트)
impl Wire for String {
    const MIN_SIZE: usize = 2;

    fn encode(&self, buf: &mut BytesMut) {
        let bytes = self.as_bytes();
        let len = bytes.len().min(u16::MAX as usize);
        buf.put_u16_le(len as u16);
        buf.put_slice(&bytes[..len]);
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        let len = u16::decode(buf)? as usize;
        ensure_remaining(buf, len, "String")?;
        let raw = buf.split_to(len);
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

impl<T: Wire, const N: usize> Wire for [T; N] {
    const MIN_SIZE: usize = T::MIN_SIZE * N;

    fn encode(&self, buf: &mut BytesMut) {
        for item in self {
            item.encode(buf);
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        let items = (0..N)
            .map(|_| T::decode(buf))
            .collect::<Result<Vec<T>, _>>()?;
        items.try_into().map_err(|rest: Vec<T>| ProtocolError::SizeMismatch {
            context: "array",
            count: rest.len(),
            remaining: buf.remaining(),
        })
    }
}

/// 고정 폭 문자열 (남는 공간은 NUL로 채움)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedStr<const N: usize>(pub String);

impl<const N: usize> FixedStr<N> {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> From<&str> for FixedStr<N> {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<const N: usize> From<String> for FixedStr<N> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<const N: usize> Wire for FixedStr<N> {
    const MIN_SIZE: usize = N;

    fn encode(&self, buf: &mut BytesMut) {
        let bytes = self.0.as_bytes();
        let len = bytes.len().min(N);
        buf.put_slice(&bytes[..len]);
        buf.put_bytes(0, N - len);
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, N, "FixedStr")?;
        let raw = buf.split_to(N);
        let end = raw.iter().position(|&b| b == 0).unwrap_or(N);
        Ok(Self(String::from_utf8_lossy(&raw[..end]).into_owned()))
    }
}

/// 의미를 모르는 고정 길이 바이트 블록
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBytes<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for FixedBytes<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> Wire for FixedBytes<N> {
    const MIN_SIZE: usize = N;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.0);
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure_remaining(buf, N, "FixedBytes")?;
        let mut out = [0u8; N];
        buf.copy_to_slice(&mut out);
        Ok(Self(out))
    }
}

/// 메시지 끝까지 남은 바이트 (의미를 해석하지 않고 그대로 중계)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rest(pub Vec<u8>);

impl From<&[u8]> for Rest {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl Wire for Rest {
    const MIN_SIZE: usize = 0;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.0);
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        let len = buf.remaining();
        Ok(Self(buf.split_to(len).to_vec()))
    }
}

macro_rules! sized_list {
    ($(#[$meta:meta])* $name:ident, $count:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name<T>(pub Vec<T>);

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self(Vec::new())
            }
        }

        impl<T> From<Vec<T>> for $name<T> {
            fn from(items: Vec<T>) -> Self {
                Self(items)
            }
        }

        impl<T> Deref for $name<T> {
            type Target = Vec<T>;

            fn deref(&self) -> &Vec<T> {
                &self.0
            }
        }

        impl<T> DerefMut for $name<T> {
            fn deref_mut(&mut self) -> &mut Vec<T> {
                &mut self.0
            }
        }

        impl<T: Wire> Wire for $name<T> {
            const MIN_SIZE: usize = std::mem::size_of::<$count>();

            fn encode(&self, buf: &mut BytesMut) {
                let count = self.0.len().min(<$count>::MAX as usize);
                (count as $count).encode(buf);
                for item in self.0.iter().take(count) {
                    item.encode(buf);
                }
            }

            fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
                let count = <$count>::decode(buf)? as usize;
                if count.saturating_mul(T::MIN_SIZE) > buf.remaining() {
                    return Err(ProtocolError::SizeMismatch {
                        context: stringify!($name),
                        count,
                        remaining: buf.remaining(),
                    });
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(T::decode(buf)?);
                }
                Ok(Self(items))
            }
        }
    };
}

sized_list!(
    /// `u8` 개수 접두 목록
    List8,
    u8
);
sized_list!(
    /// `u16` 개수 접두 목록
    List16,
    u16
);
sized_list!(
    /// `u32` 개수 접두 목록
    List32,
    u32
);

/// 필드를 순서대로 인코딩하는 메시지 구조체 선언
///
/// # Examples
/// ```
/// use shared::wire_struct;
/// use shared::protocol::wire::{Bytes, BytesMut, Wire};
///
/// wire_struct! {
///     pub struct Ping {
///         pub seq: u32,
///         pub note: String,
///     }
/// }
///
/// let mut buf = BytesMut::new();
/// Ping { seq: 7, note: "hi".into() }.encode(&mut buf);
/// let back = Ping::decode(&mut Bytes::from(buf.to_vec())).unwrap();
/// assert_eq!(back.seq, 7);
/// ```
#[macro_export]
macro_rules! wire_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $($(#[$fmeta])* $fvis $field: $fty),*
        }

        impl $crate::protocol::wire::Wire for $name {
            const MIN_SIZE: usize = 0 $(+ <$fty as $crate::protocol::wire::Wire>::MIN_SIZE)*;

            #[allow(unused_variables)]
            fn encode(&self, buf: &mut $crate::protocol::wire::BytesMut) {
                $($crate::protocol::wire::Wire::encode(&self.$field, buf);)*
            }

            #[allow(unused_variables)]
            fn decode(
                buf: &mut $crate::protocol::wire::Bytes,
            ) -> ::std::result::Result<Self, $crate::tool::error::ProtocolError> {
                Ok(Self {
                    $($field: <$fty as $crate::protocol::wire::Wire>::decode(buf)?),*
                })
            }
        }
    };
}

/// 태그 값으로 본문 배치가 갈리는 하위 유니온 선언
///
/// 첫 번째 변형이 `Default` 값이 됩니다.
#[macro_export]
macro_rules! wire_union {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $tag:ty {
            $first:ident = $first_val:literal { $($first_field:ident : $first_ty:ty),* $(,)? }
            $(, $variant:ident = $val:literal { $($field:ident : $fty:ty),* $(,)? })* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $first { $($first_field: $first_ty),* },
            $($variant { $($field: $fty),* },)*
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$first { $($first_field: Default::default()),* }
            }
        }

        impl $name {
            /// 와이어에 기록되는 구분자 값
            pub fn tag(&self) -> $tag {
                match self {
                    $name::$first { .. } => $first_val,
                    $($name::$variant { .. } => $val,)*
                }
            }
        }

        impl $crate::protocol::wire::Wire for $name {
            const MIN_SIZE: usize = <$tag as $crate::protocol::wire::Wire>::MIN_SIZE;

            fn encode(&self, buf: &mut $crate::protocol::wire::BytesMut) {
                $crate::protocol::wire::Wire::encode(&self.tag(), buf);
                match self {
                    $name::$first { $($first_field),* } => {
                        $($crate::protocol::wire::Wire::encode($first_field, buf);)*
                    }
                    $($name::$variant { $($field),* } => {
                        $($crate::protocol::wire::Wire::encode($field, buf);)*
                    })*
                }
            }

            fn decode(
                buf: &mut $crate::protocol::wire::Bytes,
            ) -> ::std::result::Result<Self, $crate::tool::error::ProtocolError> {
                let tag = <$tag as $crate::protocol::wire::Wire>::decode(buf)?;
                match tag {
                    $first_val => Ok($name::$first {
                        $($first_field: <$first_ty as $crate::protocol::wire::Wire>::decode(buf)?),*
                    }),
                    $($val => Ok($name::$variant {
                        $($field: <$fty as $crate::protocol::wire::Wire>::decode(buf)?),*
                    }),)*
                    other => Err($crate::tool::error::ProtocolError::UnknownDiscriminator {
                        context: stringify!($name),
                        value: other as u32,
                    }),
                }
            }
        }
    };
}
