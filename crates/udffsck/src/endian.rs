//! Little-endian integer wrappers for on-disk structures.
//!
//! UDF stores every multi-byte integer little-endian regardless of host
//! byte order, so unlike a format that supports both encodings, a single
//! marker type is enough here. The wrapper still exists (rather than plain
//! `u16`/`u32`/`u64` fields) so every on-disk struct self-documents which
//! fields are raw bytes-on-medium, and the byte-swap happens once at the
//! read/write boundary instead of being scattered through call sites.
use bytemuck::{Pod, Zeroable};
use std::fmt;

/// Marker for an on-disk integer encoding. Only `LittleEndian` is used by
/// this crate; the trait exists so the `U16`/`U32`/`U64` wrappers below are
/// generic rather than hard-coded, matching how the reference ISO9660 crate
/// factors its endian-aware integer types.
pub trait Endian: Copy + Zeroable + Pod {
    fn get_u16(bytes: [u8; 2]) -> u16;
    fn set_u16(value: u16) -> [u8; 2];
    fn get_u32(bytes: [u8; 4]) -> u32;
    fn set_u32(value: u32) -> [u8; 4];
    fn get_u64(bytes: [u8; 8]) -> u64;
    fn set_u64(value: u64) -> [u8; 8];
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, Zeroable, Pod)]
pub struct LittleEndian;

impl Endian for LittleEndian {
    fn get_u16(bytes: [u8; 2]) -> u16 {
        u16::from_le_bytes(bytes)
    }
    fn set_u16(value: u16) -> [u8; 2] {
        value.to_le_bytes()
    }
    fn get_u32(bytes: [u8; 4]) -> u32 {
        u32::from_le_bytes(bytes)
    }
    fn set_u32(value: u32) -> [u8; 4] {
        value.to_le_bytes()
    }
    fn get_u64(bytes: [u8; 8]) -> u64 {
        u64::from_le_bytes(bytes)
    }
    fn set_u64(value: u64) -> [u8; 8] {
        value.to_le_bytes()
    }
}

macro_rules! endian_int {
    ($name:ident, $raw:ty, $prim:ty, $get:ident, $set:ident) => {
        #[repr(transparent)]
        #[derive(Clone, Copy, Zeroable, Pod)]
        pub struct $name<E: Endian> {
            bytes: $raw,
            _marker: core::marker::PhantomData<E>,
        }

        impl<E: Endian> $name<E> {
            pub fn new(value: $prim) -> Self {
                Self {
                    bytes: E::$set(value),
                    _marker: core::marker::PhantomData,
                }
            }

            pub fn get(&self) -> $prim {
                E::$get(self.bytes)
            }

            pub fn set(&mut self, value: $prim) {
                self.bytes = E::$set(value);
            }
        }

        impl<E: Endian> Default for $name<E> {
            fn default() -> Self {
                Self::new(0)
            }
        }

        impl<E: Endian> fmt::Debug for $name<E> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.get())
            }
        }

        impl<E: Endian> PartialEq for $name<E> {
            fn eq(&self, other: &Self) -> bool {
                self.get() == other.get()
            }
        }
        impl<E: Endian> Eq for $name<E> {}
    };
}

endian_int!(U16, [u8; 2], u16, get_u16, set_u16);
endian_int!(U32, [u8; 4], u32, get_u32, set_u32);
endian_int!(U64, [u8; 8], u64, get_u64, set_u64);

pub type Le16 = U16<LittleEndian>;
pub type Le32 = U32<LittleEndian>;
pub type Le64 = U64<LittleEndian>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u16_roundtrip() {
        let mut v: Le16 = Le16::new(0x1234);
        assert_eq!(v.get(), 0x1234);
        v.set(0xffee);
        assert_eq!(v.get(), 0xffee);
        assert_eq!(bytemuck::bytes_of(&v), &[0xee, 0xff]);
    }

    #[test]
    fn u32_roundtrip() {
        let v: Le32 = Le32::new(0xdead_beef);
        assert_eq!(bytemuck::bytes_of(&v), &[0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(v.get(), 0xdead_beef);
    }
}
