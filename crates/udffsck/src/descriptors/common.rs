//! Small value types shared by several descriptors (ECMA-167 1/7.1, 3/7.1,
//! 4/14.14.1).

use bytemuck::{Pod, Zeroable};

use crate::endian::{Le16, Le32};

/// `extent_ad`: a (length, location) pair addressing a byte range on the
/// medium directly, not partition-relative.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod, PartialEq, Eq)]
pub struct ExtentAd {
    pub length: Le32,
    pub location: Le32,
}

impl ExtentAd {
    pub const SIZE: usize = 8;
}

/// `lb_addr`: a logical block number relative to a partition reference
/// number (an index into the LVD's partition map table).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod, PartialEq, Eq)]
pub struct LbAddr {
    pub logical_block_number: Le32,
    pub partition_reference_number: Le16,
}

impl LbAddr {
    pub const SIZE: usize = 6;
}

/// `regid`: a 32-byte implementation/domain identifier, fixed width,
/// zero-padded.
#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct RegId {
    pub flags: u8,
    pub identifier: [u8; 23],
    pub identifier_suffix: [u8; 8],
}

impl RegId {
    pub const SIZE: usize = 32;

    pub fn new(identifier: &str) -> Self {
        let mut id = [0u8; 23];
        let bytes = identifier.as_bytes();
        let len = bytes.len().min(23);
        id[..len].copy_from_slice(&bytes[..len]);
        Self {
            flags: 0,
            identifier: id,
            identifier_suffix: [0; 8],
        }
    }

    pub fn identifier_str(&self) -> std::borrow::Cow<'_, str> {
        let end = self.identifier.iter().position(|&b| b == 0).unwrap_or(23);
        String::from_utf8_lossy(&self.identifier[..end])
    }
}

impl std::fmt::Debug for RegId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegId")
            .field("identifier", &self.identifier_str())
            .finish_non_exhaustive()
    }
}

/// `short_ad` (ECMA-167 4/14.14.1): a (length, location) pair addressing an
/// extent by partition-relative logical block. The two high bits of
/// `length` carry the extent type (recorded / allocated-unrecorded /
/// unallocated / next-AED) per [`crate::alloc::ExtentType`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod, PartialEq, Eq)]
pub struct ShortAd {
    pub length: Le32,
    pub position: Le32,
}

impl ShortAd {
    pub const SIZE: usize = 8;
}

/// `long_ad` (ECMA-167 4/14.14.2): an extent addressed with an explicit
/// partition reference, used wherever the reference partition may not be
/// the one the containing descriptor lives in (e.g. the FSD location in
/// the LVD, or any allocation descriptor under `AD_LONG`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod, PartialEq, Eq)]
pub struct LongAd {
    pub length: Le32,
    pub location: LbAddr,
    pub implementation_use: [u8; 6],
}

impl LongAd {
    pub const SIZE: usize = 16;
}

/// `charspec`: identifies the character set used by a dstring field.
#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct Charspec {
    pub charset_type: u8,
    pub charset_info: [u8; 63],
}

impl Charspec {
    pub const SIZE: usize = 64;

    pub const CS0: Self = Self {
        charset_type: 0,
        charset_info: *b"OSTA Compressed Unicode\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0",
    };
}

impl std::fmt::Debug for Charspec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Charspec")
            .field("charset_type", &self.charset_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(ExtentAd, [u8; 8]);
    static_assertions::assert_eq_size!(LbAddr, [u8; 6]);
    static_assertions::assert_eq_size!(RegId, [u8; 32]);
    static_assertions::assert_eq_size!(Charspec, [u8; 64]);
    static_assertions::assert_eq_size!(ShortAd, [u8; 8]);
    static_assertions::assert_eq_size!(LongAd, [u8; 16]);
}
