//! The 16-byte descriptor tag (ECMA-167 7.2) that prefixes every UDF
//! descriptor, plus the checksum/CRC/position validation shared by all of
//! them.

use bytemuck::{Pod, Zeroable};
use crc::{Crc, CRC_16_XMODEM};

use crate::endian::{Le16, Le32};

/// ECMA-167's CRC is the ITU-T/XMODEM polynomial (x^16+x^12+x^5+1), no
/// reflection, zero init and xorout — mirrors how the closest reference
/// crate in this space wraps a fixed `crc::Crc` instance behind a tiny
/// checksum helper instead of hand-rolling the polynomial division.
const CRC_ITU_T: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

pub fn crc16(bytes: &[u8]) -> u16 {
    CRC_ITU_T.checksum(bytes)
}

pub mod tag_identifier {
    pub const SPARING_TABLE: u16 = 0;
    pub const PRIMARY_VOLUME_DESCRIPTOR: u16 = 1;
    pub const ANCHOR_VOLUME_DESCRIPTOR_POINTER: u16 = 2;
    pub const VOLUME_DESCRIPTOR_POINTER: u16 = 3;
    pub const IMPLEMENTATION_USE_VOLUME_DESCRIPTOR: u16 = 4;
    pub const PARTITION_DESCRIPTOR: u16 = 5;
    pub const LOGICAL_VOLUME_DESCRIPTOR: u16 = 6;
    pub const UNALLOCATED_SPACE_DESCRIPTOR: u16 = 7;
    pub const TERMINATING_DESCRIPTOR: u16 = 8;
    pub const LOGICAL_VOLUME_INTEGRITY_DESCRIPTOR: u16 = 9;
    pub const FILE_SET_DESCRIPTOR: u16 = 256;
    pub const FILE_IDENTIFIER_DESCRIPTOR: u16 = 257;
    pub const ALLOCATION_EXTENT_DESCRIPTOR: u16 = 258;
    pub const INDIRECT_ENTRY: u16 = 259;
    pub const TERMINAL_ENTRY: u16 = 260;
    pub const FILE_ENTRY: u16 = 261;
    pub const EXTENDED_ATTRIBUTE_HEADER_DESCRIPTOR: u16 = 262;
    pub const UNALLOCATED_SPACE_ENTRY: u16 = 263;
    pub const SPACE_BITMAP_DESCRIPTOR: u16 = 264;
    pub const PARTITION_INTEGRITY_ENTRY: u16 = 265;
    pub const EXTENDED_FILE_ENTRY: u16 = 266;
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct DescriptorTag {
    pub tag_identifier: Le16,
    pub descriptor_version: Le16,
    pub tag_checksum: u8,
    pub reserved: u8,
    pub tag_serial_number: Le16,
    pub descriptor_crc: Le16,
    pub descriptor_crc_length: Le16,
    pub tag_location: Le32,
}

impl DescriptorTag {
    pub const SIZE: usize = 16;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        *bytemuck::bytes_of(self).try_into().expect("tag is 16 bytes")
    }

    /// 8-bit sum of bytes 0..16, excluding byte 4 (the checksum byte itself).
    pub fn calculate_checksum(bytes: &[u8; Self::SIZE]) -> u8 {
        bytes[0..4]
            .iter()
            .chain(bytes[5..16].iter())
            .fold(0u8, |acc, &b| acc.wrapping_add(b))
    }

    /// Verify checksum, recorded location, and (if `full_descriptor` covers
    /// it) CRC. Each failing check is reported independently so callers can
    /// OR the results into a slot's error mask rather than stopping at the
    /// first problem.
    pub fn verify(&self, full_descriptor: &[u8], actual_location: u64) -> TagErrors {
        let raw = self.to_bytes();
        let mut errors = TagErrors::empty();

        if Self::calculate_checksum(&raw) != self.tag_checksum {
            errors |= TagErrors::CHECKSUM;
        }
        if self.tag_location.get() as u64 != actual_location {
            errors |= TagErrors::POSITION;
        }
        let crc_len = self.descriptor_crc_length.get() as usize;
        if crc_len > 0 {
            let end = (Self::SIZE + crc_len).min(full_descriptor.len());
            if end <= Self::SIZE || crc16(&full_descriptor[Self::SIZE..end]) != self.descriptor_crc.get() {
                errors |= TagErrors::CRC;
            }
        }
        errors
    }

    pub fn expect_identifier(&self, expected: u16, location: u64) -> Result<(), crate::error::CheckError> {
        if self.tag_identifier.get() != expected {
            return Err(crate::error::CheckError::InvalidDescriptorTag {
                expected,
                found: self.tag_identifier.get(),
                location,
            });
        }
        Ok(())
    }

    /// Build a tag for a freshly written descriptor: checksum and CRC are
    /// computed from `payload` (everything after the tag).
    pub fn new(identifier: u16, version: u16, serial: u16, location: u32, payload: &[u8]) -> Self {
        let mut tag = Self {
            tag_identifier: Le16::new(identifier),
            descriptor_version: Le16::new(version),
            tag_checksum: 0,
            reserved: 0,
            tag_serial_number: Le16::new(serial),
            descriptor_crc: Le16::new(crc16(payload)),
            descriptor_crc_length: Le16::new(payload.len() as u16),
            tag_location: Le32::new(location),
        };
        let raw = tag.to_bytes();
        tag.tag_checksum = Self::calculate_checksum(&raw);
        tag
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TagErrors: u8 {
        const CHECKSUM = 1 << 0;
        const CRC      = 1 << 1;
        const POSITION = 1 << 2;
        const WRONGDESC = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(DescriptorTag, [u8; 16]);

    #[test]
    fn checksum_excludes_own_byte() {
        let mut raw = [0u8; 16];
        raw[0] = 1;
        raw[4] = 0xAA; // checksum byte, must not contribute
        let sum: u8 = raw.iter().enumerate().filter(|&(i, _)| i != 4).map(|(_, &b)| b).fold(0, |a, b| a.wrapping_add(b));
        assert_eq!(DescriptorTag::calculate_checksum(&raw), sum);
    }

    #[test]
    fn new_tag_round_trips() {
        let payload = b"some descriptor payload bytes";
        let tag = DescriptorTag::new(tag_identifier::FILE_SET_DESCRIPTOR, 3, 1, 42, payload);
        let mut full = tag.to_bytes().to_vec();
        full.extend_from_slice(payload);
        let errors = tag.verify(&full, 42);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn wrong_location_is_reported() {
        let payload = b"x";
        let tag = DescriptorTag::new(tag_identifier::FILE_ENTRY, 3, 1, 42, payload);
        let mut full = tag.to_bytes().to_vec();
        full.extend_from_slice(payload);
        let errors = tag.verify(&full, 43);
        assert!(errors.contains(TagErrors::POSITION));
    }
}
