//! File Identifier Descriptor (ECMA-167 4/14.4): one directory entry,
//! embedded back-to-back in a directory's recorded extents.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::LongAd;
use crate::endian::{Le16, Le32};
use crate::error::{CheckError, Result};
use crate::tag::{tag_identifier, DescriptorTag};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileCharacteristics: u8 {
        const HIDDEN   = 1 << 0;
        const DIRECTORY = 1 << 1;
        const DELETED  = 1 << 2;
        const PARENT   = 1 << 3;
        const METADATA = 1 << 4;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct FileIdentifierDescriptorHeader {
    pub tag: DescriptorTag,
    pub file_version_number: Le16,
    pub file_characteristics: u8,
    pub length_of_file_identifier: u8,
    pub icb: LongAd,
    pub length_of_implementation_use: Le16,
}

impl FileIdentifierDescriptorHeader {
    pub const SIZE: usize = 38;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn characteristics(&self) -> FileCharacteristics {
        FileCharacteristics::from_bits_truncate(self.file_characteristics)
    }
}

#[derive(Debug, Clone)]
pub struct FileIdentifierDescriptor {
    pub header: FileIdentifierDescriptorHeader,
    pub implementation_use: Vec<u8>,
    pub identifier: Vec<u8>,
}

impl FileIdentifierDescriptor {
    /// Total on-disk length of this record before 4-byte padding.
    pub fn unpadded_len(&self) -> usize {
        FileIdentifierDescriptorHeader::SIZE + self.implementation_use.len() + self.identifier.len()
    }

    /// On-disk length including the padding that aligns the next FID to a
    /// 4-byte boundary (spec §4.3.4).
    pub fn padded_len(&self) -> usize {
        (self.unpadded_len() + 3) & !3
    }

    /// `FID.icb.impUse[2..6]` read as a little-endian u32, the
    /// implementation-reserved slot this crate (and the reference
    /// implementation it follows) uses to carry a per-file unique ID.
    pub fn icb_unique_id(&self) -> u32 {
        u32::from_le_bytes(self.header.icb.implementation_use[2..6].try_into().unwrap())
    }

    pub fn set_icb_unique_id(&mut self, id: u32) {
        self.header.icb.implementation_use[2..6].copy_from_slice(&id.to_le_bytes());
    }

    pub fn identifier_errors(&self) -> crate::dstring::DstringErrors {
        crate::dstring::verify(&self.identifier)
    }

    /// Parse a single FID starting at `bytes[0]`; `bytes` must contain at
    /// least one full (unpadded) record. Returns the FID and the number of
    /// bytes consumed including alignment padding.
    pub fn parse(bytes: &[u8], location: u64) -> Result<(Self, usize)> {
        if bytes.len() < FileIdentifierDescriptorHeader::SIZE {
            return Err(CheckError::UnsupportedStructure("truncated FID header"));
        }
        let header = FileIdentifierDescriptorHeader::from_bytes(bytes);
        header.tag.expect_identifier(tag_identifier::FILE_IDENTIFIER_DESCRIPTOR, location)?;

        let impl_use_len = header.length_of_implementation_use.get() as usize;
        let ident_len = header.length_of_file_identifier as usize;
        let impl_use_start = FileIdentifierDescriptorHeader::SIZE;
        let ident_start = impl_use_start + impl_use_len;
        let end = ident_start + ident_len;
        if end > bytes.len() {
            return Err(CheckError::UnsupportedStructure("FID variable fields exceed buffer"));
        }

        let fid = Self {
            header,
            implementation_use: bytes[impl_use_start..ident_start].to_vec(),
            identifier: bytes[ident_start..end].to_vec(),
        };
        let padded = fid.padded_len();
        Ok((fid, padded))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = bytemuck::bytes_of(&self.header).to_vec();
        out.extend_from_slice(&self.implementation_use);
        out.extend_from_slice(&self.identifier);
        let padded = (out.len() + 3) & !3;
        out.resize(padded, 0);
        out
    }

    /// Recompute and install this FID's tag checksum and CRC after an
    /// in-place fix (spec §4.3.4's "recompute FID CRC and checksum").
    pub fn refresh_tag(&mut self, location: u64) {
        let payload_len = self.implementation_use.len() + self.identifier.len();
        let mut payload = self.implementation_use.clone();
        payload.extend_from_slice(&self.identifier);
        let padded_payload_len = (FileIdentifierDescriptorHeader::SIZE + payload_len + 3) & !3;
        payload.resize(padded_payload_len - FileIdentifierDescriptorHeader::SIZE, 0);
        self.header.tag = DescriptorTag::new(
            tag_identifier::FILE_IDENTIFIER_DESCRIPTOR,
            self.header.tag.descriptor_version.get(),
            self.header.tag.tag_serial_number.get(),
            location as u32,
            &payload,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(FileIdentifierDescriptorHeader, [u8; 38]);

    fn sample_fid(name: &[u8]) -> Vec<u8> {
        let icb = LongAd::default();
        let payload_tail = name.to_vec();
        let header = FileIdentifierDescriptorHeader {
            tag: DescriptorTag::new(tag_identifier::FILE_IDENTIFIER_DESCRIPTOR, 2, 1, 0, &{
                let mut p = vec![0u8; 16 + name.len()];
                p[16..].copy_from_slice(name);
                p
            }),
            file_version_number: Le16::new(1),
            file_characteristics: 0,
            length_of_file_identifier: name.len() as u8,
            icb,
            length_of_implementation_use: Le16::new(0),
        };
        let mut bytes = bytemuck::bytes_of(&header).to_vec();
        bytes.extend_from_slice(&payload_tail);
        bytes
    }

    #[test]
    fn parse_round_trips() {
        let raw = sample_fid(b"hello.txt");
        let (fid, consumed) = FileIdentifierDescriptor::parse(&raw, 0).unwrap();
        assert_eq!(fid.identifier, b"hello.txt");
        assert_eq!(consumed, (38 + 9 + 3) & !3);
    }

    #[test]
    fn padding_rounds_to_four() {
        let raw = sample_fid(b"ab"); // 38 + 2 = 40, already aligned
        let (_fid, consumed) = FileIdentifierDescriptor::parse(&raw, 0).unwrap();
        assert_eq!(consumed, 40);

        let raw = sample_fid(b"abc"); // 38 + 3 = 41, rounds to 44
        let (_fid, consumed) = FileIdentifierDescriptor::parse(&raw, 0).unwrap();
        assert_eq!(consumed, 44);
    }

    #[test]
    fn unique_id_round_trips_through_icb_impl_use() {
        let raw = sample_fid(b"x");
        let (mut fid, _) = FileIdentifierDescriptor::parse(&raw, 0).unwrap();
        fid.set_icb_unique_id(77);
        assert_eq!(fid.icb_unique_id(), 77);
    }
}
