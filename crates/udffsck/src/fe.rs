//! File Entry / Extended File Entry (ECMA-167 4/14.9, 4/14.17): per-file
//! metadata plus the embedded allocation-descriptor area the walker
//! dereferences.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::LbAddr;
use crate::endian::{Le16, Le32, Le64};
use crate::error::{CheckError, Result};
use crate::tag::{tag_identifier, DescriptorTag};
use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Unspecified,
    UnallocatedSpaceEntry,
    PartitionIntegrityEntry,
    IndirectEntry,
    Directory,
    Regular,
    BlockDevice,
    CharDevice,
    ExtendedAttributes,
    Fifo,
    Socket,
    TerminalEntry,
    Symlink,
    StreamDirectory,
    Other(u8),
}

impl FileType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Unspecified,
            1 => Self::UnallocatedSpaceEntry,
            2 => Self::PartitionIntegrityEntry,
            3 => Self::IndirectEntry,
            4 => Self::Directory,
            5 => Self::Regular,
            6 => Self::BlockDevice,
            7 => Self::CharDevice,
            8 => Self::ExtendedAttributes,
            9 => Self::Fifo,
            10 => Self::Socket,
            11 => Self::TerminalEntry,
            12 => Self::Symlink,
            13 => Self::StreamDirectory,
            other => Self::Other(other),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
pub struct IcbTag {
    pub prior_recorded_number_of_direct_entries: Le32,
    pub strategy_type: Le16,
    pub strategy_parameter: Le16,
    pub maximum_number_of_entries: Le16,
    pub reserved: u8,
    pub file_type: u8,
    pub parent_icb_location: LbAddr,
    pub flags: Le16,
}

impl IcbTag {
    pub const SIZE: usize = 20;

    pub fn ad_kind(&self) -> crate::alloc::AdKind {
        crate::alloc::AdKind::from_icb_flags(self.flags.get())
    }

    pub fn kind(&self) -> FileType {
        FileType::from_u8(self.file_type)
    }
}

/// Fields common to both FE and EFE, used by the walker after dispatching
/// on the tag identifier so downstream logic doesn't duplicate per-variant.
#[derive(Debug, Clone, Copy)]
pub struct FileEntryCommon {
    pub icb_tag: IcbTag,
    pub uid: u32,
    pub gid: u32,
    pub permissions: u32,
    pub file_link_count: u16,
    pub information_length: u64,
    pub logical_blocks_recorded: u64,
    pub modification_time: Timestamp,
    pub unique_id: u64,
    pub length_of_extended_attributes: u32,
    pub length_of_allocation_descriptors: u32,
    pub tag_serial_number: u16,
    pub tag: DescriptorTag,
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct FileEntryHeader {
    pub tag: DescriptorTag,
    pub icb_tag: IcbTag,
    pub uid: Le32,
    pub gid: Le32,
    pub permissions: Le32,
    pub file_link_count: Le16,
    pub record_format: u8,
    pub record_display_attributes: u8,
    pub record_length: Le32,
    pub information_length: Le64,
    pub logical_blocks_recorded: Le64,
    pub access_time: Timestamp,
    pub modification_time: Timestamp,
    pub attribute_time: Timestamp,
    pub checkpoint: Le32,
    pub extended_attribute_icb: crate::descriptors::common::LongAd,
    pub implementation_identifier: crate::descriptors::common::RegId,
    pub unique_id: Le64,
    pub length_of_extended_attributes: Le32,
    pub length_of_allocation_descriptors: Le32,
}

impl FileEntryHeader {
    pub const SIZE: usize = 176;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn common(&self) -> FileEntryCommon {
        FileEntryCommon {
            icb_tag: self.icb_tag,
            uid: self.uid.get(),
            gid: self.gid.get(),
            permissions: self.permissions.get(),
            file_link_count: self.file_link_count.get(),
            information_length: self.information_length.get(),
            logical_blocks_recorded: self.logical_blocks_recorded.get(),
            modification_time: self.modification_time,
            unique_id: self.unique_id.get(),
            length_of_extended_attributes: self.length_of_extended_attributes.get(),
            length_of_allocation_descriptors: self.length_of_allocation_descriptors.get(),
            tag_serial_number: self.tag.tag_serial_number.get(),
            tag: self.tag,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct ExtendedFileEntryHeader {
    pub tag: DescriptorTag,
    pub icb_tag: IcbTag,
    pub uid: Le32,
    pub gid: Le32,
    pub permissions: Le32,
    pub file_link_count: Le16,
    pub record_format: u8,
    pub record_display_attributes: u8,
    pub record_length: Le32,
    pub information_length: Le64,
    pub object_size: Le64,
    pub logical_blocks_recorded: Le64,
    pub access_time: Timestamp,
    pub modification_time: Timestamp,
    pub creation_time: Timestamp,
    pub attribute_time: Timestamp,
    pub checkpoint: Le32,
    pub reserved: Le32,
    pub extended_attribute_icb: crate::descriptors::common::LongAd,
    pub stream_directory_icb: crate::descriptors::common::LongAd,
    pub implementation_identifier: crate::descriptors::common::RegId,
    pub unique_id: Le64,
    pub length_of_extended_attributes: Le32,
    pub length_of_allocation_descriptors: Le32,
}

impl ExtendedFileEntryHeader {
    pub const SIZE: usize = 216;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn common(&self) -> FileEntryCommon {
        FileEntryCommon {
            icb_tag: self.icb_tag,
            uid: self.uid.get(),
            gid: self.gid.get(),
            permissions: self.permissions.get(),
            file_link_count: self.file_link_count.get(),
            information_length: self.information_length.get(),
            logical_blocks_recorded: self.logical_blocks_recorded.get(),
            modification_time: self.modification_time,
            unique_id: self.unique_id.get(),
            length_of_extended_attributes: self.length_of_extended_attributes.get(),
            length_of_allocation_descriptors: self.length_of_allocation_descriptors.get(),
            tag_serial_number: self.tag.tag_serial_number.get(),
            tag: self.tag,
        }
    }
}

/// Either variant, dispatched on tag identifier: each arm below validates
/// against its own identifier constant, not a shared one.
#[derive(Debug, Clone)]
pub enum FileEntry {
    Short(Box<FileEntryHeader>),
    Extended(Box<ExtendedFileEntryHeader>),
}

impl FileEntry {
    pub fn parse(bytes: &[u8], location: u64) -> Result<Self> {
        if bytes.len() < DescriptorTag::SIZE {
            return Err(CheckError::UnsupportedStructure("truncated FE/EFE tag"));
        }
        let tag = DescriptorTag::from_bytes(bytes);
        match tag.tag_identifier.get() {
            tag_identifier::FILE_ENTRY => {
                if bytes.len() < FileEntryHeader::SIZE {
                    return Err(CheckError::UnsupportedStructure("truncated FE"));
                }
                tag.expect_identifier(tag_identifier::FILE_ENTRY, location)?;
                Ok(Self::Short(Box::new(FileEntryHeader::from_bytes(bytes))))
            }
            tag_identifier::EXTENDED_FILE_ENTRY => {
                if bytes.len() < ExtendedFileEntryHeader::SIZE {
                    return Err(CheckError::UnsupportedStructure("truncated EFE"));
                }
                tag.expect_identifier(tag_identifier::EXTENDED_FILE_ENTRY, location)?;
                Ok(Self::Extended(Box::new(ExtendedFileEntryHeader::from_bytes(bytes))))
            }
            found => Err(CheckError::InvalidDescriptorTag {
                expected: tag_identifier::FILE_ENTRY,
                found,
                location,
            }),
        }
    }

    pub fn common(&self) -> FileEntryCommon {
        match self {
            Self::Short(fe) => fe.common(),
            Self::Extended(efe) => efe.common(),
        }
    }

    pub fn header_size(&self) -> usize {
        match self {
            Self::Short(_) => FileEntryHeader::SIZE,
            Self::Extended(_) => ExtendedFileEntryHeader::SIZE,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }

    pub fn set_unique_id(&mut self, id: u64) {
        match self {
            Self::Short(fe) => fe.unique_id = Le64::new(id),
            Self::Extended(efe) => efe.unique_id = Le64::new(id),
        }
    }

    fn tag_mut(&mut self) -> &mut DescriptorTag {
        match self {
            Self::Short(fe) => &mut fe.tag,
            Self::Extended(efe) => &mut efe.tag,
        }
    }

    /// Raw bytes of just the fixed header (tag included), reflecting
    /// whatever in-memory field edits have been made so far.
    pub fn header_bytes(&self) -> Vec<u8> {
        match self {
            Self::Short(fe) => bytemuck::bytes_of(fe.as_ref()).to_vec(),
            Self::Extended(efe) => bytemuck::bytes_of(efe.as_ref()).to_vec(),
        }
    }

    /// Recompute this entry's tag checksum/CRC after an in-place header
    /// field edit. `tail` is the extended-attribute + allocation-descriptor
    /// bytes following the header, untouched by the fix but still covered
    /// by the tag's CRC.
    pub fn refresh_tag(&mut self, location: u64, tail: &[u8]) {
        let identifier = match self {
            Self::Short(_) => tag_identifier::FILE_ENTRY,
            Self::Extended(_) => tag_identifier::EXTENDED_FILE_ENTRY,
        };
        let (version, serial) = {
            let tag = self.tag_mut();
            (tag.descriptor_version.get(), tag.tag_serial_number.get())
        };
        let mut payload = self.header_bytes()[DescriptorTag::SIZE..].to_vec();
        payload.extend_from_slice(tail);
        let tag = DescriptorTag::new(identifier, version, serial, location as u32, &payload);
        *self.tag_mut() = tag;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(IcbTag, [u8; 20]);
    static_assertions::assert_eq_size!(FileEntryHeader, [u8; 176]);
    static_assertions::assert_eq_size!(ExtendedFileEntryHeader, [u8; 216]);

    fn make_fe(tag_id: u16, size: usize) -> Vec<u8> {
        let payload = vec![0u8; size - DescriptorTag::SIZE];
        let tag = DescriptorTag::new(tag_id, 3, 1, 0, &payload);
        let mut out = tag.to_bytes().to_vec();
        out.extend_from_slice(&payload);
        out
    }

    #[test]
    fn dispatches_on_tag_identifier() {
        let fe_bytes = make_fe(tag_identifier::FILE_ENTRY, FileEntryHeader::SIZE);
        match FileEntry::parse(&fe_bytes, 0).unwrap() {
            FileEntry::Short(_) => {}
            FileEntry::Extended(_) => panic!("expected FE"),
        }

        let efe_bytes = make_fe(tag_identifier::EXTENDED_FILE_ENTRY, ExtendedFileEntryHeader::SIZE);
        match FileEntry::parse(&efe_bytes, 0).unwrap() {
            FileEntry::Extended(_) => {}
            FileEntry::Short(_) => panic!("expected EFE"),
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let bytes = make_fe(tag_identifier::FILE_IDENTIFIER_DESCRIPTOR, FileEntryHeader::SIZE);
        assert!(FileEntry::parse(&bytes, 0).is_err());
    }
}
