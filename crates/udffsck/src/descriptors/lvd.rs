//! Logical Volume Descriptor (ECMA-167 3/10.6) and its variable-length
//! partition map table.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::{Charspec, ExtentAd, RegId};
use crate::endian::{Le16, Le32};
use crate::error::{CheckError, Result};
use crate::tag::DescriptorTag;

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct LogicalVolumeDescriptor {
    pub tag: DescriptorTag,
    pub volume_descriptor_sequence_number: Le32,
    pub descriptor_character_set: Charspec,
    pub logical_volume_identifier: [u8; 128],
    pub logical_block_size: Le32,
    pub domain_identifier: RegId,
    /// Holds a `long_ad` pointing at the File Set Descriptor.
    pub logical_volume_contents_use: [u8; 16],
    pub map_table_length: Le32,
    pub number_of_partition_maps: Le32,
    pub implementation_identifier: RegId,
    pub implementation_use: [u8; 128],
    pub integrity_sequence_extent: ExtentAd,
}

impl LogicalVolumeDescriptor {
    pub const FIXED_SIZE: usize = 440;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::FIXED_SIZE])
    }

    pub fn fsd_location(&self) -> crate::descriptors::common::LongAd {
        *bytemuck::from_bytes(&self.logical_volume_contents_use[..crate::descriptors::common::LongAd::SIZE])
    }

    pub fn logical_volume_identifier_errors(&self) -> crate::dstring::DstringErrors {
        crate::dstring::verify(&self.logical_volume_identifier)
    }
}

impl std::fmt::Debug for LogicalVolumeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalVolumeDescriptor")
            .field("logical_volume_identifier", &crate::dstring::decode(&self.logical_volume_identifier))
            .field("logical_block_size", &self.logical_block_size.get())
            .field("number_of_partition_maps", &self.number_of_partition_maps.get())
            .finish_non_exhaustive()
    }
}

/// Type 1 (physical) partition map entry (ECMA-167 10.7.2). Virtual and
/// sparable partition maps (types 2) exist in the standard but are out of
/// scope here.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod, PartialEq, Eq)]
pub struct PartitionMapType1 {
    pub partition_map_type: u8,
    pub partition_map_length: u8,
    pub volume_sequence_number: Le16,
    pub partition_number: Le16,
}

impl PartitionMapType1 {
    pub const SIZE: usize = 6;
    pub const TYPE: u8 = 1;
}

/// Parse the partition map table that follows the LVD's fixed header.
/// Only type-1 maps are understood; any other type is reported as
/// unsupported rather than silently skipped, since the partition layout it
/// implies (virtual/sparable) cannot be resolved to a base LSN by this
/// crate.
pub fn parse_partition_maps(bytes: &[u8], count: u32) -> Result<Vec<PartitionMapType1>> {
    let mut maps = Vec::with_capacity(count as usize);
    let mut offset = 0usize;
    for _ in 0..count {
        if offset + 2 > bytes.len() {
            return Err(CheckError::UnsupportedStructure("truncated partition map table"));
        }
        let map_type = bytes[offset];
        let map_len = bytes[offset + 1] as usize;
        if map_type != PartitionMapType1::TYPE {
            return Err(CheckError::UnsupportedStructure(
                "only type-1 (physical) partition maps are supported",
            ));
        }
        if offset + map_len > bytes.len() {
            return Err(CheckError::UnsupportedStructure("truncated partition map entry"));
        }
        maps.push(*bytemuck::from_bytes::<PartitionMapType1>(
            &bytes[offset..offset + PartitionMapType1::SIZE],
        ));
        offset += map_len;
    }
    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(LogicalVolumeDescriptor, [u8; 440]);
    static_assertions::assert_eq_size!(PartitionMapType1, [u8; 6]);

    #[test]
    fn parses_single_type1_map() {
        let entry = PartitionMapType1 {
            partition_map_type: 1,
            partition_map_length: 6,
            volume_sequence_number: Le16::new(0),
            partition_number: Le16::new(0),
        };
        let bytes = bytemuck::bytes_of(&entry);
        let maps = parse_partition_maps(bytes, 1).unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].partition_number.get(), 0);
    }

    #[test]
    fn rejects_unknown_map_type() {
        let mut bytes = [0u8; 6];
        bytes[0] = 2;
        bytes[1] = 6;
        assert!(parse_partition_maps(&bytes, 1).is_err());
    }
}
