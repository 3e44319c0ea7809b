//! Partition Descriptor (ECMA-167 3/10.5): defines the LBN-to-LSN mapping
//! for one partition, plus (embedded in `partition_contents_use`) the space
//! management tables that partition's files are accounted against.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::{RegId, ShortAd};
use crate::endian::{Le16, Le32};
use crate::tag::DescriptorTag;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PartitionFlags: u16 {
        const ALLOCATED = 1 << 0;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
pub struct PartitionHeaderDescriptor {
    pub unallocated_space_table: ShortAd,
    pub unallocated_space_bitmap: ShortAd,
    pub partition_integrity_table: ShortAd,
    pub freed_space_table: ShortAd,
    pub freed_space_bitmap: ShortAd,
    pub reserved: [u8; 88],
}

impl PartitionHeaderDescriptor {
    pub const SIZE: usize = 128;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn has_space_bitmap(&self) -> bool {
        self.unallocated_space_bitmap.length.get() > 0
    }
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct PartitionDescriptor {
    pub tag: DescriptorTag,
    pub volume_descriptor_sequence_number: Le32,
    pub partition_flags: Le16,
    pub partition_number: Le16,
    pub partition_contents: RegId,
    pub partition_contents_use: [u8; 128],
    pub access_type: Le32,
    pub partition_starting_location: Le32,
    pub partition_length: Le32,
    pub implementation_identifier: RegId,
    pub implementation_use: [u8; 128],
    pub reserved: [u8; 156],
}

impl PartitionDescriptor {
    pub const SIZE: usize = 512;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn header(&self) -> PartitionHeaderDescriptor {
        PartitionHeaderDescriptor::from_bytes(&self.partition_contents_use)
    }

    /// Absolute LSN for a partition-relative logical block number.
    pub fn lbn_to_lsn(&self, lbn: u32) -> u64 {
        self.partition_starting_location.get() as u64 + lbn as u64
    }
}

impl std::fmt::Debug for PartitionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionDescriptor")
            .field("partition_number", &self.partition_number.get())
            .field("partition_starting_location", &self.partition_starting_location.get())
            .field("partition_length", &self.partition_length.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(PartitionHeaderDescriptor, [u8; 128]);
    static_assertions::assert_eq_size!(PartitionDescriptor, [u8; 512]);

    #[test]
    fn lbn_to_lsn_adds_partition_base() {
        let mut pd = unsafe { std::mem::zeroed::<PartitionDescriptor>() };
        pd.partition_starting_location = Le32::new(1000);
        assert_eq!(pd.lbn_to_lsn(5), 1005);
    }
}
