//! Unallocated Space Descriptor (ECMA-167 3/10.8): a list of extents on the
//! medium (outside any partition) not yet allocated to a partition.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::ExtentAd;
use crate::endian::Le32;
use crate::error::{CheckError, Result};
use crate::tag::DescriptorTag;

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct UnallocatedSpaceDescriptorHeader {
    pub tag: DescriptorTag,
    pub volume_descriptor_sequence_number: Le32,
    pub number_of_allocation_descriptors: Le32,
}

impl UnallocatedSpaceDescriptorHeader {
    pub const SIZE: usize = 24;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }
}

#[derive(Debug, Clone)]
pub struct UnallocatedSpaceDescriptor {
    pub header: UnallocatedSpaceDescriptorHeader,
    pub extents: Vec<ExtentAd>,
}

impl UnallocatedSpaceDescriptor {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < UnallocatedSpaceDescriptorHeader::SIZE {
            return Err(CheckError::UnsupportedStructure("truncated USD"));
        }
        let header = UnallocatedSpaceDescriptorHeader::from_bytes(bytes);
        let count = header.number_of_allocation_descriptors.get() as usize;
        let mut extents = Vec::with_capacity(count);
        let mut offset = UnallocatedSpaceDescriptorHeader::SIZE;
        for _ in 0..count {
            if offset + ExtentAd::SIZE > bytes.len() {
                return Err(CheckError::UnsupportedStructure("truncated USD extent list"));
            }
            extents.push(*bytemuck::from_bytes::<ExtentAd>(&bytes[offset..offset + ExtentAd::SIZE]));
            offset += ExtentAd::SIZE;
        }
        Ok(Self { header, extents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    static_assertions::assert_eq_size!(UnallocatedSpaceDescriptorHeader, [u8; 24]);
}
