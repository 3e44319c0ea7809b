//! Implementation Use Volume Descriptor (ECMA-167 3/10.4): free-form,
//! implementation-identified payload. Carries no semantics this crate
//! interprets beyond validating its tag.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::RegId;
use crate::endian::Le32;
use crate::tag::DescriptorTag;

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct ImplementationUseVolumeDescriptor {
    pub tag: DescriptorTag,
    pub volume_descriptor_sequence_number: Le32,
    pub implementation_identifier: RegId,
    pub implementation_use: [u8; 460],
}

impl ImplementationUseVolumeDescriptor {
    pub const SIZE: usize = 512;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }
}

impl std::fmt::Debug for ImplementationUseVolumeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplementationUseVolumeDescriptor")
            .field("implementation_identifier", &self.implementation_identifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    static_assertions::assert_eq_size!(ImplementationUseVolumeDescriptor, [u8; 512]);
}
