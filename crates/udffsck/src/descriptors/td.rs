//! Terminating Descriptor (ECMA-167 3/10.9): marks the end of a Volume
//! Descriptor Sequence. Carries no payload beyond the tag.

use bytemuck::{Pod, Zeroable};

use crate::tag::DescriptorTag;

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod, Debug)]
pub struct TerminatingDescriptor {
    pub tag: DescriptorTag,
    pub reserved: [u8; 496],
}

impl TerminatingDescriptor {
    pub const SIZE: usize = 512;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    static_assertions::assert_eq_size!(TerminatingDescriptor, [u8; 512]);
}
