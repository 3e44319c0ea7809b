//! Anchor Volume Descriptor Pointer (ECMA-167 3/10.2): locates the main and
//! reserve Volume Descriptor Sequences. Present at up to three fixed
//! positions on the medium.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::ExtentAd;
use crate::tag::DescriptorTag;

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod, Debug)]
pub struct AnchorVolumeDescriptorPointer {
    pub tag: DescriptorTag,
    pub main_volume_descriptor_sequence_extent: ExtentAd,
    pub reserve_volume_descriptor_sequence_extent: ExtentAd,
    pub reserved: [u8; 480],
}

impl AnchorVolumeDescriptorPointer {
    pub const SIZE: usize = 512;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn to_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// The well-known positions (expressed in sectors) where an AVDP may be
/// found, in probing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvdpSlot {
    First,
    Second,
    Third,
    /// Unclosed-disc position; remapped to `First` on acceptance.
    Unclosed,
}

pub fn avdp_sector(slot: AvdpSlot, total_sectors: u64) -> u64 {
    match slot {
        AvdpSlot::First => 256,
        AvdpSlot::Second => total_sectors - 1,
        AvdpSlot::Third => total_sectors - 257,
        AvdpSlot::Unclosed => 512,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(AnchorVolumeDescriptorPointer, [u8; 512]);
}
