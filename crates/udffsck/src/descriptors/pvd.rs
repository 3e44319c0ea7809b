//! Primary Volume Descriptor (ECMA-167 3/10.1).

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::{Charspec, ExtentAd, RegId};
use crate::endian::{Le16, Le32};
use crate::tag::DescriptorTag;
use crate::time::Timestamp;

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct PrimaryVolumeDescriptor {
    pub tag: DescriptorTag,
    pub volume_descriptor_sequence_number: Le32,
    pub primary_volume_descriptor_number: Le32,
    pub volume_identifier: [u8; 32],
    pub volume_sequence_number: Le16,
    pub maximum_volume_sequence_number: Le16,
    pub interchange_level: Le16,
    pub maximum_interchange_level: Le16,
    pub character_set_list: Le32,
    pub maximum_character_set_list: Le32,
    pub volume_set_identifier: [u8; 128],
    pub descriptor_character_set: Charspec,
    pub explanatory_character_set: Charspec,
    pub volume_abstract: ExtentAd,
    pub volume_copyright_notice: ExtentAd,
    pub application_identifier: RegId,
    pub recording_date_and_time: Timestamp,
    pub implementation_identifier: RegId,
    pub implementation_use: [u8; 64],
    pub predecessor_volume_descriptor_sequence_location: Le32,
    pub flags: Le16,
    pub reserved: [u8; 22],
}

impl PrimaryVolumeDescriptor {
    pub const SIZE: usize = 512;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn volume_identifier_errors(&self) -> crate::dstring::DstringErrors {
        crate::dstring::verify(&self.volume_identifier)
    }

    pub fn volume_set_identifier_errors(&self) -> crate::dstring::DstringErrors {
        crate::dstring::verify(&self.volume_set_identifier)
    }
}

impl std::fmt::Debug for PrimaryVolumeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryVolumeDescriptor")
            .field("volume_identifier", &crate::dstring::decode(&self.volume_identifier))
            .field("volume_set_identifier", &crate::dstring::decode(&self.volume_set_identifier))
            .field("recording_date_and_time", &self.recording_date_and_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(PrimaryVolumeDescriptor, [u8; 512]);
}
