//! File Set Descriptor (ECMA-167 4/14.1): the root of one file set, reached
//! via the LVD's `logical_volume_contents_use` long_ad.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::{Charspec, LongAd, RegId};
use crate::endian::Le32;
use crate::tag::DescriptorTag;
use crate::time::Timestamp;

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct FileSetDescriptor {
    pub tag: DescriptorTag,
    pub recording_date_and_time: Timestamp,
    pub interchange_level: crate::endian::Le16,
    pub maximum_interchange_level: crate::endian::Le16,
    pub character_set_list: Le32,
    pub maximum_character_set_list: Le32,
    pub file_set_number: Le32,
    pub file_set_descriptor_number: Le32,
    pub logical_volume_identifier_character_set: Charspec,
    pub logical_volume_identifier: [u8; 128],
    pub file_set_character_set: Charspec,
    pub file_set_identifier: [u8; 32],
    pub copyright_file_identifier: [u8; 32],
    pub abstract_file_identifier: [u8; 32],
    pub root_directory_icb: LongAd,
    pub domain_identifier: RegId,
    pub next_extent: LongAd,
    pub system_stream_directory_icb: LongAd,
    pub reserved: [u8; 32],
}

impl FileSetDescriptor {
    pub const SIZE: usize = 512;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn has_stream_directory(&self) -> bool {
        self.system_stream_directory_icb.length.get() > 0
    }
}

impl std::fmt::Debug for FileSetDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSetDescriptor")
            .field("file_set_identifier", &crate::dstring::decode(&self.file_set_identifier))
            .field("root_directory_icb", &self.root_directory_icb)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    static_assertions::assert_eq_size!(FileSetDescriptor, [u8; 512]);
}
