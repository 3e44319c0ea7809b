//! The descriptor engine: probing for a UDF volume, loading the main and
//! reserve Volume Descriptor Sequences, and validating every descriptor
//! they contain (spec §4.2).

use std::io::{Read, Seek, Write};

use log::{debug, trace, warn};

use crate::descriptors::avdp::{avdp_sector, AnchorVolumeDescriptorPointer, AvdpSlot};
use crate::descriptors::common::ExtentAd;
use crate::descriptors::iuvd::ImplementationUseVolumeDescriptor;
use crate::descriptors::lvd::{self, LogicalVolumeDescriptor, PartitionMapType1};
use crate::descriptors::pd::PartitionDescriptor;
use crate::descriptors::pvd::PrimaryVolumeDescriptor;
use crate::descriptors::td::TerminatingDescriptor;
use crate::descriptors::usd::UnallocatedSpaceDescriptor;
use crate::descriptors::VdsCopy;
use crate::error::{CheckError, Result};
use crate::medium::Medium;
use crate::tag::{tag_identifier, DescriptorTag, TagErrors};

const TRIAL_SECTOR_SIZES: [u32; 5] = [512, 1024, 2048, 4096, 8192];

/// One slot's validated descriptor plus its error mask, or `None` if the
/// slot was absent from this copy of the VDS.
pub struct Slot<T> {
    pub value: Option<T>,
    pub errors: TagErrors,
    pub raw: Vec<u8>,
    pub location: u64,
}

impl<T> Slot<T> {
    fn missing() -> Self {
        Self { value: None, errors: TagErrors::WRONGDESC, raw: Vec::new(), location: 0 }
    }
}

pub struct VdsSet {
    pub pvd: Slot<PrimaryVolumeDescriptor>,
    pub iuvd: Slot<ImplementationUseVolumeDescriptor>,
    pub pd: Vec<(PartitionDescriptor, TagErrors, u64)>,
    pub lvd: Slot<(LogicalVolumeDescriptor, Vec<PartitionMapType1>)>,
    pub usd: Slot<UnallocatedSpaceDescriptor>,
    pub terminated: bool,
}

/// Try each trial sector size against the four well-known AVDP positions
/// until a self-consistent AVDP is found (spec §4.2.1).
pub fn probe<T: Read + Write + Seek>(
    medium: &mut Medium<T>,
    forced_sector_size: Option<u32>,
) -> Result<(u32, AnchorVolumeDescriptorPointer, AvdpSlot)> {
    let trial_sizes: Vec<u32> = match forced_sector_size {
        Some(s) => vec![s],
        None => TRIAL_SECTOR_SIZES.to_vec(),
    };

    for sector_size in trial_sizes {
        let total_sectors = medium.len() / sector_size as u64;
        if total_sectors < 258 {
            continue;
        }
        for slot in [AvdpSlot::First, AvdpSlot::Second, AvdpSlot::Third, AvdpSlot::Unclosed] {
            let sector = avdp_sector(slot, total_sectors);
            let byte_offset = sector * sector_size as u64;
            if byte_offset + AnchorVolumeDescriptorPointer::SIZE as u64 > medium.len() {
                continue;
            }
            let Ok(bytes) = medium.read_at(byte_offset, AnchorVolumeDescriptorPointer::SIZE) else {
                continue;
            };
            let avdp = AnchorVolumeDescriptorPointer::from_bytes(&bytes);
            if avdp.tag.tag_identifier.get() != tag_identifier::ANCHOR_VOLUME_DESCRIPTOR_POINTER {
                continue;
            }
            let errors = avdp.tag.verify(&bytes, sector);
            if errors.contains(TagErrors::CHECKSUM) || errors.contains(TagErrors::CRC) {
                continue;
            }
            debug!(target: "udffsck::descriptor", "accepted AVDP at sector {sector} with sector size {sector_size}");
            return Ok((sector_size, avdp, slot));
        }
    }
    Err(CheckError::NotUdf)
}

/// Read up to 256 descriptors sequentially at `sector_size` stride starting
/// at `extent.location`, classifying each by tag identifier (spec §4.2.2).
pub fn load_vds<T: Read + Write + Seek>(
    medium: &mut Medium<T>,
    sector_size: u32,
    extent: ExtentAd,
) -> Result<VdsSet> {
    let mut set = VdsSet {
        pvd: Slot::missing(),
        iuvd: Slot::missing(),
        pd: Vec::new(),
        lvd: Slot::missing(),
        usd: Slot::missing(),
        terminated: false,
    };

    let start_sector = extent.location.get() as u64;
    let max_sectors = 256u64.min(extent.length.get() as u64 / sector_size as u64 + 1);

    for i in 0..max_sectors {
        let sector = start_sector + i;
        let offset = sector * sector_size as u64;
        let header = medium.read_at(offset, DescriptorTag::SIZE)?;
        let tag = DescriptorTag::from_bytes(&header);
        let tag_id = tag.tag_identifier.get();
        if tag_id == 0 {
            break;
        }
        trace!(target: "udffsck::descriptor", "VDS slot {i}: tag {tag_id}");

        match tag_id {
            tag_identifier::TERMINATING_DESCRIPTOR => {
                let bytes = medium.read_at(offset, TerminatingDescriptor::SIZE)?;
                let errors = tag.verify(&bytes, sector);
                if !errors.is_empty() {
                    warn!(target: "udffsck::descriptor", "TD at sector {sector} failed validation: {errors:?}");
                }
                set.terminated = true;
                break;
            }
            tag_identifier::PRIMARY_VOLUME_DESCRIPTOR => {
                let bytes = medium.read_at(offset, PrimaryVolumeDescriptor::SIZE)?;
                let errors = tag.verify(&bytes, sector);
                set.pvd = Slot {
                    value: Some(PrimaryVolumeDescriptor::from_bytes(&bytes)),
                    errors,
                    raw: bytes,
                    location: sector,
                };
            }
            tag_identifier::IMPLEMENTATION_USE_VOLUME_DESCRIPTOR => {
                let bytes = medium.read_at(offset, ImplementationUseVolumeDescriptor::SIZE)?;
                let errors = tag.verify(&bytes, sector);
                set.iuvd = Slot {
                    value: Some(ImplementationUseVolumeDescriptor::from_bytes(&bytes)),
                    errors,
                    raw: bytes,
                    location: sector,
                };
            }
            tag_identifier::PARTITION_DESCRIPTOR => {
                let bytes = medium.read_at(offset, PartitionDescriptor::SIZE)?;
                let errors = tag.verify(&bytes, sector);
                set.pd.push((PartitionDescriptor::from_bytes(&bytes), errors, sector));
            }
            tag_identifier::LOGICAL_VOLUME_DESCRIPTOR => {
                let fixed = medium.read_at(offset, LogicalVolumeDescriptor::FIXED_SIZE)?;
                let lvd_header = LogicalVolumeDescriptor::from_bytes(&fixed);
                let map_len = lvd_header.map_table_length.get() as usize;
                let full = medium.read_at(offset, LogicalVolumeDescriptor::FIXED_SIZE + map_len)?;
                let errors = tag.verify(&full, sector);
                let maps = lvd::parse_partition_maps(
                    &full[LogicalVolumeDescriptor::FIXED_SIZE..],
                    lvd_header.number_of_partition_maps.get(),
                )
                .unwrap_or_default();
                set.lvd = Slot {
                    value: Some((lvd_header, maps)),
                    errors,
                    raw: full,
                    location: sector,
                };
            }
            tag_identifier::UNALLOCATED_SPACE_DESCRIPTOR => {
                let header = medium.read_at(offset, 24)?;
                let count = u32::from_le_bytes(header[20..24].try_into().unwrap()) as usize;
                let full_len = 24 + count * ExtentAd::SIZE;
                let bytes = medium.read_at(offset, full_len)?;
                let errors = tag.verify(&bytes, sector);
                let usd = UnallocatedSpaceDescriptor::parse(&bytes)?;
                set.usd = Slot { value: Some(usd), errors, raw: bytes, location: sector };
            }
            _ => {
                return Err(CheckError::UnsupportedStructure(
                    "unknown tag identifier in Volume Descriptor Sequence",
                ));
            }
        }
    }

    Ok(set)
}

/// For each slot, prefer the main copy unless it failed checksum/CRC/
/// wrong-descriptor validation and the reserve copy didn't (spec §4.2.5).
pub fn get_correct(main_errors: TagErrors, reserve_errors: TagErrors) -> Option<VdsCopy> {
    const FATAL: TagErrors = TagErrors::CHECKSUM.union(TagErrors::CRC).union(TagErrors::WRONGDESC);
    if !main_errors.intersects(FATAL) {
        Some(VdsCopy::Main)
    } else if !reserve_errors.intersects(FATAL) {
        Some(VdsCopy::Reserve)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_correct_prefers_main_when_clean() {
        assert_eq!(get_correct(TagErrors::empty(), TagErrors::empty()), Some(VdsCopy::Main));
    }

    #[test]
    fn get_correct_falls_back_to_reserve() {
        assert_eq!(get_correct(TagErrors::CRC, TagErrors::empty()), Some(VdsCopy::Reserve));
    }

    #[test]
    fn get_correct_fails_when_both_bad() {
        assert_eq!(get_correct(TagErrors::CRC, TagErrors::CHECKSUM), None);
    }

    #[test]
    fn get_correct_ignores_position_errors() {
        // A position mismatch alone shouldn't disqualify a copy -- only
        // checksum/CRC/wrong-descriptor do (spec 4.2.5).
        assert_eq!(get_correct(TagErrors::POSITION, TagErrors::empty()), Some(VdsCopy::Main));
    }
}
