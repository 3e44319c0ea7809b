//! Repair driver (spec §4.5): copies a clean VDS copy over a damaged one,
//! normalizes AVDP extents, rebuilds the LVID, rewrites the SBD, and
//! applies the walker's staged FID/FE fixes. Every operation here is a
//! no-op under [`crate::config::RunMode::CheckOnly`].

use std::io::{Read, Seek, Write};

use log::info;

use crate::config::{RunConfig, RunMode};
use crate::descriptors::avdp::{avdp_sector, AnchorVolumeDescriptorPointer, AvdpSlot};
use crate::descriptors::lvid::{LogicalVolumeIntegrityDescriptor, INTEGRITY_CLOSE};
use crate::descriptors::pd::PartitionDescriptor;
use crate::error::Result;
use crate::medium::Medium;
use crate::report::Report;
use crate::space::{PartitionBitmap, SpaceCounters};
use crate::tag::tag_identifier;
use crate::walker::RepairLog;

/// Copy `src_bytes` (a whole descriptor, tag included) to `dst_sector`,
/// rewriting its tag location and checksum so the destination is
/// self-consistent (spec §4.5.1 `copy_descriptor`). CRC is untouched since
/// the payload bytes don't change.
pub fn copy_descriptor<T: Read + Write + Seek>(
    medium: &mut Medium<T>,
    sector_size: u32,
    src_bytes: &[u8],
    dst_sector: u64,
) -> Result<()> {
    let mut bytes = src_bytes.to_vec();
    let mut tag = crate::tag::DescriptorTag::from_bytes(&bytes);
    tag.tag_location = crate::endian::Le32::new(dst_sector as u32);
    let raw = tag.to_bytes();
    tag.tag_checksum = crate::tag::DescriptorTag::calculate_checksum(&raw);
    bytes[..crate::tag::DescriptorTag::SIZE].copy_from_slice(&tag.to_bytes());
    medium.write_at(dst_sector * sector_size as u64, &bytes)?;
    Ok(())
}

/// One slot's repair decision (spec §4.5.1's table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdsFix {
    NoneNeeded,
    CopyReserveToMain,
    CopyMainToReserve,
    Uncorrectable,
}

impl VdsFix {
    pub fn is_corrected(self) -> bool {
        matches!(self, Self::CopyReserveToMain | Self::CopyMainToReserve)
    }
}

pub fn decide_vds_fix(main_ok: bool, reserve_ok: bool) -> VdsFix {
    match (main_ok, reserve_ok) {
        (true, true) => VdsFix::NoneNeeded,
        (false, true) => VdsFix::CopyReserveToMain,
        (true, false) => VdsFix::CopyMainToReserve,
        (false, false) => VdsFix::Uncorrectable,
    }
}

/// Ensure the AVDP's main and reserve VDS extents agree and are at least 16
/// sectors long, adopting the larger if they disagree (spec §4.5.2).
pub fn fix_avdp(avdp: &mut AnchorVolumeDescriptorPointer, sector_size: u32) -> bool {
    let min_len = 16 * sector_size;
    let main_len = avdp.main_volume_descriptor_sequence_extent.length.get();
    let reserve_len = avdp.reserve_volume_descriptor_sequence_extent.length.get();
    let target = main_len.max(reserve_len).max(min_len);
    let mut changed = false;
    if main_len != target {
        avdp.main_volume_descriptor_sequence_extent.length = crate::endian::Le32::new(target);
        changed = true;
    }
    if reserve_len != target {
        avdp.reserve_volume_descriptor_sequence_extent.length = crate::endian::Le32::new(target);
        changed = true;
    }
    changed
}

/// Duplicate one AVDP copy to the other well-known slots (spec §4.5.2
/// `write_avdp`).
pub fn write_avdp<T: Read + Write + Seek>(
    medium: &mut Medium<T>,
    sector_size: u32,
    avdp_bytes: &[u8],
    total_sectors: u64,
) -> Result<()> {
    for slot in [AvdpSlot::First, AvdpSlot::Second, AvdpSlot::Third] {
        let sector = avdp_sector(slot, total_sectors);
        copy_descriptor(medium, sector_size, avdp_bytes, sector)?;
    }
    Ok(())
}

/// Rebuild the LVID from the walk's derived counters (spec §4.5.3).
pub fn fix_lvid(
    lvid: &mut LogicalVolumeIntegrityDescriptor,
    counters: &SpaceCounters,
    sector: u64,
    serial: u16,
    min_udf_read_revision: u16,
) {
    lvid.header.integrity_type = crate::endian::Le32::new(INTEGRITY_CLOSE);
    lvid.header.recording_date_and_time = crate::time::Timestamp::now_utc();
    lvid.header.set_next_unique_id(counters.next_unique_id);
    lvid.implementation_use.number_of_files = crate::endian::Le32::new(counters.num_files);
    lvid.implementation_use.number_of_directories = crate::endian::Le32::new(counters.num_dirs);
    lvid.implementation_use.minimum_udf_read_revision = crate::endian::Le16::new(min_udf_read_revision);
    if !lvid.free_space_table.is_empty() {
        lvid.free_space_table[0] = counters.free_space_blocks;
    }
    if !lvid.size_table.is_empty() {
        lvid.size_table[0] = counters.partition_num_blocks;
    }

    let payload = lvid.to_bytes()[crate::tag::DescriptorTag::SIZE..].to_vec();
    lvid.header.tag = crate::tag::DescriptorTag::new(
        tag_identifier::LOGICAL_VOLUME_INTEGRITY_DESCRIPTOR,
        lvid.header.tag.descriptor_version.get(),
        serial,
        sector as u32,
        &payload,
    );
}

/// Rewrite a partition's Space Bitmap Descriptor from the derived bitmap
/// (spec §4.5.4). Only the "space bitmap" space-management strategy is
/// supported; unallocated/freed space *tables* are reported instead.
pub fn fix_pd_bitmap(
    pd: &PartitionDescriptor,
    bitmap: &PartitionBitmap,
) -> Option<(u32, Vec<u8>)> {
    let header = pd.header();
    if !header.has_space_bitmap() {
        return None;
    }
    let sbd_lbn = header.unallocated_space_bitmap.position.get();
    let bitmap_bytes = bitmap.to_sbd_bytes();

    let mut payload = Vec::with_capacity(8 + bitmap_bytes.len());
    payload.extend_from_slice(&(bitmap.len() as u32).to_le_bytes());
    payload.extend_from_slice(&(bitmap_bytes.len() as u32).to_le_bytes());
    payload.extend_from_slice(&bitmap_bytes);

    Some((sbd_lbn, payload))
}

/// Apply every fix the walker staged in a [`RepairLog`] (spec §9's
/// side-table design). A no-op under [`RunMode::CheckOnly`].
pub fn apply_repair_log<T: Read + Write + Seek>(
    medium: &mut Medium<T>,
    config: &RunConfig,
    log_entries: &RepairLog,
    report: &mut Report,
) -> Result<()> {
    if matches!(config.mode, RunMode::CheckOnly) {
        return Ok(());
    }
    for fix in &log_entries.fid_fixes {
        medium.write_at(fix.offset, &fix.bytes)?;
        info!(target: "udffsck::repair", "wrote corrected FID at offset {}", fix.offset);
    }
    for fix in &log_entries.fe_fixes {
        medium.write_at(fix.offset, &fix.bytes)?;
        info!(target: "udffsck::repair", "wrote corrected FE/EFE at offset {}", fix.offset);
    }
    let _ = report;
    medium.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vds_fix_decisions() {
        assert_eq!(decide_vds_fix(true, true), VdsFix::NoneNeeded);
        assert_eq!(decide_vds_fix(true, false), VdsFix::CopyMainToReserve);
        assert_eq!(decide_vds_fix(false, true), VdsFix::CopyReserveToMain);
        assert_eq!(decide_vds_fix(false, false), VdsFix::Uncorrectable);
    }

    #[test]
    fn fix_avdp_adopts_larger_extent() {
        let mut avdp: AnchorVolumeDescriptorPointer = bytemuck::Zeroable::zeroed();
        avdp.main_volume_descriptor_sequence_extent.length = crate::endian::Le32::new(16 * 2048);
        avdp.reserve_volume_descriptor_sequence_extent.length = crate::endian::Le32::new(8 * 2048);
        let changed = fix_avdp(&mut avdp, 2048);
        assert!(changed);
        assert_eq!(
            avdp.reserve_volume_descriptor_sequence_extent.length.get(),
            avdp.main_volume_descriptor_sequence_extent.length.get()
        );
    }

    #[test]
    fn fix_avdp_enforces_minimum_length() {
        let mut avdp: AnchorVolumeDescriptorPointer = bytemuck::Zeroable::zeroed();
        avdp.main_volume_descriptor_sequence_extent.length = crate::endian::Le32::new(4 * 2048);
        avdp.reserve_volume_descriptor_sequence_extent.length = crate::endian::Le32::new(4 * 2048);
        fix_avdp(&mut avdp, 2048);
        assert_eq!(avdp.main_volume_descriptor_sequence_extent.length.get(), 16 * 2048);
    }
}
