//! Recursive file-tree walker (spec §4.3): descends from the FSD's root
//! (and stream) directory ICB through FIDs and FE/EFEs, accounting every
//! recorded/allocated extent into the partition bitmap and staging fixes
//! for the repair driver rather than writing through the medium directly
//! (spec §9's side-table design note).

use std::io::{Read, Seek, Write};

use log::{trace, warn};

use crate::alloc::{collect_extents, AdKind, ConcreteExtent, ExtentSource, ExtentType};
use crate::config::{RunConfig, RunMode};
use crate::descriptors::common::LongAd;
use crate::error::Result;
use crate::fe::{FileEntry, FileType};
use crate::fid::{FileCharacteristics, FileIdentifierDescriptor};
use crate::medium::Medium;
use crate::report::Report;
use crate::space::{PartitionBitmap, SpaceCounters};
use crate::time::Timestamp;

/// A pending fix to an on-disk FID, keyed by its absolute byte offset.
#[derive(Debug, Clone)]
pub struct FidFix {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// A pending fix to an on-disk FE/EFE tag (checksum/CRC/serial refresh).
#[derive(Debug, Clone)]
pub struct FeFix {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct RepairLog {
    pub fid_fixes: Vec<FidFix>,
    pub fe_fixes: Vec<FeFix>,
}

/// Adapts a [`Medium`] plus a partition's base LSN into an [`ExtentSource`]
/// so [`collect_extents`] can follow AED chains without knowing about I/O.
pub struct PartitionMedium<'m, T> {
    pub medium: &'m mut Medium<T>,
    pub base_lsn: u64,
    pub sector_size: u32,
}

impl<'m, T: Read + Write + Seek> PartitionMedium<'m, T> {
    fn byte_offset(&self, lbn: u32) -> u64 {
        (self.base_lsn + lbn as u64) * self.sector_size as u64
    }

    pub fn read_bytes(&mut self, lbn: u32, len: usize) -> Result<Vec<u8>> {
        self.medium.read_at(self.byte_offset(lbn), len)
    }

    pub fn write_bytes(&mut self, lbn: u32, offset_in_block: u64, bytes: &[u8]) -> Result<()> {
        self.medium.write_at(self.byte_offset(lbn) + offset_in_block, bytes)
    }
}

impl<'m, T: Read + Write + Seek> ExtentSource for PartitionMedium<'m, T> {
    fn read_partition_blocks(&mut self, lbn: u32, len: usize) -> Result<Vec<u8>> {
        self.read_bytes(lbn, len)
    }
}

pub struct WalkContext<'a> {
    pub config: &'a RunConfig,
    pub bitmap: &'a mut PartitionBitmap,
    pub counters: &'a mut SpaceCounters,
    pub report: &'a mut Report,
    pub repair_log: &'a mut RepairLog,
    pub avdp_serial: Option<u16>,
    pub min_udf_read_revision: u16,
    /// The LVID's recorded time, used to flag files modified after it
    /// (spec §4.3.5's `E_TIMESTAMP`). `None` when the LVID itself couldn't
    /// be read.
    pub lvid_recording_time: Option<Timestamp>,
}

const MAX_DEPTH: usize = 100;

/// Render one file-tree entry in the fixed shape standard output uses
/// (spec §6): `<prefix><type>:<perm-bits> <timestamp> <size> "<name>"`, the
/// prefix built from box-drawing glyphs so parent chains stay aligned.
fn format_entry(depth: usize, common: &crate::fe::FileEntryCommon, name: &str) -> String {
    let prefix: String = "│  ".repeat(depth);
    let type_char = match common.icb_tag.kind() {
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        _ => '-',
    };
    let timestamp = common
        .modification_time
        .to_utc()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "{prefix}{type_char}:{:04o} {timestamp} {} \"{name}\"",
        common.permissions, common.information_length
    )
}

/// Read the FE/EFE at `lbn` and account its directly-recorded extents
/// (spec §4.3.2, §4.3.5) into the bitmap, returning the parsed entry, its
/// resolved concrete extents (empty for `AD_IN_ICB`), and the full raw
/// descriptor bytes (header + EA + AD area) a caller can use to rebuild the
/// tag after an in-place field fix.
fn read_and_account_fe<T: Read + Write + Seek>(
    pm: &mut PartitionMedium<T>,
    lbn: u32,
) -> Result<(FileEntry, Vec<ConcreteExtent>, Vec<u8>)> {
    // Read a generous fixed prefix first; FE/EFE headers are at most 216
    // bytes before the extended-attribute/allocation-descriptor tail.
    let prefix = pm.read_bytes(lbn, 216.max(crate::fe::FileEntryHeader::SIZE))?;
    let location = pm.base_lsn + lbn as u64;
    let fe = FileEntry::parse(&prefix, location)?;
    let common = fe.common();

    let ad_area_start = fe.header_size() + common.length_of_extended_attributes as usize;
    let ad_area_len = common.length_of_allocation_descriptors as usize;
    let full = pm.read_bytes(lbn, ad_area_start + ad_area_len)?;
    let ad_bytes = &full[ad_area_start..ad_area_start + ad_area_len];

    let extents = collect_extents(common.icb_tag.ad_kind(), ad_bytes, pm)?;
    Ok((fe, extents, full))
}

/// Maps a range of the flattened directory-contents buffer back to the
/// medium location it was read from, so an in-place FID fix can be written
/// back to the right extent instead of just the start of the directory.
struct BufferExtent {
    buf_start: usize,
    buf_end: usize,
    lbn: u32,
}

/// Concatenate the bytes of every recorded extent of a directory FE into a
/// contiguous buffer ready for FID parsing (spec §4.3.3), alongside the
/// buffer-offset-to-medium-location map fixes are written back through.
fn directory_contents<T: Read + Write + Seek>(
    pm: &mut PartitionMedium<T>,
    extents: &[ConcreteExtent],
) -> Result<(Vec<u8>, Vec<BufferExtent>)> {
    let mut buf = Vec::new();
    let mut map = Vec::new();
    for extent in extents {
        match extent.kind {
            ExtentType::Recorded => {
                let start = buf.len();
                buf.extend_from_slice(&pm.read_bytes(extent.location, extent.length as usize)?);
                map.push(BufferExtent { buf_start: start, buf_end: buf.len(), lbn: extent.location });
            }
            ExtentType::AllocatedNotRecorded | ExtentType::NotAllocated => {
                // no bytes to contribute, but the space is still accounted
                // for by the caller via the concrete extent list.
            }
            ExtentType::NextExtent => unreachable!("collect_extents resolves AED chains"),
        }
    }
    Ok((buf, map))
}

fn locate_in_map(map: &[BufferExtent], offset: usize) -> Option<(u32, u64)> {
    map.iter()
        .find(|e| offset >= e.buf_start && offset < e.buf_end)
        .map(|e| (e.lbn, (offset - e.buf_start) as u64))
}

fn account_extents(bitmap: &mut PartitionBitmap, sector_size: u32, extents: &[ConcreteExtent]) {
    for extent in extents {
        if matches!(extent.kind, ExtentType::Recorded | ExtentType::AllocatedNotRecorded) {
            let blocks = extent.length.div_ceil(sector_size).max(1);
            bitmap.mark(extent.location, blocks);
        }
    }
}

/// Entry point: walk one tree (normal or stream) from its root ICB.
pub fn walk_tree<T: Read + Write + Seek>(
    pm: &mut PartitionMedium<T>,
    root_icb: LongAd,
    ctx: &mut WalkContext,
) -> Result<()> {
    let root_lbn = root_icb.location.logical_block_number.get();
    let (fe, extents, _full) = read_and_account_fe(pm, root_lbn)?;
    account_extents(ctx.bitmap, pm.sector_size, &extents);
    ctx.counters.num_dirs += 1;
    ctx.report.list(format_entry(0, &fe.common(), "/"));

    if !matches!(fe.common().icb_tag.kind(), FileType::Directory) {
        warn!(target: "udffsck::walker", "root ICB at lbn {root_lbn} is not a directory");
        return Ok(());
    }
    walk_directory(pm, &fe, &extents, 0, ctx)
}

fn walk_directory<T: Read + Write + Seek>(
    pm: &mut PartitionMedium<T>,
    dir_fe: &FileEntry,
    extents: &[ConcreteExtent],
    depth: usize,
    ctx: &mut WalkContext,
) -> Result<()> {
    if depth >= MAX_DEPTH {
        ctx.report.record(None, "directory nesting exceeds MAX_DEPTH, stopping descent", false);
        return Ok(());
    }

    let (contents, buffer_map) = directory_contents(pm, extents)?;
    let mut offset = 0usize;

    while offset + 38 <= contents.len() {
        let (lbn, offset_in_block) = locate_in_map(&buffer_map, offset).unwrap_or((0, 0));
        let location_hint = pm.base_lsn + lbn as u64;

        let (mut fid, consumed) = match FileIdentifierDescriptor::parse(&contents[offset..], location_hint) {
            Ok(v) => v,
            Err(_) => {
                ctx.report.record(None, "FID tag checksum failure, stopping this directory", false);
                break;
            }
        };
        offset += consumed;

        let chars = fid.header.characteristics();
        if chars.contains(FileCharacteristics::DELETED) {
            let errors = fid.identifier_errors();
            if !errors.is_empty() {
                ctx.report.record(None, format!("deleted FID has invalid identifier: {errors:?}"), false);
            }
            continue;
        }
        if chars.contains(FileCharacteristics::PARENT) {
            continue;
        }

        if let Some(serial) = ctx.avdp_serial {
            if fid.header.tag.tag_serial_number.get() != serial {
                let mut fixed = fid.clone();
                fixed.header.tag.tag_serial_number.set(serial);
                fixed.refresh_tag(location_hint);
                let abs_offset = pm.byte_offset(lbn) + offset_in_block;
                ctx.repair_log.fid_fixes.push(FidFix { offset: abs_offset, bytes: fixed.to_bytes() });
                ctx.report.record(None, "FID tag serial number did not match AVDP, corrected", true);
                fid = fixed;
            }
        }

        let mut uuid = fid.icb_unique_id();
        if uuid == 0 && ctx.min_udf_read_revision > 0x0200 {
            if matches!(ctx.config.mode, RunMode::Autofix | RunMode::Interactive) {
                let new_id = ctx.counters.next_unique_id as u32;
                ctx.counters.next_unique_id += 1;
                let mut fixed = fid.clone();
                fixed.set_icb_unique_id(new_id);
                fixed.refresh_tag(location_hint);
                let abs_offset = pm.byte_offset(lbn) + offset_in_block;
                ctx.repair_log.fid_fixes.push(FidFix { offset: abs_offset, bytes: fixed.to_bytes() });
                ctx.report.record(None, "FID referenced a zero unique ID, allocated a new one", true);
                fid = fixed;
                uuid = new_id;
            } else {
                ctx.report.record(None, "FID references a zero unique ID under UDF revision > 2.00", false);
            }
        }
        ctx.counters.next_unique_id = ctx.counters.next_unique_id.max(uuid as u64 + 1);

        let child_lbn = fid.header.icb.location.logical_block_number.get();
        let (mut child_fe, child_extents, child_full) = match read_and_account_fe(pm, child_lbn) {
            Ok(v) => v,
            Err(e) => {
                ctx.report.record(None, format!("failed to read FE at lbn {child_lbn}: {e}"), false);
                continue;
            }
        };
        account_extents(ctx.bitmap, pm.sector_size, &child_extents);

        let mut common = child_fe.common();
        let name = crate::dstring::decode(&fid.identifier);
        ctx.report.list(format_entry(depth + 1, &common, &name));
        if common.unique_id != uuid as u64 {
            if matches!(ctx.config.mode, RunMode::Autofix | RunMode::Interactive) {
                let tail = child_full[child_fe.header_size()..].to_vec();
                let child_location = pm.base_lsn + child_lbn as u64;
                child_fe.set_unique_id(uuid as u64);
                child_fe.refresh_tag(child_location, &tail);
                let abs_offset = pm.byte_offset(child_lbn);
                ctx.repair_log.fe_fixes.push(FeFix { offset: abs_offset, bytes: child_fe.header_bytes() });
                ctx.report.record(None, "FE unique ID did not match FID, corrected", true);
                common = child_fe.common();
            } else {
                ctx.report.record(None, "FID unique ID does not match FE unique ID", false);
            }
        }
        if child_fe.is_extended() {
            ctx.min_udf_read_revision = ctx.min_udf_read_revision.max(0x0200);
        }
        if let (Some(lvid_time), Some(file_time)) =
            (ctx.lvid_recording_time.and_then(|t| t.to_utc()), common.modification_time.to_utc())
        {
            if file_time > lvid_time {
                if matches!(ctx.config.mode, RunMode::Autofix | RunMode::Interactive) {
                    ctx.report.record(None, "file modification time later than LVID recording time, LVID will be rebuilt", true);
                } else {
                    ctx.report.record(None, "file modification time later than LVID recording time", false);
                }
            }
        }

        match common.icb_tag.kind() {
            FileType::Directory => {
                ctx.counters.num_dirs += 1;
                walk_directory(pm, &child_fe, &child_extents, depth + 1, ctx)?;
            }
            FileType::Regular | FileType::Symlink | FileType::Fifo | FileType::Socket => {
                ctx.counters.num_files += 1;
                trace!(target: "udffsck::walker", "accounted file at lbn {child_lbn}, {} extents", child_extents.len());
            }
            _ => {
                trace!(target: "udffsck::walker", "skipping unsupported file type at lbn {child_lbn}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repair_log_starts_empty() {
        let log = RepairLog::default();
        assert!(log.fid_fixes.is_empty());
        assert!(log.fe_fixes.is_empty());
    }
}
