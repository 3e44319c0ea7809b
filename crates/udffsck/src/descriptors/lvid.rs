//! Logical Volume Integrity Descriptor (ECMA-167 3/10.10, UDF 3.2.1).
//!
//! Tracks open/closed integrity state, the free-space/size tables (one
//! entry per partition), and — in its UDF-defined implementation-use tail —
//! file/directory counts and the next unique ID to hand out.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::{ExtentAd, RegId};
use crate::endian::{Le16, Le32, Le64};
use crate::error::{CheckError, Result};
use crate::tag::DescriptorTag;
use crate::time::Timestamp;

pub const INTEGRITY_OPEN: u32 = 0;
pub const INTEGRITY_CLOSE: u32 = 1;

#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct LogicalVolumeIntegrityDescriptorHeader {
    pub tag: DescriptorTag,
    pub recording_date_and_time: Timestamp,
    pub integrity_type: Le32,
    pub next_integrity_extent: ExtentAd,
    /// First 8 bytes are the next unique ID to assign (UDF 3.2.1.1); the
    /// remaining 24 bytes are reserved.
    pub logical_volume_contents_use: [u8; 32],
    pub number_of_partitions: Le32,
    pub length_of_implementation_use: Le32,
}

impl LogicalVolumeIntegrityDescriptorHeader {
    pub const SIZE: usize = 80;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        *bytemuck::from_bytes(&bytes[..Self::SIZE])
    }

    pub fn next_unique_id(&self) -> u64 {
        u64::from_le_bytes(self.logical_volume_contents_use[0..8].try_into().unwrap())
    }

    pub fn set_next_unique_id(&mut self, id: u64) {
        self.logical_volume_contents_use[0..8].copy_from_slice(&id.to_le_bytes());
    }
}

/// UDF 2.2.6.4's implementation-use record, which occupies the start of the
/// variable-length implementation-use tail.
#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod)]
pub struct LvidImplementationUse {
    pub implementation_id: RegId,
    pub number_of_files: Le32,
    pub number_of_directories: Le32,
    pub minimum_udf_read_revision: Le16,
    pub minimum_udf_write_revision: Le16,
    pub maximum_udf_write_revision: Le16,
}

impl LvidImplementationUse {
    pub const SIZE: usize = 46;
}

#[derive(Debug, Clone)]
pub struct LogicalVolumeIntegrityDescriptor {
    pub header: LogicalVolumeIntegrityDescriptorHeader,
    pub free_space_table: Vec<u32>,
    pub size_table: Vec<u32>,
    pub implementation_use: LvidImplementationUse,
}

impl std::fmt::Debug for LogicalVolumeIntegrityDescriptorHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalVolumeIntegrityDescriptorHeader")
            .field("integrity_type", &self.integrity_type.get())
            .field("recording_date_and_time", &self.recording_date_and_time)
            .field("next_unique_id", &self.next_unique_id())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for LvidImplementationUse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LvidImplementationUse")
            .field("number_of_files", &self.number_of_files.get())
            .field("number_of_directories", &self.number_of_directories.get())
            .finish_non_exhaustive()
    }
}

impl LogicalVolumeIntegrityDescriptor {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LogicalVolumeIntegrityDescriptorHeader::SIZE {
            return Err(CheckError::UnsupportedStructure("truncated LVID header"));
        }
        let header = LogicalVolumeIntegrityDescriptorHeader::from_bytes(bytes);
        let n = header.number_of_partitions.get() as usize;
        let mut offset = LogicalVolumeIntegrityDescriptorHeader::SIZE;

        let read_u32_table = |bytes: &[u8], offset: &mut usize, n: usize| -> Result<Vec<u32>> {
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                if *offset + 4 > bytes.len() {
                    return Err(CheckError::UnsupportedStructure("truncated LVID partition table"));
                }
                out.push(u32::from_le_bytes(bytes[*offset..*offset + 4].try_into().unwrap()));
                *offset += 4;
            }
            Ok(out)
        };

        let free_space_table = read_u32_table(bytes, &mut offset, n)?;
        let size_table = read_u32_table(bytes, &mut offset, n)?;

        let implementation_use = if offset + LvidImplementationUse::SIZE <= bytes.len() {
            *bytemuck::from_bytes(&bytes[offset..offset + LvidImplementationUse::SIZE])
        } else {
            bytemuck::Zeroable::zeroed()
        };

        Ok(Self {
            header,
            free_space_table,
            size_table,
            implementation_use,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = bytemuck::bytes_of(&self.header).to_vec();
        for v in &self.free_space_table {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for v in &self.size_table {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out.extend_from_slice(bytemuck::bytes_of(&self.implementation_use));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(LogicalVolumeIntegrityDescriptorHeader, [u8; 80]);
    static_assertions::assert_eq_size!(LvidImplementationUse, [u8; 46]);

    #[test]
    fn next_unique_id_round_trips() {
        let mut header: LogicalVolumeIntegrityDescriptorHeader = bytemuck::Zeroable::zeroed();
        header.set_next_unique_id(0xdead_beef);
        assert_eq!(header.next_unique_id(), 0xdead_beef);
    }

    #[test]
    fn parse_roundtrips_tables() {
        let mut header: LogicalVolumeIntegrityDescriptorHeader = bytemuck::Zeroable::zeroed();
        header.number_of_partitions = Le32::new(1);
        let lvid = LogicalVolumeIntegrityDescriptor {
            header,
            free_space_table: vec![42],
            size_table: vec![100],
            implementation_use: bytemuck::Zeroable::zeroed(),
        };
        let bytes = lvid.to_bytes();
        let parsed = LogicalVolumeIntegrityDescriptor::parse(&bytes).unwrap();
        assert_eq!(parsed.free_space_table, vec![42]);
        assert_eq!(parsed.size_table, vec![100]);
    }
}
