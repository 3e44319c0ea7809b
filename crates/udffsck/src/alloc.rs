//! Allocation descriptors (ECMA-167 4/14.14) and the Allocation Extent
//! Descriptor chain that continues a list too long to fit inline in an
//! FE/EFE.

use bytemuck::{Pod, Zeroable};

use crate::descriptors::common::{LbAddr, LongAd, ShortAd};
use crate::endian::{Le16, Le32};
use crate::error::{CheckError, Result};
use crate::tag::{tag_identifier, DescriptorTag};

/// Top two bits of every allocation descriptor's length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentType {
    Recorded,
    AllocatedNotRecorded,
    NotAllocated,
    /// The extent is itself a pointer to an AED continuing this list.
    NextExtent,
}

impl ExtentType {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::Recorded,
            1 => Self::AllocatedNotRecorded,
            2 => Self::NotAllocated,
            3 => Self::NextExtent,
            _ => unreachable!("2-bit field"),
        }
    }
}

/// `extended_ad` (ECMA-167 4/14.14.3), used under `icbTag.flags == AD_EXTENDED`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod, PartialEq, Eq)]
pub struct ExtendedAd {
    pub extent_length: Le32,
    pub recorded_length: Le32,
    pub information_length: Le32,
    pub extent_location: LbAddr,
    pub implementation_use: [u8; 2],
}

impl ExtendedAd {
    pub const SIZE: usize = 20;
}

/// Which allocation-descriptor encoding an FE/EFE's `icbTag.flags` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdKind {
    Short,
    Long,
    Extended,
    /// Contents are embedded directly after the FE/EFE; no extents to walk.
    InIcb,
}

impl AdKind {
    pub fn from_icb_flags(flags: u16) -> Self {
        match flags & 0x0007 {
            0 => Self::Short,
            1 => Self::Long,
            2 => Self::Extended,
            3 => Self::InIcb,
            _ => Self::InIcb,
        }
    }

    fn stride(self) -> usize {
        match self {
            Self::Short => ShortAd::SIZE,
            Self::Long => LongAd::SIZE,
            Self::Extended => ExtendedAd::SIZE,
            Self::InIcb => 0,
        }
    }
}

/// A resolved, concrete extent after AED chains have been followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcreteExtent {
    pub kind: ExtentType,
    /// Length in bytes with the type bits masked off.
    pub length: u32,
    /// Partition-relative logical block number; meaningless for
    /// `NotAllocated`/zero-length entries.
    pub location: u32,
}

fn decode_one(kind: AdKind, bytes: &[u8]) -> (ExtentType, u32, u32) {
    match kind {
        AdKind::Short => {
            let ad = *bytemuck::from_bytes::<ShortAd>(&bytes[..ShortAd::SIZE]);
            let raw = ad.length.get();
            (ExtentType::from_bits((raw >> 30) as u8), raw & 0x3FFF_FFFF, ad.position.get())
        }
        AdKind::Long => {
            let ad = *bytemuck::from_bytes::<LongAd>(&bytes[..LongAd::SIZE]);
            let raw = ad.length.get();
            (
                ExtentType::from_bits((raw >> 30) as u8),
                raw & 0x3FFF_FFFF,
                ad.location.logical_block_number.get(),
            )
        }
        AdKind::Extended => {
            let ad = *bytemuck::from_bytes::<ExtendedAd>(&bytes[..ExtendedAd::SIZE]);
            let raw = ad.extent_length.get();
            (
                ExtentType::from_bits((raw >> 30) as u8),
                raw & 0x3FFF_FFFF,
                ad.extent_location.logical_block_number.get(),
            )
        }
        AdKind::InIcb => unreachable!("InIcb has no allocation descriptors to decode"),
    }
}

/// `trait` supplying the single operation the AED-chain walk in
/// [`collect_extents`] needs: read `len` bytes at partition-relative `lbn`.
/// Implemented by the real medium in `walker.rs`; lets this module's logic
/// be tested without a full `Medium`.
pub trait ExtentSource {
    fn read_partition_blocks(&mut self, lbn: u32, len: usize) -> Result<Vec<u8>>;
}

/// Walk `raw` (the bytes of an FE/EFE's allocation-descriptor area),
/// following any type-3 (next-AED) entries via `source`, and return the
/// flattened list of concrete extents (ECMA-167 4/14.5, spec §4.3.2).
pub fn collect_extents(kind: AdKind, raw: &[u8], source: &mut impl ExtentSource) -> Result<Vec<ConcreteExtent>> {
    if kind == AdKind::InIcb {
        return Ok(Vec::new());
    }
    let stride = kind.stride();
    let mut out = Vec::new();
    let mut buf = raw.to_vec();
    let mut offset = 0usize;

    loop {
        if offset + stride > buf.len() {
            break;
        }
        let (extent_type, length, location) = decode_one(kind, &buf[offset..offset + stride]);
        if length == 0 {
            break;
        }
        match extent_type {
            ExtentType::NextExtent => {
                let aed_bytes = source.read_partition_blocks(location, length as usize)?;
                let aed = AedHeader::from_bytes(&aed_bytes)?;
                let body_len = aed.length_of_allocation_descriptors.get() as usize;
                let body_start = AedHeader::SIZE;
                let body_end = body_start + body_len;
                if body_end > aed_bytes.len() {
                    return Err(CheckError::UnsupportedStructure("AED body exceeds extent"));
                }
                buf = aed_bytes[body_start..body_end].to_vec();
                offset = 0;
                continue;
            }
            _ => {
                out.push(ConcreteExtent { kind: extent_type, length, location });
                offset += stride;
            }
        }
    }
    Ok(out)
}

/// Allocation Extent Descriptor (ECMA-167 4/14.5).
#[repr(C)]
#[derive(Clone, Copy, Zeroable, Pod, Debug)]
pub struct AedHeader {
    pub tag: DescriptorTag,
    pub previous_allocation_extent_location: Le32,
    pub length_of_allocation_descriptors: Le32,
}

impl AedHeader {
    pub const SIZE: usize = 24;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(CheckError::UnsupportedStructure("truncated AED"));
        }
        let header: Self = *bytemuck::from_bytes(&bytes[..Self::SIZE]);
        header.tag.expect_identifier(tag_identifier::ALLOCATION_EXTENT_DESCRIPTOR, header.tag.tag_location.get() as u64)?;
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_eq_size!(ExtendedAd, [u8; 20]);
    static_assertions::assert_eq_size!(AedHeader, [u8; 24]);

    struct NoChain;
    impl ExtentSource for NoChain {
        fn read_partition_blocks(&mut self, _lbn: u32, _len: usize) -> Result<Vec<u8>> {
            panic!("no AED chain expected in this test")
        }
    }

    fn short_ad(extent_type: u8, length: u32, position: u32) -> ShortAd {
        ShortAd {
            length: Le32::new(((extent_type as u32) << 30) | (length & 0x3FFF_FFFF)),
            position: Le32::new(position),
        }
    }

    #[test]
    fn stops_at_zero_length() {
        let entries = [short_ad(0, 2048, 10), short_ad(2, 0, 0)];
        let mut raw = Vec::new();
        for e in &entries {
            raw.extend_from_slice(bytemuck::bytes_of(e));
        }
        let extents = collect_extents(AdKind::Short, &raw, &mut NoChain).unwrap();
        assert_eq!(extents.len(), 1);
        assert_eq!(extents[0].location, 10);
    }

    #[test]
    fn in_icb_yields_no_extents() {
        let extents = collect_extents(AdKind::InIcb, &[], &mut NoChain).unwrap();
        assert!(extents.is_empty());
    }

    struct OneAed {
        body: Vec<u8>,
        served: bool,
    }
    impl ExtentSource for OneAed {
        fn read_partition_blocks(&mut self, _lbn: u32, _len: usize) -> Result<Vec<u8>> {
            assert!(!self.served, "AED should only be fetched once");
            self.served = true;
            let mut full = Vec::new();
            let tag = DescriptorTag::new(tag_identifier::ALLOCATION_EXTENT_DESCRIPTOR, 3, 1, 0, &{
                let mut payload = vec![0u8; 8];
                payload[4..8].copy_from_slice(&(self.body.len() as u32).to_le_bytes());
                payload
            });
            full.extend_from_slice(&tag.to_bytes());
            full.extend_from_slice(&0u32.to_le_bytes()); // previous extent location
            full.extend_from_slice(&(self.body.len() as u32).to_le_bytes());
            full.extend_from_slice(&self.body);
            Ok(full)
        }
    }

    #[test]
    fn follows_next_extent_chain() {
        let continuation = short_ad(0, 512, 99);
        let mut body = Vec::new();
        body.extend_from_slice(bytemuck::bytes_of(&continuation));

        let chain_ptr = short_ad(3, 2048, 5);
        let mut raw = Vec::new();
        raw.extend_from_slice(bytemuck::bytes_of(&chain_ptr));

        let mut source = OneAed { body, served: false };
        let extents = collect_extents(AdKind::Short, &raw, &mut source).unwrap();
        assert_eq!(extents.len(), 1);
        assert_eq!(extents[0].location, 99);
    }
}
