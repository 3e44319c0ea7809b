//! UDF/ECMA-167 volume-level descriptors.

pub mod avdp;
pub mod common;
pub mod fsd;
pub mod iuvd;
pub mod lvd;
pub mod lvid;
pub mod pd;
pub mod pvd;
pub mod td;
pub mod usd;

use crate::tag::tag_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VdsCopy {
    Main,
    Reserve,
}

/// A decoded, located descriptor of one of the six kinds carried in a
/// Volume Descriptor Sequence, plus the error mask accumulated while
/// validating it.
#[derive(Debug)]
pub enum VolumeDescriptor {
    Primary(pvd::PrimaryVolumeDescriptor),
    ImplementationUse(iuvd::ImplementationUseVolumeDescriptor),
    Partition(pd::PartitionDescriptor),
    Logical(lvd::LogicalVolumeDescriptor, Vec<u8>),
    Unallocated(usd::UnallocatedSpaceDescriptor),
    Terminating(td::TerminatingDescriptor),
}

impl VolumeDescriptor {
    pub fn expected_tag_identifier(tag_id: u16) -> Option<&'static str> {
        match tag_id {
            tag_identifier::PRIMARY_VOLUME_DESCRIPTOR => Some("PVD"),
            tag_identifier::IMPLEMENTATION_USE_VOLUME_DESCRIPTOR => Some("IUVD"),
            tag_identifier::PARTITION_DESCRIPTOR => Some("PD"),
            tag_identifier::LOGICAL_VOLUME_DESCRIPTOR => Some("LVD"),
            tag_identifier::UNALLOCATED_SPACE_DESCRIPTOR => Some("USD"),
            tag_identifier::TERMINATING_DESCRIPTOR => Some("TD"),
            _ => None,
        }
    }
}
