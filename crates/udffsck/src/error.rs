use thiserror::Error;

/// Errors that abort a check/repair run outright, as opposed to findings
/// that are accumulated into a run's error report and survive to the end.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("expected descriptor tag {expected}, found {found} at sector {location}")]
    InvalidDescriptorTag {
        expected: u16,
        found: u16,
        location: u64,
    },

    #[error("tag checksum mismatch at sector {location}")]
    ChecksumMismatch { location: u64 },

    #[error("tag crc mismatch at sector {location}")]
    CrcMismatch { location: u64 },

    #[error("no anchor volume descriptor pointer found; not a UDF volume")]
    NotUdf,

    #[error("unsupported structure: {0}")]
    UnsupportedStructure(&'static str),

    #[error("medium is too small to contain a UDF volume")]
    MediumTooSmall,
}

pub type Result<T> = std::result::Result<T, CheckError>;
