use std::io;
use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::CryptoError;

/// Failure taxonomy for every parse/serialize/lookup operation.
///
/// Parse failures are all-or-nothing: no partial archive is ever
/// returned.  A failed serialize leaves the in-memory archive
/// unmodified.  Nothing is retried internally.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Unrecognized archive signature")]
    UnknownFormat,
    #[error("Archive truncated: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },
    #[error("Corrupt archive data: {0}")]
    CorruptData(String),
    #[error("Entry name already present: {0:?}")]
    DuplicateName(String),
    #[error("No entry named {0:?}")]
    NotFound(String),
    #[error("Entry index {index} out of range (count {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Alignment must be a power of two, got {0}")]
    InvalidAlignment(u32),
    #[error("Entry name {name:?} exceeds the dialect limit of {max} bytes")]
    NameTooLong { name: String, max: usize },
    #[error("Entry is encrypted but no key material was provided")]
    MissingKey,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<CodecError> for ArchiveError {
    fn from(e: CodecError) -> Self {
        ArchiveError::CorruptData(e.to_string())
    }
}

impl From<CryptoError> for ArchiveError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::MissingKey => ArchiveError::MissingKey,
            other => ArchiveError::CorruptData(other.to_string()),
        }
    }
}
