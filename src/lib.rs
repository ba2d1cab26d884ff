//! Reader/writer for the FARC game-asset archive container: a named
//! collection of byte blobs, each independently compressible and
//! encryptable, serialized under one of two historical binary dialects
//! with exact size/offset bookkeeping.
//!
//! See [`Archive`] for the embedding surface and [`dialect`] for the
//! on-disk layout of both dialects.

pub mod archive;
pub mod codec;
pub mod crypto;
pub mod dialect;
pub mod entry;
pub mod error;
pub mod reader;
mod writer;

pub use archive::{Archive, DEFAULT_ALIGNMENT};
pub use dialect::Signature;
pub use entry::Entry;
pub use error::ArchiveError;
pub use reader::ParseMode;
