//! High-level [`Archive`] API — the primary embedding surface.
//!
//! ```
//! use farc::{Archive, ParseMode, Signature};
//! use farc::dialect::FLAG_COMPRESS;
//!
//! // Build
//! let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS, false);
//! ar.add_file_data("readme.txt", b"Hello, world!")?;
//! let bytes = ar.to_bytes()?;
//!
//! // Read
//! let mut ar = Archive::parse(bytes, ParseMode::Lazy)?;
//! assert_eq!(ar.file_data("readme.txt")?, b"Hello, world!");
//! # Ok::<(), farc::ArchiveError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::crypto;
use crate::dialect::{Signature, FLAG_COMPRESS, FLAG_ENCRYPT};
use crate::entry::{Entry, EntryStore};
use crate::error::ArchiveError;
use crate::reader::{self, ParseMode};
use crate::writer;
use crate::codec;

/// Default payload alignment (bytes).
pub const DEFAULT_ALIGNMENT: u32 = 16;

/// The aggregate root: format state plus the ordered entry set.
///
/// Created empty (for building) or by parsing a byte buffer.  Entry
/// payload buffers live and die with the archive; copy a payload out
/// if it must outlive it.
pub struct Archive {
    pub(crate) signature: Signature,
    pub(crate) flags: u32,
    pub(crate) compression_level: i32,
    pub(crate) alignment: u32,
    pub(crate) ft: bool,
    pub(crate) store: EntryStore,
    /// Original buffer of a lazy parse; `None` once every entry is
    /// materialized or when the archive was built from scratch.
    pub(crate) source: Option<Vec<u8>>,
    pub(crate) key: Option<[u8; 32]>,
}

impl Default for Archive {
    fn default() -> Self {
        Archive::new(Signature::Modern, FLAG_COMPRESS, false)
    }
}

impl Archive {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn new(signature: Signature, flags: u32, ft: bool) -> Self {
        Archive {
            signature,
            flags,
            compression_level: codec::DEFAULT_LEVEL,
            alignment: DEFAULT_ALIGNMENT,
            ft,
            store: EntryStore::default(),
            source: None,
            key: None,
        }
    }

    /// Parse an archive from a byte buffer.
    pub fn parse(bytes: impl Into<Vec<u8>>, mode: ParseMode) -> Result<Self, ArchiveError> {
        reader::parse(bytes.into(), mode, None)
    }

    /// Parse an archive whose encrypted entries need `key` to decode.
    pub fn parse_with_key(
        bytes: impl Into<Vec<u8>>,
        mode: ParseMode,
        key: [u8; 32],
    ) -> Result<Self, ArchiveError> {
        reader::parse(bytes.into(), mode, Some(key))
    }

    pub fn open(path: impl AsRef<Path>, mode: ParseMode) -> Result<Self, ArchiveError> {
        Self::parse(fs::read(path)?, mode)
    }

    pub fn open_encrypted(
        path: impl AsRef<Path>,
        mode: ParseMode,
        password: &str,
    ) -> Result<Self, ArchiveError> {
        let key = crypto::derive_key(password)?;
        Self::parse_with_key(fs::read(path)?, mode, key)
    }

    // ── Serialization ────────────────────────────────────────────────────────

    /// Serialize under the archive's current signature and flags.
    ///
    /// On success every entry's dirty bit is cleared; on failure the
    /// archive is left exactly as it was.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, ArchiveError> {
        self.to_bytes_with(self.signature, self.flags)
    }

    /// Serialize under an overriding signature and flag set, leaving the
    /// archive's own settings untouched.
    pub fn to_bytes_with(
        &mut self,
        signature: Signature,
        flags: u32,
    ) -> Result<Vec<u8>, ArchiveError> {
        let bytes = writer::serialize(self, signature, flags)?;
        for entry in self.store.iter_mut() {
            entry.data_changed = false;
        }
        Ok(bytes)
    }

    /// Serialize to a file.  With `add_extension`, `.farc` is appended
    /// unless the path already carries it.
    pub fn write_file(
        &mut self,
        path: impl AsRef<Path>,
        add_extension: bool,
    ) -> Result<(), ArchiveError> {
        let mut path: PathBuf = path.as_ref().to_owned();
        if add_extension && path.extension().map_or(true, |e| e != "farc") {
            let mut name = path.as_os_str().to_owned();
            name.push(".farc");
            path = PathBuf::from(name);
        }
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    // ── Entries ──────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.store.iter()
    }

    /// Append an empty entry.  Archive-level default-compress/encrypt
    /// flags are copied onto it, matching how entries discovered by a
    /// parse carry their own flags.
    pub fn add_file(&mut self, name: &str) -> Result<&mut Entry, ArchiveError> {
        let index = self.store.add(name)?;
        let compress = self.flags & FLAG_COMPRESS != 0;
        let encrypt = self.flags & FLAG_ENCRYPT != 0;
        let entry = self.store.by_index_mut(index)?;
        entry.set_compressed(compress);
        entry.set_encrypted(encrypt);
        Ok(entry)
    }

    pub fn add_file_data(&mut self, name: &str, data: &[u8]) -> Result<(), ArchiveError> {
        self.add_file(name)?.set_data(data);
        Ok(())
    }

    pub fn get_file(&self, name: &str) -> Result<&Entry, ArchiveError> {
        self.store.get(name)
    }

    pub fn get_file_mut(&mut self, name: &str) -> Result<&mut Entry, ArchiveError> {
        self.store.get_mut(name)
    }

    pub fn file_by_index(&self, index: usize) -> Result<&Entry, ArchiveError> {
        self.store.by_index(index)
    }

    pub fn file_by_index_mut(&mut self, index: usize) -> Result<&mut Entry, ArchiveError> {
        self.store.by_index_mut(index)
    }

    /// Payload of the named entry, decoding and caching it on first
    /// access after a lazy parse.
    pub fn file_data(&mut self, name: &str) -> Result<&[u8], ArchiveError> {
        let index = self.store.index_of(name)?;
        self.data_by_index(index)
    }

    /// Payload by entry index; see [`Archive::file_data`].
    pub fn data_by_index(&mut self, index: usize) -> Result<&[u8], ArchiveError> {
        if self.store.by_index(index)?.data().is_none() {
            let entry = self.store.by_index(index)?;
            let decoded = if entry.window.is_some() {
                let source = self.source.as_ref().ok_or_else(|| {
                    ArchiveError::CorruptData("lazy entry lost its source buffer".into())
                })?;
                reader::decode_stored(source, entry, self.key.as_ref())?
            } else {
                Vec::new()
            };
            let entry = self.store.by_index_mut(index)?;
            entry.data = Some(decoded);
            entry.window = None;
        }
        self.store.by_index(index)?.data().ok_or_else(|| {
            ArchiveError::CorruptData("entry payload unavailable after decode".into())
        })
    }

    /// Extract every entry into `dest`, creating the directory if needed.
    pub fn extract_all(&mut self, dest: impl AsRef<Path>) -> Result<(), ArchiveError> {
        let dest = dest.as_ref();
        if !dest.exists() {
            fs::create_dir_all(dest)?;
        }
        for index in 0..self.len() {
            let name = self.file_by_index(index)?.name().to_owned();
            let data = self.data_by_index(index)?;
            fs::write(dest.join(&name), data)?;
        }
        Ok(())
    }

    // ── Format state ─────────────────────────────────────────────────────────

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    pub fn compression_level(&self) -> i32 {
        self.compression_level
    }

    pub fn set_compression_level(&mut self, level: i32) {
        self.compression_level = level;
    }

    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    pub fn set_alignment(&mut self, alignment: u32) -> Result<(), ArchiveError> {
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(ArchiveError::InvalidAlignment(alignment));
        }
        self.alignment = alignment;
        Ok(())
    }

    pub fn ft(&self) -> bool {
        self.ft
    }

    pub fn set_ft(&mut self, ft: bool) {
        self.ft = ft;
    }

    pub fn set_key(&mut self, key: Option<[u8; 32]>) {
        self.key = key;
    }

    /// Derive and install key material from a password.
    pub fn set_password(&mut self, password: &str) -> Result<(), ArchiveError> {
        self.key = Some(crypto::derive_key(password)?);
        Ok(())
    }
}
