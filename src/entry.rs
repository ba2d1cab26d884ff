//! Entries and the ordered, name-indexed entry store.

use std::collections::HashMap;

use crate::error::ArchiveError;

/// Byte range of an entry's still-encoded payload inside the source
/// buffer of a lazy parse.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StoredWindow {
    pub offset: usize,
    pub stored_size: usize,
}

/// One named blob.  `size` is always the uncompressed payload length,
/// even while the on-disk bytes are compressed.  `data` stays `None`
/// for lazily parsed entries until first access materializes it.
#[derive(Debug, Clone)]
pub struct Entry {
    name: String,
    pub(crate) size: usize,
    pub(crate) data: Option<Vec<u8>>,
    pub(crate) window: Option<StoredWindow>,
    compressed: bool,
    encrypted: bool,
    pub(crate) data_changed: bool,
}

impl Entry {
    pub(crate) fn new(name: String) -> Self {
        Entry {
            name,
            size: 0,
            data: None,
            window: None,
            compressed: false,
            encrypted: false,
            data_changed: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uncompressed payload length in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Materialized payload, if any.  `None` means the entry came from a
    /// lazy parse and has not been accessed through the archive yet.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Replace the payload.  Updates `size` and marks the entry dirty;
    /// the dirty bit is cleared only by a successful serialize.
    pub fn set_data(&mut self, data: &[u8]) {
        self.size = data.len();
        self.data = Some(data.to_vec());
        self.window = None;
        self.data_changed = true;
    }

    pub fn compressed(&self) -> bool {
        self.compressed
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        self.compressed = compressed;
    }

    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn set_encrypted(&mut self, encrypted: bool) {
        self.encrypted = encrypted;
    }

    pub fn data_changed(&self) -> bool {
        self.data_changed
    }
}

/// Insertion-ordered entry collection with an O(1) name index.
///
/// Indices are stable for the lifetime of the store: only `add` extends
/// the sequence and there is no removal (archives are append/rebuild
/// oriented).
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl EntryStore {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an empty entry.  Names must be non-empty and unique.
    pub fn add(&mut self, name: &str) -> Result<usize, ArchiveError> {
        if name.is_empty() {
            return Err(ArchiveError::CorruptData("entry name must be non-empty".into()));
        }
        if self.by_name.contains_key(name) {
            return Err(ArchiveError::DuplicateName(name.to_owned()));
        }
        let index = self.entries.len();
        self.entries.push(Entry::new(name.to_owned()));
        self.by_name.insert(name.to_owned(), index);
        Ok(index)
    }

    pub fn index_of(&self, name: &str) -> Result<usize, ArchiveError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ArchiveError::NotFound(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Result<&Entry, ArchiveError> {
        self.index_of(name).map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Entry, ArchiveError> {
        let i = self.index_of(name)?;
        Ok(&mut self.entries[i])
    }

    pub fn by_index(&self, index: usize) -> Result<&Entry, ArchiveError> {
        self.entries.get(index).ok_or(ArchiveError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    pub fn by_index_mut(&mut self, index: usize) -> Result<&mut Entry, ArchiveError> {
        let len = self.entries.len();
        self.entries
            .get_mut(index)
            .ok_or(ArchiveError::IndexOutOfRange { index, len })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut()
    }
}
