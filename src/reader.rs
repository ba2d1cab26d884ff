//! Archive parsing — byte buffer in, [`Archive`] out.
//!
//! Parsing is all-or-nothing: any malformed header, TOC record, or
//! (in eager mode) payload fails the whole parse and no partial
//! archive escapes.  Lazy mode keeps the source buffer alive inside
//! the archive; each entry's payload is decoded on first access and
//! cached, yielding bytes identical to an eager parse.

use log::debug;

use crate::archive::Archive;
use crate::codec;
use crate::crypto;
use crate::dialect::{self, Signature, ENTRY_COMPRESSED, ENTRY_ENCRYPTED, FLAG_FOOTER_TOC};
use crate::entry::{Entry, EntryStore, StoredWindow};
use crate::error::ArchiveError;

/// Whether payloads are decoded during parse or on first access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Eager,
    Lazy,
}

pub(crate) fn parse(
    bytes: Vec<u8>,
    mode: ParseMode,
    key: Option<[u8; 32]>,
) -> Result<Archive, ArchiveError> {
    let signature = Signature::detect(&bytes)?;
    let header = dialect::read_header(&bytes, signature)?;
    let endian = signature.endian(header.flags);

    let toc_start = header.toc_offset as usize;
    let toc = &bytes[toc_start..toc_start + header.toc_size as usize];
    if signature == Signature::Modern {
        let crc = crc32fast::hash(toc);
        if crc != header.toc_crc32 {
            return Err(ArchiveError::CorruptData(format!(
                "TOC checksum mismatch: header {:08x}, computed {crc:08x}",
                header.toc_crc32
            )));
        }
    }

    debug!(
        "parsing {} archive: {} entries, alignment {}, toc at {}",
        signature.name(),
        header.entry_count,
        header.alignment,
        header.toc_offset
    );

    let mut store = EntryStore::default();
    let mut pos = 0usize;
    for _ in 0..header.entry_count {
        let rec = dialect::read_record(signature, endian, toc, &mut pos)?;
        let end = rec
            .offset
            .checked_add(rec.stored_size)
            .ok_or_else(|| ArchiveError::CorruptData("payload range overflows".into()))?;
        if end > bytes.len() as u64 {
            return Err(ArchiveError::Truncated {
                needed: end,
                available: bytes.len() as u64,
            });
        }
        let compressed = rec.flags & ENTRY_COMPRESSED != 0;
        let encrypted = rec.flags & ENTRY_ENCRYPTED != 0;
        if !compressed && !encrypted && rec.stored_size != rec.uncompressed_size {
            return Err(ArchiveError::CorruptData(format!(
                "stored entry {:?} declares {} stored but {} uncompressed bytes",
                rec.name, rec.stored_size, rec.uncompressed_size
            )));
        }

        let index = store.add(&rec.name)?;
        let entry = store.by_index_mut(index)?;
        entry.size = rec.uncompressed_size as usize;
        entry.set_compressed(compressed);
        entry.set_encrypted(encrypted);
        entry.window = Some(StoredWindow {
            offset: rec.offset as usize,
            stored_size: rec.stored_size as usize,
        });
        entry.data_changed = false;
    }
    if pos != toc.len() {
        return Err(ArchiveError::CorruptData(format!(
            "TOC declares {} bytes but records occupy {pos}",
            toc.len()
        )));
    }

    let ft = signature == Signature::Modern && header.flags & FLAG_FOOTER_TOC != 0;

    let mut archive = Archive {
        signature,
        flags: header.flags,
        compression_level: header.compression_level,
        alignment: header.alignment,
        ft,
        store,
        source: Some(bytes),
        key,
    };

    if mode == ParseMode::Eager {
        materialize_all(&mut archive)?;
    }
    Ok(archive)
}

/// Decode every payload and drop the stored windows.
fn materialize_all(archive: &mut Archive) -> Result<(), ArchiveError> {
    let Some(source) = archive.source.take() else {
        return Ok(());
    };
    let key = archive.key;
    for entry in archive.store.iter_mut() {
        let data = decode_stored(&source, entry, key.as_ref())?;
        entry.data = Some(data);
        entry.window = None;
    }
    Ok(())
}

/// Run the stored bytes of one entry backwards through the pipeline:
/// decrypt, then decompress, then verify the uncompressed length.
pub(crate) fn decode_stored(
    source: &[u8],
    entry: &Entry,
    key: Option<&[u8; 32]>,
) -> Result<Vec<u8>, ArchiveError> {
    let window = entry
        .window
        .ok_or_else(|| ArchiveError::CorruptData("entry has no stored bytes".into()))?;
    let stored = &source[window.offset..window.offset + window.stored_size];

    let plain = if entry.encrypted() {
        let key = key.ok_or(ArchiveError::MissingKey)?;
        crypto::decrypt(key, stored)?
    } else {
        stored.to_vec()
    };

    if entry.compressed() {
        Ok(codec::decompress(&plain, entry.size())?)
    } else if plain.len() != entry.size() {
        Err(ArchiveError::CorruptData(format!(
            "entry {:?} decoded to {} bytes, expected {}",
            entry.name(),
            plain.len(),
            entry.size()
        )))
    } else {
        Ok(plain)
    }
}
