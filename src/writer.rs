//! Archive serialization — [`Archive`] in, byte buffer out.
//!
//! Every entry is encoded in insertion order (compress, then encrypt,
//! per its effective flags), payload start offsets are padded up to the
//! archive alignment, and the header/TOC fields are recomputed from the
//! final layout — never carried over from a prior parse.  Output is
//! byte-identical across runs for identical input state: the codec is
//! deterministic and the crypto layer derives its nonces from content.
//!
//! Any codec or crypto failure aborts the whole write; the in-memory
//! archive is never touched by this module.

use std::borrow::Cow;

use log::debug;

use crate::archive::Archive;
use crate::codec;
use crate::crypto;
use crate::dialect::{
    self, Header, Signature, TocRecord, ENTRY_COMPRESSED, ENTRY_ENCRYPTED, FLAG_COMPRESS,
    FLAG_ENCRYPT, FLAG_FOOTER_TOC,
};
use crate::entry::Entry;
use crate::error::ArchiveError;
use crate::reader;

pub(crate) fn serialize(
    archive: &Archive,
    signature: Signature,
    flags: u32,
) -> Result<Vec<u8>, ArchiveError> {
    let alignment = archive.alignment;
    if alignment == 0 || !alignment.is_power_of_two() {
        return Err(ArchiveError::InvalidAlignment(alignment));
    }
    let ft = signature == Signature::Modern && archive.ft;
    let flags = if ft {
        flags | FLAG_FOOTER_TOC
    } else {
        flags & !FLAG_FOOTER_TOC
    };
    let endian = signature.endian(flags);

    // Encode every payload first; nothing is emitted until the whole
    // entry set has survived the codec pipeline.
    let mut payloads: Vec<Vec<u8>> = Vec::with_capacity(archive.store.len());
    let mut entry_flags: Vec<u32> = Vec::with_capacity(archive.store.len());
    for entry in archive.store.iter() {
        let compressed = entry.compressed() || flags & FLAG_COMPRESS != 0;
        let encrypted = entry.encrypted() || flags & FLAG_ENCRYPT != 0;

        let plain = plaintext(archive, entry)?;
        let mut bytes = if compressed {
            codec::compress(&plain, archive.compression_level)?
        } else {
            plain.into_owned()
        };
        if encrypted {
            let key = archive.key.as_ref().ok_or(ArchiveError::MissingKey)?;
            bytes = crypto::encrypt(key, &bytes)?;
        }

        let mut ef = 0u32;
        if compressed {
            ef |= ENTRY_COMPRESSED;
        }
        if encrypted {
            ef |= ENTRY_ENCRYPTED;
        }
        payloads.push(bytes);
        entry_flags.push(ef);
    }

    // Layout: assign aligned payload offsets, then place the TOC.
    let header_size = signature.header_size() as u64;
    let toc_size: u64 = archive
        .store
        .iter()
        .map(|e| dialect::record_size(signature, e.name()) as u64)
        .sum();

    let payload_start = if ft {
        align_up(header_size, alignment)
    } else {
        align_up(header_size + toc_size, alignment)
    };
    let mut offsets: Vec<u64> = Vec::with_capacity(payloads.len());
    let mut cursor = payload_start;
    for bytes in &payloads {
        cursor = align_up(cursor, alignment);
        offsets.push(cursor);
        cursor += bytes.len() as u64;
    }
    let payload_end = if payloads.is_empty() { header_size } else { cursor };
    let toc_offset = if ft { payload_end } else { header_size };

    // Build the TOC from the final layout.
    let mut toc = Vec::with_capacity(toc_size as usize);
    for ((entry, &offset), (&ef, bytes)) in archive
        .store
        .iter()
        .zip(&offsets)
        .zip(entry_flags.iter().zip(&payloads))
    {
        let rec = TocRecord {
            name: entry.name().to_owned(),
            offset,
            stored_size: bytes.len() as u64,
            uncompressed_size: entry.size() as u64,
            flags: ef,
        };
        dialect::write_record(signature, endian, &rec, &mut toc)?;
    }
    debug_assert_eq!(toc.len() as u64, toc_size);

    let header = Header {
        signature,
        flags,
        compression_level: archive.compression_level,
        alignment,
        entry_count: archive.store.len() as u32,
        toc_offset,
        toc_size,
        toc_crc32: crc32fast::hash(&toc),
    };

    // Assemble.
    let total = if ft {
        toc_offset + toc_size
    } else if payloads.is_empty() {
        header_size + toc_size
    } else {
        payload_end
    };
    let mut out = Vec::with_capacity(total as usize);
    out.extend_from_slice(&dialect::write_header(&header));
    if !ft {
        out.extend_from_slice(&toc);
    }
    for (offset, bytes) in offsets.iter().zip(&payloads) {
        pad_to(&mut out, *offset);
        out.extend_from_slice(bytes);
    }
    if ft {
        pad_to(&mut out, toc_offset);
        out.extend_from_slice(&toc);
    }
    debug_assert_eq!(out.len() as u64, total);

    debug!(
        "serialized {} archive: {} entries, {} bytes, toc at {}",
        signature.name(),
        header.entry_count,
        out.len(),
        toc_offset
    );
    Ok(out)
}

/// Uncompressed payload of an entry: the materialized buffer, the
/// decoded stored bytes of a lazy entry, or empty for a freshly added
/// entry that never received data.
fn plaintext<'a>(archive: &'a Archive, entry: &'a Entry) -> Result<Cow<'a, [u8]>, ArchiveError> {
    if let Some(data) = entry.data() {
        return Ok(Cow::Borrowed(data));
    }
    if entry.window.is_some() {
        let source = archive
            .source
            .as_ref()
            .ok_or_else(|| ArchiveError::CorruptData("lazy entry lost its source buffer".into()))?;
        return Ok(Cow::Owned(reader::decode_stored(
            source,
            entry,
            archive.key.as_ref(),
        )?));
    }
    Ok(Cow::Borrowed(&[]))
}

fn align_up(value: u64, alignment: u32) -> u64 {
    let a = alignment as u64;
    (value + a - 1) & !(a - 1)
}

fn pad_to(out: &mut Vec<u8>, target: u64) {
    debug_assert!(out.len() as u64 <= target);
    out.resize(target as usize, 0);
}
