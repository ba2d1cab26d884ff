//! Dialect layer: signature detection plus header/TOC byte layout.
//!
//! Two dialect families are recognized, selected by the 4-byte magic at
//! offset 0:
//!
//! # Legacy — magic `"FArc"`, big-endian throughout
//! ```text
//! header (12 B):  magic [4] | entry_count u32 | alignment u32
//! record (136 B): name [120, NUL-padded] | offset u32 | stored_size u32
//!                 | uncompressed_size u32 | entry_flags u32
//! ```
//! The record table always follows the header (table-first only); the
//! entry count is explicit.  Names are limited to 119 bytes.
//!
//! # Modern — magic `"FARC"`
//! ```text
//! header (40 B):  magic [4] | flags u32 (always BE)
//!                 | compression_level i32 | alignment u32
//!                 | entry_count u32 | toc_offset u64 | toc_size u64
//!                 | toc_crc32 u32
//! record:         name (NUL-terminated) | offset u64 | stored_size u64
//!                 | uncompressed_size u64 | entry_flags u32
//! ```
//! Every field after `flags` uses the endianness declared by
//! [`FLAG_LITTLE_ENDIAN`] (big-endian when clear).  `toc_offset` locates
//! the record table: equal to the header size for table-first archives,
//! pointing past the payload region when [`FLAG_FOOTER_TOC`] is set.
//! `toc_crc32` is a CRC-32 over the raw TOC bytes.
//!
//! Offsets are absolute from the start of the buffer and every payload
//! offset is a multiple of `alignment` (power of two).

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::codec;
use crate::error::ArchiveError;

pub const MAGIC_LEGACY: [u8; 4] = *b"FArc"; // 0x46417263
pub const MAGIC_MODERN: [u8; 4] = *b"FARC"; // 0x46415243

pub const LEGACY_HEADER_SIZE: usize = 12;
pub const MODERN_HEADER_SIZE: usize = 40;
pub const LEGACY_RECORD_SIZE: usize = 136;
pub const LEGACY_NAME_FIELD: usize = 120;
/// Fixed per-record bytes in the modern dialect, excluding the name.
pub const MODERN_RECORD_FIXED: usize = 29;

// Archive-level flags (modern header; legacy has none).
pub const FLAG_COMPRESS: u32 = 1 << 0;
pub const FLAG_ENCRYPT: u32 = 1 << 1;
pub const FLAG_LITTLE_ENDIAN: u32 = 1 << 2;
/// TOC written after the payload region instead of directly after the header.
pub const FLAG_FOOTER_TOC: u32 = 1 << 3;

// Per-entry flags (TOC records, both dialects).
pub const ENTRY_COMPRESSED: u32 = 1 << 0;
pub const ENTRY_ENCRYPTED: u32 = 1 << 1;

// ── Endianness ───────────────────────────────────────────────────────────────

/// Runtime byte-order selector for multi-byte header/TOC fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Big => BigEndian::read_u32(buf),
            Endian::Little => LittleEndian::read_u32(buf),
        }
    }

    pub fn read_i32(self, buf: &[u8]) -> i32 {
        match self {
            Endian::Big => BigEndian::read_i32(buf),
            Endian::Little => LittleEndian::read_i32(buf),
        }
    }

    pub fn read_u64(self, buf: &[u8]) -> u64 {
        match self {
            Endian::Big => BigEndian::read_u64(buf),
            Endian::Little => LittleEndian::read_u64(buf),
        }
    }

    pub fn put_u32(self, out: &mut Vec<u8>, v: u32) {
        let mut b = [0u8; 4];
        match self {
            Endian::Big => BigEndian::write_u32(&mut b, v),
            Endian::Little => LittleEndian::write_u32(&mut b, v),
        }
        out.extend_from_slice(&b);
    }

    pub fn put_i32(self, out: &mut Vec<u8>, v: i32) {
        let mut b = [0u8; 4];
        match self {
            Endian::Big => BigEndian::write_i32(&mut b, v),
            Endian::Little => LittleEndian::write_i32(&mut b, v),
        }
        out.extend_from_slice(&b);
    }

    pub fn put_u64(self, out: &mut Vec<u8>, v: u64) {
        let mut b = [0u8; 8];
        match self {
            Endian::Big => BigEndian::write_u64(&mut b, v),
            Endian::Little => LittleEndian::write_u64(&mut b, v),
        }
        out.extend_from_slice(&b);
    }
}

// ── Signature ────────────────────────────────────────────────────────────────

/// Dialect discriminant, selected once at parse entry and threaded
/// through every read/write decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Legacy,
    Modern,
}

impl Signature {
    /// Inspect the magic at the start of `buf`.
    pub fn detect(buf: &[u8]) -> Result<Self, ArchiveError> {
        if buf.len() < 4 {
            return Err(ArchiveError::Truncated {
                needed: 4,
                available: buf.len() as u64,
            });
        }
        let magic: [u8; 4] = buf[..4].try_into().unwrap();
        match magic {
            MAGIC_LEGACY => Ok(Signature::Legacy),
            MAGIC_MODERN => Ok(Signature::Modern),
            _ => Err(ArchiveError::UnknownFormat),
        }
    }

    pub fn magic(self) -> [u8; 4] {
        match self {
            Signature::Legacy => MAGIC_LEGACY,
            Signature::Modern => MAGIC_MODERN,
        }
    }

    pub fn header_size(self) -> usize {
        match self {
            Signature::Legacy => LEGACY_HEADER_SIZE,
            Signature::Modern => MODERN_HEADER_SIZE,
        }
    }

    /// Fixed record width, or `None` for the modern variable-width table.
    pub fn entry_record_size(self) -> Option<usize> {
        match self {
            Signature::Legacy => Some(LEGACY_RECORD_SIZE),
            Signature::Modern => None,
        }
    }

    /// Byte order of every multi-byte field after the flags word.
    /// The legacy dialect is historically big-endian, always.
    pub fn endian(self, flags: u32) -> Endian {
        match self {
            Signature::Legacy => Endian::Big,
            Signature::Modern => {
                if flags & FLAG_LITTLE_ENDIAN != 0 {
                    Endian::Little
                } else {
                    Endian::Big
                }
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Signature::Legacy => "legacy",
            Signature::Modern => "modern",
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Decoded header fields, normalized across dialects.  Legacy archives
/// carry no flags or compression level; parsing fills defaults.
#[derive(Debug, Clone)]
pub struct Header {
    pub signature: Signature,
    pub flags: u32,
    pub compression_level: i32,
    pub alignment: u32,
    pub entry_count: u32,
    /// Absolute offset of the TOC region.
    pub toc_offset: u64,
    /// Byte length of the TOC region.
    pub toc_size: u64,
    /// CRC-32 of the raw TOC bytes (modern only; zero for legacy).
    pub toc_crc32: u32,
}

pub fn read_header(buf: &[u8], signature: Signature) -> Result<Header, ArchiveError> {
    let hs = signature.header_size();
    if buf.len() < hs {
        return Err(ArchiveError::Truncated {
            needed: hs as u64,
            available: buf.len() as u64,
        });
    }

    let header = match signature {
        Signature::Legacy => {
            let entry_count = BigEndian::read_u32(&buf[4..8]);
            let alignment = BigEndian::read_u32(&buf[8..12]);
            check_alignment(alignment)?;
            Header {
                signature,
                flags: 0,
                compression_level: codec::DEFAULT_LEVEL,
                alignment,
                entry_count,
                toc_offset: LEGACY_HEADER_SIZE as u64,
                toc_size: entry_count as u64 * LEGACY_RECORD_SIZE as u64,
                toc_crc32: 0,
            }
        }
        Signature::Modern => {
            let flags = BigEndian::read_u32(&buf[4..8]);
            let e = signature.endian(flags);
            let alignment = e.read_u32(&buf[12..16]);
            check_alignment(alignment)?;
            Header {
                signature,
                flags,
                compression_level: e.read_i32(&buf[8..12]),
                alignment,
                entry_count: e.read_u32(&buf[16..20]),
                toc_offset: e.read_u64(&buf[20..28]),
                toc_size: e.read_u64(&buf[28..36]),
                toc_crc32: e.read_u32(&buf[36..40]),
            }
        }
    };

    let toc_end = header
        .toc_offset
        .checked_add(header.toc_size)
        .ok_or_else(|| ArchiveError::CorruptData("TOC region overflows".into()))?;
    if toc_end > buf.len() as u64 || header.toc_offset < hs as u64 {
        return Err(ArchiveError::Truncated {
            needed: toc_end,
            available: buf.len() as u64,
        });
    }
    Ok(header)
}

pub fn write_header(h: &Header) -> Vec<u8> {
    let mut out = Vec::with_capacity(h.signature.header_size());
    out.extend_from_slice(&h.signature.magic());
    match h.signature {
        Signature::Legacy => {
            Endian::Big.put_u32(&mut out, h.entry_count);
            Endian::Big.put_u32(&mut out, h.alignment);
        }
        Signature::Modern => {
            Endian::Big.put_u32(&mut out, h.flags);
            let e = h.signature.endian(h.flags);
            e.put_i32(&mut out, h.compression_level);
            e.put_u32(&mut out, h.alignment);
            e.put_u32(&mut out, h.entry_count);
            e.put_u64(&mut out, h.toc_offset);
            e.put_u64(&mut out, h.toc_size);
            e.put_u32(&mut out, h.toc_crc32);
        }
    }
    out
}

fn check_alignment(alignment: u32) -> Result<(), ArchiveError> {
    if alignment == 0 || !alignment.is_power_of_two() {
        return Err(ArchiveError::CorruptData(format!(
            "declared alignment {alignment} is not a power of two"
        )));
    }
    Ok(())
}

// ── TOC records ──────────────────────────────────────────────────────────────

/// One decoded table-of-contents record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocRecord {
    pub name: String,
    pub offset: u64,
    pub stored_size: u64,
    pub uncompressed_size: u64,
    pub flags: u32,
}

/// Decode the record at `*pos` within the TOC slice, advancing `pos`.
pub fn read_record(
    signature: Signature,
    endian: Endian,
    toc: &[u8],
    pos: &mut usize,
) -> Result<TocRecord, ArchiveError> {
    let rec = match signature {
        Signature::Legacy => {
            let raw = slice(toc, *pos, LEGACY_RECORD_SIZE)?;
            let name_raw = &raw[..LEGACY_NAME_FIELD];
            let end = name_raw.iter().position(|&b| b == 0).unwrap_or(LEGACY_NAME_FIELD);
            let name = decode_name(&name_raw[..end])?;
            *pos += LEGACY_RECORD_SIZE;
            TocRecord {
                name,
                offset: endian.read_u32(&raw[120..124]) as u64,
                stored_size: endian.read_u32(&raw[124..128]) as u64,
                uncompressed_size: endian.read_u32(&raw[128..132]) as u64,
                flags: endian.read_u32(&raw[132..136]),
            }
        }
        Signature::Modern => {
            let rest = &toc[(*pos).min(toc.len())..];
            let nul = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| toc_truncated(toc))?;
            let name = decode_name(&rest[..nul])?;
            *pos += nul + 1;
            let raw = slice(toc, *pos, MODERN_RECORD_FIXED - 1)?;
            *pos += MODERN_RECORD_FIXED - 1;
            TocRecord {
                name,
                offset: endian.read_u64(&raw[0..8]),
                stored_size: endian.read_u64(&raw[8..16]),
                uncompressed_size: endian.read_u64(&raw[16..24]),
                flags: endian.read_u32(&raw[24..28]),
            }
        }
    };
    if rec.name.is_empty() {
        return Err(ArchiveError::CorruptData("empty entry name in TOC".into()));
    }
    Ok(rec)
}

/// Append the encoded record to `out`.
pub fn write_record(
    signature: Signature,
    endian: Endian,
    rec: &TocRecord,
    out: &mut Vec<u8>,
) -> Result<(), ArchiveError> {
    match signature {
        Signature::Legacy => {
            let bytes = rec.name.as_bytes();
            if bytes.len() >= LEGACY_NAME_FIELD {
                return Err(ArchiveError::NameTooLong {
                    name: rec.name.clone(),
                    max: LEGACY_NAME_FIELD - 1,
                });
            }
            let u32_max = u32::MAX as u64;
            if rec.offset > u32_max || rec.stored_size > u32_max || rec.uncompressed_size > u32_max
            {
                return Err(ArchiveError::CorruptData(format!(
                    "entry {:?} exceeds the legacy 32-bit field range",
                    rec.name
                )));
            }
            out.extend_from_slice(bytes);
            out.extend(std::iter::repeat(0u8).take(LEGACY_NAME_FIELD - bytes.len()));
            endian.put_u32(out, rec.offset as u32);
            endian.put_u32(out, rec.stored_size as u32);
            endian.put_u32(out, rec.uncompressed_size as u32);
            endian.put_u32(out, rec.flags);
        }
        Signature::Modern => {
            out.extend_from_slice(rec.name.as_bytes());
            out.push(0);
            endian.put_u64(out, rec.offset);
            endian.put_u64(out, rec.stored_size);
            endian.put_u64(out, rec.uncompressed_size);
            endian.put_u32(out, rec.flags);
        }
    }
    Ok(())
}

/// Encoded size of a record without building it.
pub fn record_size(signature: Signature, name: &str) -> usize {
    match signature {
        Signature::Legacy => LEGACY_RECORD_SIZE,
        Signature::Modern => name.len() + MODERN_RECORD_FIXED,
    }
}

fn decode_name(raw: &[u8]) -> Result<String, ArchiveError> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| ArchiveError::CorruptData("entry name is not valid UTF-8".into()))
}

fn slice(buf: &[u8], pos: usize, len: usize) -> Result<&[u8], ArchiveError> {
    buf.get(pos..pos + len).ok_or_else(|| toc_truncated(buf))
}

fn toc_truncated(toc: &[u8]) -> ArchiveError {
    ArchiveError::Truncated {
        needed: toc.len() as u64 + 1,
        available: toc.len() as u64,
    }
}
