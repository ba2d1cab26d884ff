use farc::dialect::{
    self, Signature, ENTRY_ENCRYPTED, FLAG_COMPRESS, FLAG_ENCRYPT, FLAG_LITTLE_ENDIAN,
    MODERN_HEADER_SIZE,
};
use farc::{Archive, ArchiveError, ParseMode};

fn sample_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Scenario A: alignment 16, a 5-byte stored entry and a 1000-byte
/// compressed entry survive a serialize/parse round trip intact.
#[test]
fn mixed_entries_roundtrip() {
    let mut ar = Archive::new(Signature::Modern, 0, false);
    ar.set_alignment(16).unwrap();
    ar.add_file_data("a.bin", b"12345").unwrap();
    ar.add_file_data("b.bin", &sample_payload(1000)).unwrap();
    ar.get_file_mut("b.bin").unwrap().set_compressed(true);

    let bytes = ar.to_bytes().unwrap();
    let mut back = Archive::parse(bytes, ParseMode::Eager).unwrap();

    assert_eq!(back.len(), 2);
    assert_eq!(back.file_data("a.bin").unwrap(), b"12345");
    assert_eq!(back.file_data("b.bin").unwrap(), sample_payload(1000));
    assert_eq!(back.get_file("b.bin").unwrap().size(), 1000);
    assert!(back.get_file("b.bin").unwrap().compressed());
    assert!(!back.get_file("a.bin").unwrap().compressed());
}

/// Every payload offset in a serialized archive is a multiple of the
/// archive alignment.
#[test]
fn payload_offsets_are_aligned() {
    for alignment in [1u32, 16, 64, 512] {
        let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS, false);
        ar.set_alignment(alignment).unwrap();
        for i in 0..5 {
            ar.add_file_data(&format!("entry_{i}.bin"), &sample_payload(37 * (i + 1)))
                .unwrap();
        }
        let bytes = ar.to_bytes().unwrap();

        let header = dialect::read_header(&bytes, Signature::Modern).unwrap();
        let endian = Signature::Modern.endian(header.flags);
        let toc = &bytes[header.toc_offset as usize..(header.toc_offset + header.toc_size) as usize];
        let mut pos = 0;
        for _ in 0..header.entry_count {
            let rec = dialect::read_record(Signature::Modern, endian, toc, &mut pos).unwrap();
            assert_eq!(
                rec.offset % alignment as u64,
                0,
                "entry {:?} offset {} not aligned to {alignment}",
                rec.name,
                rec.offset
            );
        }
    }
}

/// Scenario B: truncating a valid buffer by one byte fails with Truncated.
#[test]
fn truncated_buffer_is_rejected() {
    let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS, false);
    ar.add_file_data("x.bin", &sample_payload(300)).unwrap();
    let bytes = ar.to_bytes().unwrap();

    let truncated = &bytes[..bytes.len() - 1];
    assert!(matches!(
        Archive::parse(truncated, ParseMode::Lazy),
        Err(ArchiveError::Truncated { .. })
    ));
}

/// Scenario C: clobbered magic bytes fail with UnknownFormat.
#[test]
fn unknown_magic_is_rejected() {
    let mut ar = Archive::default();
    ar.add_file_data("x.bin", b"payload").unwrap();
    let mut bytes = ar.to_bytes().unwrap();
    bytes[..4].copy_from_slice(&[0xAB, 0xCD, 0xEF, 0x01]);
    assert!(matches!(
        Archive::parse(bytes, ParseMode::Eager),
        Err(ArchiveError::UnknownFormat)
    ));
}

/// Scenario D: adding the same name twice fails with DuplicateName.
#[test]
fn duplicate_add_is_rejected() {
    let mut ar = Archive::default();
    ar.add_file("x").unwrap();
    assert!(matches!(
        ar.add_file("x"),
        Err(ArchiveError::DuplicateName(name)) if name == "x"
    ));
    assert_eq!(ar.len(), 1);
}

/// Fully materializing a lazy parse yields the same bytes as an eager
/// parse of the same input.
#[test]
fn eager_and_lazy_parses_agree() {
    let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS, false);
    for i in 0..4 {
        ar.add_file_data(&format!("f{i}"), &sample_payload(100 * i + 1))
            .unwrap();
    }
    let bytes = ar.to_bytes().unwrap();

    let mut eager = Archive::parse(bytes.clone(), ParseMode::Eager).unwrap();
    let mut lazy = Archive::parse(bytes, ParseMode::Lazy).unwrap();

    for i in 0..4 {
        // Lazy entries start unmaterialized and cache on first access.
        assert!(lazy.file_by_index(i).unwrap().data().is_none());
        assert_eq!(
            eager.data_by_index(i).unwrap().to_vec(),
            lazy.data_by_index(i).unwrap()
        );
        assert!(lazy.file_by_index(i).unwrap().data().is_some());
    }
}

/// serialize(parse(bytes)) reproduces bytes exactly when nothing was
/// mutated in between.
#[test]
fn unmutated_reserialize_is_byte_identical() {
    for (signature, flags, ft) in [
        (Signature::Modern, FLAG_COMPRESS, false),
        (Signature::Modern, FLAG_COMPRESS, true),
        (Signature::Modern, FLAG_COMPRESS | FLAG_LITTLE_ENDIAN, false),
        (Signature::Modern, 0, false),
        (Signature::Legacy, 0, false),
    ] {
        let mut ar = Archive::new(signature, flags, ft);
        ar.add_file_data("one.bin", &sample_payload(333)).unwrap();
        ar.add_file_data("two.bin", b"tiny").unwrap();
        let bytes = ar.to_bytes().unwrap();

        let mut reparsed = Archive::parse(bytes.clone(), ParseMode::Lazy).unwrap();
        assert_eq!(reparsed.to_bytes().unwrap(), bytes);

        let mut reparsed_eager = Archive::parse(bytes.clone(), ParseMode::Eager).unwrap();
        assert_eq!(reparsed_eager.to_bytes().unwrap(), bytes);
    }
}

/// Identical state serializes to identical bytes across runs.
#[test]
fn serialization_is_deterministic() {
    let build = || {
        let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS | FLAG_ENCRYPT, false);
        ar.set_key(Some([7u8; 32]));
        ar.add_file_data("a", &sample_payload(500)).unwrap();
        ar.add_file_data("b", &sample_payload(12)).unwrap();
        ar.to_bytes().unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn legacy_dialect_roundtrip() {
    let mut ar = Archive::new(Signature::Legacy, 0, false);
    ar.add_file_data("chara.bin", &sample_payload(200)).unwrap();
    ar.get_file_mut("chara.bin").unwrap().set_compressed(true);
    ar.add_file_data("motion.bin", b"stored verbatim").unwrap();

    let bytes = ar.to_bytes().unwrap();
    assert_eq!(&bytes[..4], b"FArc");

    let mut back = Archive::parse(bytes, ParseMode::Eager).unwrap();
    assert_eq!(back.signature(), Signature::Legacy);
    assert_eq!(back.file_data("chara.bin").unwrap(), sample_payload(200));
    assert_eq!(back.file_data("motion.bin").unwrap(), b"stored verbatim");
}

#[test]
fn legacy_rejects_overlong_names() {
    let mut ar = Archive::new(Signature::Legacy, 0, false);
    ar.add_file_data(&"n".repeat(150), b"data").unwrap();
    assert!(matches!(
        ar.to_bytes(),
        Err(ArchiveError::NameTooLong { .. })
    ));
}

#[test]
fn footer_toc_roundtrip() {
    let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS, true);
    ar.add_file_data("late.bin", &sample_payload(777)).unwrap();
    let bytes = ar.to_bytes().unwrap();

    // The TOC really is past the payload region.
    let header = dialect::read_header(&bytes, Signature::Modern).unwrap();
    assert!(header.toc_offset > MODERN_HEADER_SIZE as u64);

    let mut back = Archive::parse(bytes, ParseMode::Lazy).unwrap();
    assert!(back.ft());
    assert_eq!(back.file_data("late.bin").unwrap(), sample_payload(777));
}

#[test]
fn encrypted_roundtrip() {
    let key = [42u8; 32];
    let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS | FLAG_ENCRYPT, false);
    ar.set_key(Some(key));
    ar.add_file_data("secret.bin", &sample_payload(256)).unwrap();
    let bytes = ar.to_bytes().unwrap();

    let mut back = Archive::parse_with_key(bytes.clone(), ParseMode::Eager, key).unwrap();
    assert_eq!(back.file_data("secret.bin").unwrap(), sample_payload(256));
    assert!(back.get_file("secret.bin").unwrap().encrypted());

    // Wrong key: GCM authentication fails, surfacing as CorruptData.
    assert!(matches!(
        Archive::parse_with_key(bytes.clone(), ParseMode::Eager, [0u8; 32]),
        Err(ArchiveError::CorruptData(_))
    ));

    // No key at all: the decode path cannot even start.
    assert!(matches!(
        Archive::parse(bytes, ParseMode::Eager),
        Err(ArchiveError::MissingKey)
    ));
}

#[test]
fn per_entry_encryption_flag() {
    let key = [9u8; 32];
    let mut ar = Archive::new(Signature::Modern, 0, false);
    ar.set_key(Some(key));
    ar.add_file_data("plain.bin", b"plain").unwrap();
    ar.add_file_data("sealed.bin", b"sealed").unwrap();
    ar.get_file_mut("sealed.bin").unwrap().set_encrypted(true);
    let bytes = ar.to_bytes().unwrap();

    let header = dialect::read_header(&bytes, Signature::Modern).unwrap();
    let endian = Signature::Modern.endian(header.flags);
    let toc = &bytes[header.toc_offset as usize..(header.toc_offset + header.toc_size) as usize];
    let mut pos = 0;
    let first = dialect::read_record(Signature::Modern, endian, toc, &mut pos).unwrap();
    let second = dialect::read_record(Signature::Modern, endian, toc, &mut pos).unwrap();
    assert_eq!(first.flags & ENTRY_ENCRYPTED, 0);
    assert_ne!(second.flags & ENTRY_ENCRYPTED, 0);

    let mut back = Archive::parse_with_key(bytes, ParseMode::Lazy, key).unwrap();
    assert_eq!(back.file_data("plain.bin").unwrap(), b"plain");
    assert_eq!(back.file_data("sealed.bin").unwrap(), b"sealed");
}

#[test]
fn tampered_toc_is_rejected() {
    let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS, false);
    ar.add_file_data("x.bin", &sample_payload(64)).unwrap();
    let mut bytes = ar.to_bytes().unwrap();

    // Flip a bit inside the TOC region; the CRC check must catch it.
    let header = dialect::read_header(&bytes, Signature::Modern).unwrap();
    bytes[header.toc_offset as usize] ^= 0x01;
    assert!(matches!(
        Archive::parse(bytes, ParseMode::Lazy),
        Err(ArchiveError::CorruptData(_))
    ));
}

#[test]
fn dirty_bit_cleared_by_successful_write() {
    let mut ar = Archive::default();
    ar.add_file_data("x", b"abc").unwrap();
    assert!(ar.get_file("x").unwrap().data_changed());

    ar.to_bytes().unwrap();
    assert!(!ar.get_file("x").unwrap().data_changed());

    ar.get_file_mut("x").unwrap().set_data(b"replaced");
    assert!(ar.get_file("x").unwrap().data_changed());
    assert_eq!(ar.get_file("x").unwrap().size(), 8);
}

#[test]
fn failed_write_leaves_archive_unmodified() {
    let mut ar = Archive::new(Signature::Modern, FLAG_ENCRYPT, false);
    ar.add_file_data("x", b"abc").unwrap();
    // No key installed: the write must abort...
    assert!(matches!(ar.to_bytes(), Err(ArchiveError::MissingKey)));
    // ...and the dirty bit must survive.
    assert!(ar.get_file("x").unwrap().data_changed());
}

#[test]
fn empty_archive_roundtrip() {
    for signature in [Signature::Legacy, Signature::Modern] {
        let mut ar = Archive::new(signature, 0, false);
        let bytes = ar.to_bytes().unwrap();
        let back = Archive::parse(bytes.clone(), ParseMode::Eager).unwrap();
        assert_eq!(back.len(), 0);

        let mut reparsed = Archive::parse(bytes.clone(), ParseMode::Lazy).unwrap();
        assert_eq!(reparsed.to_bytes().unwrap(), bytes);
    }
}

#[test]
fn invalid_alignment_is_rejected() {
    let mut ar = Archive::default();
    assert!(matches!(
        ar.set_alignment(0),
        Err(ArchiveError::InvalidAlignment(0))
    ));
    assert!(matches!(
        ar.set_alignment(48),
        Err(ArchiveError::InvalidAlignment(48))
    ));
    ar.set_alignment(1).unwrap();
    ar.set_alignment(4096).unwrap();
}

#[test]
fn file_roundtrip_via_path_api() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets");

    let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS, false);
    ar.add_file_data("tex.bin", &sample_payload(2048)).unwrap();
    ar.add_file_data("spr.bin", b"sprite table").unwrap();
    ar.write_file(&path, true).unwrap();

    // add_extension appended ".farc".
    let archive_path = dir.path().join("assets.farc");
    let mut back = Archive::open(&archive_path, ParseMode::Lazy).unwrap();
    assert_eq!(back.len(), 2);

    let out = dir.path().join("out");
    back.extract_all(&out).unwrap();
    assert_eq!(std::fs::read(out.join("tex.bin")).unwrap(), sample_payload(2048));
    assert_eq!(std::fs::read(out.join("spr.bin")).unwrap(), b"sprite table");
}

#[test]
fn password_derived_key_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sealed.farc");

    let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS | FLAG_ENCRYPT, false);
    ar.set_password("correct horse").unwrap();
    ar.add_file_data("secret.txt", b"battery staple").unwrap();
    ar.write_file(&path, false).unwrap();

    let mut back = Archive::open_encrypted(&path, ParseMode::Eager, "correct horse").unwrap();
    assert_eq!(back.file_data("secret.txt").unwrap(), b"battery staple");

    assert!(Archive::open_encrypted(&path, ParseMode::Eager, "wrong").is_err());
}

#[test]
fn lookup_errors() {
    let mut ar = Archive::default();
    ar.add_file_data("only", b"x").unwrap();
    assert!(matches!(
        ar.get_file("missing"),
        Err(ArchiveError::NotFound(_))
    ));
    assert!(matches!(
        ar.file_by_index(5),
        Err(ArchiveError::IndexOutOfRange { index: 5, len: 1 })
    ));
}

/// Insertion order is significant and preserved across a round trip.
#[test]
fn insertion_order_is_preserved() {
    let names = ["zeta", "alpha", "mid", "omega"];
    let mut ar = Archive::new(Signature::Modern, FLAG_COMPRESS, false);
    for name in names {
        ar.add_file_data(name, name.as_bytes()).unwrap();
    }
    let bytes = ar.to_bytes().unwrap();
    let back = Archive::parse(bytes, ParseMode::Eager).unwrap();
    let parsed: Vec<&str> = back.files().map(|e| e.name()).collect();
    assert_eq!(parsed, names);
}
