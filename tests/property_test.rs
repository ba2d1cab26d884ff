use farc::dialect::FLAG_LITTLE_ENDIAN;
use farc::{Archive, ParseMode, Signature};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Round trip: any entry set under any per-entry compression
    /// pattern, alignment, endianness, and dialect comes back with
    /// identical names, sizes, and payload bytes.
    #[test]
    fn roundtrip_preserves_entries(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 0..8),
        compressed_bits in prop::collection::vec(any::<bool>(), 8),
        align_shift in 0u32..8,
        little in any::<bool>(),
        legacy in any::<bool>(),
    ) {
        let signature = if legacy { Signature::Legacy } else { Signature::Modern };
        let flags = if little && !legacy { FLAG_LITTLE_ENDIAN } else { 0 };

        let mut ar = Archive::new(signature, flags, false);
        ar.set_alignment(1 << align_shift).unwrap();
        for (i, data) in payloads.iter().enumerate() {
            let name = format!("entry_{i:02}.bin");
            ar.add_file_data(&name, data).unwrap();
            ar.get_file_mut(&name).unwrap().set_compressed(compressed_bits[i]);
        }

        let bytes = ar.to_bytes().unwrap();
        let mut back = Archive::parse(bytes.clone(), ParseMode::Eager).unwrap();

        prop_assert_eq!(back.len(), payloads.len());
        for (i, data) in payloads.iter().enumerate() {
            let name = format!("entry_{i:02}.bin");
            prop_assert_eq!(back.file_by_index(i).unwrap().name(), name.as_str());
            prop_assert_eq!(back.get_file(&name).unwrap().size(), data.len());
            prop_assert_eq!(back.file_data(&name).unwrap(), data.as_slice());
        }

        // Idempotence: reparse without mutation reproduces the bytes.
        let mut lazy = Archive::parse(bytes.clone(), ParseMode::Lazy).unwrap();
        prop_assert_eq!(lazy.to_bytes().unwrap(), bytes);
    }
}
