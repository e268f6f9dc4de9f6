//! Bit-vector packing for ordered boolean sequences.
//!
//! Bit `i` lives in byte `i / 8` at position `7 - i % 8`, so the first
//! flag is the most significant bit of the first byte. Unused trailing
//! bits in the last byte are always zero.
//!
//! ```text
//! [true, false, true]  →  0b1010_0000  →  [0xA0]
//! ```
//!
//! Unpacking needs the logical length from elsewhere (the `Names` payload
//! uses the length of its companion name list). A sender may omit trailing
//! all-false bytes; missing positions come back as `false`.

/// Packs `bits` into `ceil(len / 8)` bytes, MSB-first.
pub fn pack(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }
    bytes
}

/// Unpacks exactly `len` flags from `bytes`.
///
/// Only the first `min(bytes.len(), ceil(len / 8))` bytes are read.
/// Positions past the supplied data are `false`; surplus bits from the
/// last byte are discarded.
pub fn unpack(bytes: &[u8], len: usize) -> Vec<bool> {
    let used = bytes.len().min(len.div_ceil(8));
    let mut bits: Vec<bool> = bytes[..used]
        .iter()
        .flat_map(|&byte| (0..8).map(move |i| byte & (0x80 >> i) != 0))
        .collect();
    bits.resize(len, false);
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_empty_is_empty() {
        assert!(pack(&[]).is_empty());
    }

    #[test]
    fn test_pack_places_first_flag_in_high_bit() {
        assert_eq!(pack(&[true, false]), vec![0x80]);
        assert_eq!(pack(&[false, true, false, true]), vec![0x50]);
    }

    #[test]
    fn test_pack_spills_into_second_byte() {
        // Nine flags need two bytes; the ninth is the high bit of byte 1.
        let mut bits = vec![false; 9];
        bits[0] = true;
        bits[8] = true;
        assert_eq!(pack(&bits), vec![0x80, 0x80]);
    }

    #[test]
    fn test_pack_full_byte() {
        assert_eq!(pack(&[true; 8]), vec![0xFF]);
    }

    #[test]
    fn test_unpack_reads_msb_first() {
        assert_eq!(unpack(&[0xA0], 3), vec![true, false, true]);
    }

    #[test]
    fn test_unpack_pads_missing_bytes_with_false() {
        // The sender dropped the all-false second byte.
        let bits = unpack(&[0x01], 12);
        assert_eq!(bits.len(), 12);
        assert!(bits[7]);
        assert!(bits.iter().enumerate().all(|(i, &b)| b == (i == 7)));
    }

    #[test]
    fn test_unpack_with_no_bytes_yields_all_false() {
        assert_eq!(unpack(&[], 5), vec![false; 5]);
    }

    #[test]
    fn test_unpack_truncates_to_length() {
        assert_eq!(unpack(&[0xFF, 0xFF, 0xFF], 2), vec![true, true]);
    }

    #[test]
    fn test_unpack_zero_length_ignores_data() {
        assert!(unpack(&[0xFF], 0).is_empty());
    }

    #[test]
    fn test_pack_unpack_every_length_up_to_three_bytes() {
        for len in 0..=24 {
            // Alternating pattern with a twist so neighbouring bytes differ.
            let bits: Vec<bool> = (0..len).map(|i| i % 3 == 0 || i % 7 == 1).collect();
            assert_eq!(unpack(&pack(&bits), len), bits, "length {len}");
        }
    }
}
