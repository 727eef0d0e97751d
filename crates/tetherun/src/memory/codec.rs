//! Little-endian integer codec for remote memory elements.
//!
//! Byte `i` of the encoding is `(value >> 8i) & 0xFF`; decoding sums the
//! bytes back. Widths up to 8 bytes are exact. Floats do not go through here,
//! they round trip through their bit patterns.

/// Encodes the low `width` bytes of `value`, least significant first.
pub fn encode_le(value: u64, width: usize) -> Vec<u8> {
    (0..width)
        .map(|i| {
            let shift = (8 * i) as u32;
            (value.checked_shr(shift).unwrap_or(0) & 0xFF) as u8
        })
        .collect()
}

/// Inverse of [`encode_le`]. Bytes past the eighth are ignored.
pub fn decode_le(bytes: &[u8]) -> u64 {
    bytes.iter().take(8).enumerate().fold(0u64, |acc, (i, &byte)| {
        acc | (u64::from(byte) << (8 * i))
    })
}

pub fn reverse(mut bytes: Vec<u8>) -> Vec<u8> {
    bytes.reverse();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order() {
        assert_eq!(encode_le(0x0403_0201, 4), vec![1, 2, 3, 4]);
        assert_eq!(decode_le(&[1, 2, 3, 4]), 0x0403_0201);
    }

    #[test]
    fn test_truncates_to_width() {
        assert_eq!(encode_le(0x1_0000_00FF, 1), vec![0xFF]);
        assert_eq!(encode_le(0xABCD, 2), vec![0xCD, 0xAB]);
    }

    #[test]
    fn test_full_width() {
        let value = 0x8877_6655_4433_2211;
        assert_eq!(decode_le(&encode_le(value, 8)), value);
    }

    #[test]
    fn test_empty() {
        assert!(encode_le(5, 0).is_empty());
        assert_eq!(decode_le(&[]), 0);
    }
}
