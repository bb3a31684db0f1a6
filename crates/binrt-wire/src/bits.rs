use crate::error::StreamError;

/// Widest bit field a single read can return.
pub const MAX_BIT_WIDTH: u32 = 64;

/// Mask with the lowest `n` bits set.
///
/// `n = 64` is special-cased because `(1 << 64) - 1` overflows.
///
/// | n  | mask                  |
/// |----|-----------------------|
/// | 0  | `0x0`                 |
/// | 3  | `0b111`               |
/// | 64 | `0xFFFF_FFFF_FFFF_FFFF` |
pub fn mask_ones(n: u32) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}

fn mask_ones_wide(n: u32) -> u128 {
    (1u128 << n) - 1
}

/// Leftover bits from unaligned bit reads.
///
/// A bit read first drains the bits already held here, then pulls as
/// many whole bytes from the stream as it still needs. The accumulator
/// never touches I/O itself: the stream asks [`bytes_needed`], fetches
/// that many bytes, and hands them to [`take_be`] / [`take_le`]. If the
/// fetch fails the accumulator has not been touched, so it never claims
/// bits that were not actually read.
///
/// ```text
///   big-endian bit order      little-endian bit order
///   ┌────────────────────┐    ┌────────────────────┐
///   │ bits  = b0 b1 b2…  │    │ bits  = …b2 b1 b0  │
///   │         ▲ read MSB │    │         read LSB ▲ │
///   └────────────────────┘    └────────────────────┘
/// ```
///
/// A 64-bit request with up to 7 bits already buffered spans 71 bits,
/// so the merge step is carried out in `u128`.
///
/// [`bytes_needed`]: Self::bytes_needed
/// [`take_be`]: Self::take_be
/// [`take_le`]: Self::take_le
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitAccumulator {
    bits: u64,
    bits_left: u32,
}

impl BitAccumulator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bits: 0,
            bits_left: 0,
        }
    }

    /// Number of buffered bits not yet consumed.
    pub fn bits_left(&self) -> u32 {
        self.bits_left
    }

    /// Raw buffered bits (only the low `bits_left` are meaningful).
    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits_left == 0
    }

    /// Discard any partially consumed byte.
    pub fn align(&mut self) {
        self.bits = 0;
        self.bits_left = 0;
    }

    /// Whole bytes that must be fetched before `n` bits can be taken.
    ///
    /// # Errors
    ///
    /// [`StreamError::InvalidArgument`] if `n` exceeds [`MAX_BIT_WIDTH`].
    pub fn bytes_needed(&self, n: u32) -> Result<usize, StreamError> {
        if n > MAX_BIT_WIDTH {
            return Err(StreamError::InvalidArgument(format!(
                "cannot read {n} bits at once, at most {MAX_BIT_WIDTH} supported"
            )));
        }
        if n <= self.bits_left {
            return Ok(0);
        }
        // 1 bit => 1 byte, 8 bits => 1 byte, 9 bits => 2 bytes
        Ok((n - self.bits_left).div_ceil(8) as usize)
    }

    /// Take `n` bits, most significant first, after appending `fetched`
    /// (which must hold exactly [`bytes_needed`](Self::bytes_needed) bytes).
    pub fn take_be(&mut self, n: u32, fetched: &[u8]) -> u64 {
        debug_assert!(n <= MAX_BIT_WIDTH);

        let mut acc = u128::from(self.bits);
        let mut left = self.bits_left;
        for &byte in fetched {
            acc = (acc << 8) | u128::from(byte);
            left += 8;
        }
        debug_assert!(left >= n, "not enough bits fetched");

        // Align the mask with the highest buffered bits.
        let shift = left - n;
        let result = ((acc >> shift) & mask_ones_wide(n)) as u64;

        // Clear the bits just read.
        left -= n;
        self.bits = (acc & mask_ones_wide(left)) as u64;
        self.bits_left = left;
        result
    }

    /// Take `n` bits, least significant first, after appending `fetched`.
    pub fn take_le(&mut self, n: u32, fetched: &[u8]) -> u64 {
        debug_assert!(n <= MAX_BIT_WIDTH);

        let mut acc = u128::from(self.bits);
        let mut left = self.bits_left;
        for &byte in fetched {
            acc |= u128::from(byte) << left;
            left += 8;
        }
        debug_assert!(left >= n, "not enough bits fetched");

        let result = (acc & mask_ones_wide(n)) as u64;

        acc >>= n;
        left -= n;
        self.bits = acc as u64;
        self.bits_left = left;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_be(acc: &mut BitAccumulator, n: u32, src: &mut &[u8]) -> u64 {
        let need = acc.bytes_needed(n).unwrap();
        let (fetched, rest) = src.split_at(need);
        *src = rest;
        acc.take_be(n, fetched)
    }

    fn read_le(acc: &mut BitAccumulator, n: u32, src: &mut &[u8]) -> u64 {
        let need = acc.bytes_needed(n).unwrap();
        let (fetched, rest) = src.split_at(need);
        *src = rest;
        acc.take_le(n, fetched)
    }

    #[test]
    fn mask_edges() {
        assert_eq!(mask_ones(0), 0);
        assert_eq!(mask_ones(1), 1);
        assert_eq!(mask_ones(8), 0xFF);
        assert_eq!(mask_ones(63), u64::MAX >> 1);
        assert_eq!(mask_ones(64), u64::MAX);
    }

    #[test]
    fn zero_bits_is_noop() {
        let mut acc = BitAccumulator::new();
        assert_eq!(acc.bytes_needed(0).unwrap(), 0);
        assert_eq!(acc.take_be(0, &[]), 0);
        assert_eq!(acc.take_le(0, &[]), 0);
        assert!(acc.is_empty());
    }

    #[test]
    fn rejects_more_than_64_bits() {
        let acc = BitAccumulator::new();
        assert!(matches!(
            acc.bytes_needed(65),
            Err(StreamError::InvalidArgument(_))
        ));
    }

    #[test]
    fn bytes_needed_accounts_for_buffered_bits() {
        let mut acc = BitAccumulator::new();
        assert_eq!(acc.bytes_needed(1).unwrap(), 1);
        assert_eq!(acc.bytes_needed(8).unwrap(), 1);
        assert_eq!(acc.bytes_needed(9).unwrap(), 2);

        acc.take_be(3, &[0xFF]);
        assert_eq!(acc.bits_left(), 5);
        assert_eq!(acc.bytes_needed(5).unwrap(), 0);
        assert_eq!(acc.bytes_needed(6).unwrap(), 1);
        assert_eq!(acc.bytes_needed(64).unwrap(), 8);
    }

    #[test]
    fn big_endian_splits_byte_msb_first() {
        // 0b1010_1100: fields 1 | 010 | 1100
        let mut src: &[u8] = &[0b1010_1100];
        let mut acc = BitAccumulator::new();
        assert_eq!(read_be(&mut acc, 1, &mut src), 0b1);
        assert_eq!(read_be(&mut acc, 3, &mut src), 0b010);
        assert_eq!(read_be(&mut acc, 4, &mut src), 0b1100);
        assert!(acc.is_empty());
    }

    #[test]
    fn little_endian_splits_byte_lsb_first() {
        // 0b1010_1100: fields (from LSB) 100 | 01 | 101
        let mut src: &[u8] = &[0b1010_1100];
        let mut acc = BitAccumulator::new();
        assert_eq!(read_le(&mut acc, 3, &mut src), 0b100);
        assert_eq!(read_le(&mut acc, 2, &mut src), 0b01);
        assert_eq!(read_le(&mut acc, 3, &mut src), 0b101);
        assert!(acc.is_empty());
    }

    #[test]
    fn big_endian_crosses_byte_boundary() {
        let mut src: &[u8] = &[0x12, 0x34, 0x56];
        let mut acc = BitAccumulator::new();
        assert_eq!(read_be(&mut acc, 4, &mut src), 0x1);
        assert_eq!(read_be(&mut acc, 12, &mut src), 0x234);
        assert_eq!(read_be(&mut acc, 8, &mut src), 0x56);
    }

    #[test]
    fn little_endian_crosses_byte_boundary() {
        let mut src: &[u8] = &[0x12, 0x34, 0x56];
        let mut acc = BitAccumulator::new();
        assert_eq!(read_le(&mut acc, 4, &mut src), 0x2);
        assert_eq!(read_le(&mut acc, 12, &mut src), 0x341);
        assert_eq!(read_le(&mut acc, 8, &mut src), 0x56);
    }

    #[test]
    fn full_64_bits_after_partial_byte() {
        // 1 bit consumed, then 64 bits spanning 9 bytes (71 bits merged).
        let bytes = [0xFFu8; 9];
        let mut src: &[u8] = &bytes;
        let mut acc = BitAccumulator::new();
        assert_eq!(read_be(&mut acc, 1, &mut src), 1);
        assert_eq!(read_be(&mut acc, 64, &mut src), u64::MAX);
        assert_eq!(acc.bits_left(), 7);

        let mut src: &[u8] = &bytes;
        let mut acc = BitAccumulator::new();
        assert_eq!(read_le(&mut acc, 1, &mut src), 1);
        assert_eq!(read_le(&mut acc, 64, &mut src), u64::MAX);
        assert_eq!(acc.bits_left(), 7);
    }

    #[test]
    fn full_64_bit_word_matches_integer_decoding() {
        let bytes = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
        let mut acc = BitAccumulator::new();
        assert_eq!(acc.take_be(64, &bytes), u64::from_be_bytes(bytes));
        let mut acc = BitAccumulator::new();
        assert_eq!(acc.take_le(64, &bytes), u64::from_le_bytes(bytes));
    }

    #[test]
    fn align_discards_partial_byte() {
        let mut src: &[u8] = &[0b1000_0000, 0xAB];
        let mut acc = BitAccumulator::new();
        assert_eq!(read_be(&mut acc, 1, &mut src), 1);
        acc.align();
        assert!(acc.is_empty());
        assert_eq!(acc.bits(), 0);
        assert_eq!(read_be(&mut acc, 8, &mut src), 0xAB);
    }
}
