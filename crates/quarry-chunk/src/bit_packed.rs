//! Bit-packed array for storing fixed-width integer values in a compact `Vec<u64>`.
//!
//! Each element occupies exactly `bits` bits. Elements never straddle a word
//! boundary: a word holds `64 / bits` elements, filled from the least
//! significant bit upwards, and any leftover high bits are zero padding.

/// Errors raised when adopting externally supplied words.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BitPackError {
    /// The word count does not match `bits` and `len`.
    #[error("expected {expected} words for {len} entries at {bits} bits, got {actual}")]
    WordCount {
        /// Bits per element.
        bits: u8,
        /// Number of logical elements.
        len: usize,
        /// Words required.
        expected: usize,
        /// Words supplied.
        actual: usize,
    },
    /// The bit width is outside `0..=32`.
    #[error("unsupported bit width: {0}")]
    Width(u8),
}

/// A compact array where each element is stored using a fixed number of bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitPackedArray {
    /// Raw storage. Elements are packed into 64-bit words.
    data: Vec<u64>,
    /// Bits per element (0..=32; 0 means every element is zero).
    bits: u8,
    /// Total number of logical elements.
    len: usize,
}

impl BitPackedArray {
    /// Largest supported element width.
    pub const MAX_BITS: u8 = 32;

    /// Creates a new array with `len` elements, all initialized to zero.
    pub fn new(bits: u8, len: usize) -> Self {
        debug_assert!(bits <= Self::MAX_BITS, "bits must be at most 32");
        Self {
            data: vec![0u64; Self::word_count(bits, len)],
            bits,
            len,
        }
    }

    /// Packs `values` at the given width. Values wider than `bits` are masked.
    pub fn from_values(bits: u8, values: &[u32]) -> Self {
        let mut array = Self::new(bits, values.len());
        for (i, &v) in values.iter().enumerate() {
            array.set(i, v);
        }
        array
    }

    /// Number of `u64` words needed for `len` elements of `bits` bits.
    pub fn word_count(bits: u8, len: usize) -> usize {
        if bits == 0 {
            return 0;
        }
        let per_word = 64 / usize::from(bits);
        len.div_ceil(per_word)
    }

    /// Returns the value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len` in debug builds.
    pub fn get(&self, index: usize) -> u32 {
        debug_assert!(index < self.len, "index out of bounds");
        if self.bits == 0 {
            return 0;
        }
        let (word, offset) = self.locate(index);
        ((self.data[word] >> offset) & self.mask()) as u32
    }

    /// Sets the value at the given index, masking it to the element width.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len` in debug builds.
    pub fn set(&mut self, index: usize, value: u32) {
        debug_assert!(index < self.len, "index out of bounds");
        if self.bits == 0 {
            return;
        }
        let mask = self.mask();
        let (word, offset) = self.locate(index);
        self.data[word] &= !(mask << offset);
        self.data[word] |= (u64::from(value) & mask) << offset;
    }

    /// Iterates over all logical elements in index order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Returns the number of bits per element.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Returns the number of logical elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a reference to the raw `u64` storage words.
    pub fn raw_data(&self) -> &[u64] {
        &self.data
    }

    /// Storage words reinterpreted as signed longs, as written to disk.
    pub fn to_longs(&self) -> Vec<i64> {
        self.data.iter().map(|&w| w as i64).collect()
    }

    /// Adopts words read from disk, checking the word count.
    pub fn from_longs(bits: u8, len: usize, longs: &[i64]) -> Result<Self, BitPackError> {
        Self::from_raw(bits, len, longs.iter().map(|&l| l as u64).collect())
    }

    /// Constructs a `BitPackedArray` from raw parts, checking the word count.
    pub fn from_raw(bits: u8, len: usize, data: Vec<u64>) -> Result<Self, BitPackError> {
        if bits > Self::MAX_BITS {
            return Err(BitPackError::Width(bits));
        }
        let expected = Self::word_count(bits, len);
        if data.len() != expected {
            return Err(BitPackError::WordCount {
                bits,
                len,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, bits, len })
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    fn locate(&self, index: usize) -> (usize, u32) {
        let per_word = 64 / usize::from(self.bits);
        let word = index / per_word;
        let offset = (index % per_word) * usize::from(self.bits);
        (word, offset as u32)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bit_array() {
        let arr = BitPackedArray::new(0, 100);
        assert_eq!(arr.get(0), 0);
        assert_eq!(arr.get(99), 0);
        assert!(arr.raw_data().is_empty());
    }

    #[test]
    fn test_roundtrip_at_every_width() {
        for bits in 1..=32u8 {
            let max = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
            let values: Vec<u32> = (0..300u32).map(|i| i.wrapping_mul(2_654_435_761) & max).collect();
            let arr = BitPackedArray::from_values(bits, &values);
            assert_eq!(arr.iter().collect::<Vec<_>>(), values, "bits={bits}");
        }
    }

    #[test]
    fn test_entries_do_not_straddle_words() {
        // 5 bits: 12 entries per word, 4 padding bits at the top of each word.
        let mut arr = BitPackedArray::new(5, 13);
        arr.set(11, 0b11111);
        arr.set(12, 0b10101);
        assert_eq!(arr.raw_data().len(), 2);
        assert_eq!(arr.raw_data()[0], 0b11111u64 << 55);
        assert_eq!(arr.raw_data()[1], 0b10101);
    }

    #[test]
    fn test_little_endian_within_word() {
        let arr = BitPackedArray::from_values(4, &[0x1, 0x2, 0x3]);
        assert_eq!(arr.raw_data(), &[0x321]);
    }

    #[test]
    fn test_set_masks_value() {
        let mut arr = BitPackedArray::new(2, 4);
        arr.set(1, 0b111);
        assert_eq!(arr.get(1), 0b11);
        assert_eq!(arr.get(0), 0);
        assert_eq!(arr.get(2), 0);
    }

    #[test]
    fn test_word_counts() {
        assert_eq!(BitPackedArray::word_count(4, 4096), 256);
        assert_eq!(BitPackedArray::word_count(8, 4096), 512);
        assert_eq!(BitPackedArray::word_count(1, 64), 1);
        // 9 bits: 7 per word, 256 columns need 37 words.
        assert_eq!(BitPackedArray::word_count(9, 256), 37);
        assert_eq!(BitPackedArray::word_count(0, 4096), 0);
    }

    #[test]
    fn test_from_longs_checks_length() {
        let err = BitPackedArray::from_longs(4, 4096, &[0; 255]).unwrap_err();
        assert_eq!(
            err,
            BitPackError::WordCount {
                bits: 4,
                len: 4096,
                expected: 256,
                actual: 255
            }
        );
        assert!(BitPackedArray::from_longs(4, 4096, &[0; 256]).is_ok());
        assert_eq!(
            BitPackedArray::from_raw(33, 1, vec![0]),
            Err(BitPackError::Width(33))
        );
    }

    #[test]
    fn test_longs_preserve_sign_bit() {
        let arr = BitPackedArray::from_values(32, &[0, u32::MAX]);
        let longs = arr.to_longs();
        assert!(longs[0] < 0);
        assert_eq!(BitPackedArray::from_longs(32, 2, &longs).unwrap(), arr);
    }
}
