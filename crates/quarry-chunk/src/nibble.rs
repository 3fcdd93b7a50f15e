//! 4-bit light arrays.

use crate::section::SECTION_VOLUME;

/// Byte length of a populated light array.
pub const NIBBLE_BYTES: usize = SECTION_VOLUME / 2;

/// One 4-bit value per cell of a section, two per byte, low nibble first.
///
/// An empty array is a valid, distinct state: the layer exists but carries
/// no data yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NibbleArray {
    data: Vec<u8>,
}

impl NibbleArray {
    /// An array with no backing storage.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A populated array with every value set to `level`.
    pub fn filled(level: u8) -> Self {
        let level = level & 0x0F;
        Self {
            data: vec![level | (level << 4); NIBBLE_BYTES],
        }
    }

    /// Adopts bytes read from disk. Accepts 0 or [`NIBBLE_BYTES`] bytes.
    pub fn from_bytes(bytes: &[i8]) -> Option<Self> {
        match bytes.len() {
            0 | NIBBLE_BYTES => Some(Self {
                data: bytes.iter().map(|&b| b as u8).collect(),
            }),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Vec<i8> {
        self.data.iter().map(|&b| b as i8).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at `index`; 0 for an empty array.
    pub fn get(&self, index: usize) -> u8 {
        match self.data.get(index >> 1) {
            Some(&byte) if index & 1 == 0 => byte & 0x0F,
            Some(&byte) => byte >> 4,
            None => 0,
        }
    }

    /// Sets the value at `index`, allocating storage on first write.
    pub fn set(&mut self, index: usize, level: u8) {
        debug_assert!(index < SECTION_VOLUME, "index out of bounds");
        if self.data.is_empty() {
            self.data = vec![0; NIBBLE_BYTES];
        }
        let byte = &mut self.data[index >> 1];
        let level = level & 0x0F;
        if index & 1 == 0 {
            *byte = (*byte & 0xF0) | level;
        } else {
            *byte = (*byte & 0x0F) | (level << 4);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_nibble_first() {
        let mut arr = NibbleArray::empty();
        arr.set(0, 0x3);
        arr.set(1, 0xA);
        assert_eq!(arr.to_bytes()[0] as u8, 0xA3);
        assert_eq!(arr.get(0), 0x3);
        assert_eq!(arr.get(1), 0xA);
        assert_eq!(arr.get(2), 0);
    }

    #[test]
    fn test_lengths_accepted() {
        assert!(NibbleArray::from_bytes(&[]).unwrap().is_empty());
        assert!(NibbleArray::from_bytes(&[0; NIBBLE_BYTES]).is_some());
        assert!(NibbleArray::from_bytes(&[0; 100]).is_none());
    }

    #[test]
    fn test_filled() {
        let arr = NibbleArray::filled(15);
        assert_eq!(arr.get(0), 15);
        assert_eq!(arr.get(SECTION_VOLUME - 1), 15);
        assert_eq!(arr.get(0), NibbleArray::from_bytes(&arr.to_bytes()).unwrap().get(0));
    }
}
