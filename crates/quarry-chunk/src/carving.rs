//! Carving masks of proto chunks.
//!
//! One bit per cell of the chunk column, index `x | z << 4 | (y - min_y) << 8`,
//! marking cells a carver has already hollowed out.

use std::fmt;

/// Which carver pass a mask belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CarvingStep {
    Air,
    Liquid,
}

impl CarvingStep {
    pub const ALL: [CarvingStep; 2] = [CarvingStep::Air, CarvingStep::Liquid];

    /// Key used inside the `CarvingMasks` compound.
    pub fn name(self) -> &'static str {
        match self {
            CarvingStep::Air => "AIR",
            CarvingStep::Liquid => "LIQUID",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for CarvingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bit set over the cells of a chunk column.
///
/// Words read from disk are kept as-is, so a mask of unexpected length
/// survives a round trip; reads past the end return `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarvingMask {
    words: Vec<i64>,
}

impl CarvingMask {
    /// An empty mask for a column `height` cells tall.
    pub fn new(height: usize) -> Self {
        Self {
            words: vec![0; (256 * height).div_ceil(64)],
        }
    }

    pub fn from_longs(words: Vec<i64>) -> Self {
        Self { words }
    }

    pub fn as_longs(&self) -> &[i64] {
        &self.words
    }

    /// `y` is relative to the bottom of the world.
    pub fn get(&self, x: usize, y: usize, z: usize) -> bool {
        let bit = Self::index(x, y, z);
        self.words
            .get(bit / 64)
            .is_some_and(|w| (w >> (bit % 64)) & 1 != 0)
    }

    /// Sets or clears a cell. Writes past the end grow the mask.
    pub fn set(&mut self, x: usize, y: usize, z: usize, carved: bool) {
        let bit = Self::index(x, y, z);
        let word = bit / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        if carved {
            self.words[word] |= 1 << (bit % 64);
        } else {
            self.words[word] &= !(1 << (bit % 64));
        }
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn index(x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < 16 && z < 16);
        x | (z << 4) | (y << 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_size() {
        assert_eq!(CarvingMask::new(384).as_longs().len(), 1536);
    }

    #[test]
    fn test_get_set() {
        let mut mask = CarvingMask::new(384);
        mask.set(15, 383, 15, true);
        mask.set(0, 0, 0, true);
        assert!(mask.get(15, 383, 15));
        assert!(mask.get(0, 0, 0));
        assert!(!mask.get(1, 0, 0));
        assert_eq!(mask.count(), 2);
        mask.set(0, 0, 0, false);
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn test_short_mask_reads_false() {
        let mask = CarvingMask::from_longs(vec![-1]);
        assert!(mask.get(3, 0, 3));
        assert!(!mask.get(0, 10, 0));
    }

    #[test]
    fn test_step_names() {
        assert_eq!(CarvingStep::from_name("LIQUID"), Some(CarvingStep::Liquid));
        assert_eq!(CarvingStep::from_name("liquid"), None);
    }
}
