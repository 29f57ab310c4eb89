//! Bit-packed store for sub-byte element widths.
//!
//! Element `i` occupies bits `[i * w, (i + 1) * w)` of a little-endian
//! stream of `u64` words, ignoring byte boundaries:
//!
//! ```text
//! word 0                                   word 1
//! |e0|e1|e2| ... |e20|e21 (low part)|      |e21 (high part)|e22| ...
//!                        ^ a field may straddle two words
//! ```

use core::fmt;

use crate::codec::{BitPacking, Codec};
use crate::error::{Result, StorageError};

use super::{IndexedStore, StorageKind};

const WORD_BITS: usize = 64;

/// Elements of `w` bits packed contiguously into `u64` words.
pub struct BitStore<T> {
    words: Vec<u64>,
    count: usize,
    packing: BitPacking<T>,
}

impl<T> BitStore<T> {
    /// Allocate `count` zeroed elements. The field width must be in `1..64`.
    pub fn new(count: usize, packing: BitPacking<T>) -> Result<Self> {
        let width = packing.width() as usize;
        if width == 0 || width >= WORD_BITS {
            return Err(StorageError::UnsupportedEncoding {
                encoding: "bits",
                reason: "with a field width outside 1..64",
            });
        }
        let limit = isize::MAX as usize / core::mem::size_of::<u64>();
        let words = count
            .checked_mul(width)
            .map(|bits| bits.div_ceil(WORD_BITS))
            .filter(|&words| words <= limit)
            .ok_or(StorageError::CapacityExceeded {
                count,
                width,
                limit: limit.saturating_mul(WORD_BITS),
            })?;
        Ok(Self {
            words: vec![0; words],
            count,
            packing,
        })
    }

    /// The packed words.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub(crate) fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    #[inline]
    fn mask(&self) -> u64 {
        (1u64 << self.packing.width()) - 1
    }

    /// `(word index, bit offset)` of element `index`.
    #[inline]
    fn locate(&self, index: usize) -> Result<(usize, u32)> {
        if index >= self.count {
            return Err(StorageError::IndexOutOfBounds {
                index,
                size: self.count,
            });
        }
        let bit = index * self.packing.width() as usize;
        #[allow(clippy::cast_possible_truncation)]
        Ok((bit / WORD_BITS, (bit % WORD_BITS) as u32))
    }

    fn read_field(&self, word: usize, offset: u32) -> u64 {
        let width = self.packing.width();
        let mut bits = self.words[word] >> offset;
        if offset + width > 64 {
            bits |= self.words[word + 1] << (64 - offset);
        }
        bits & self.mask()
    }

    fn write_field(&mut self, word: usize, offset: u32, bits: u64) {
        let width = self.packing.width();
        let mask = self.mask();
        let bits = bits & mask;
        self.words[word] = (self.words[word] & !(mask << offset)) | (bits << offset);
        if offset + width > 64 {
            let spill = 64 - offset;
            let next = &mut self.words[word + 1];
            *next = (*next & !(mask >> spill)) | (bits >> spill);
        }
    }
}

impl<T: Codec> IndexedStore<T> for BitStore<T> {
    #[inline]
    fn size(&self) -> usize {
        self.count
    }

    fn get(&self, index: usize, out: &mut T) -> Result<()> {
        let (word, offset) = self.locate(index)?;
        self.packing.decode(self.read_field(word, offset), out);
        Ok(())
    }

    fn set(&mut self, index: usize, value: &T) -> Result<()> {
        let (word, offset) = self.locate(index)?;
        let bits = self.packing.encode(value);
        self.write_field(word, offset, bits);
        Ok(())
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Bits {
            width: self.packing.width(),
        }
    }

    fn requires_exclusive_access(&self) -> bool {
        true
    }

    fn duplicate(&self) -> Result<Self> {
        Ok(Self {
            words: self.words.clone(),
            count: self.count,
            packing: self.packing,
        })
    }

    fn allocate(&self, count: usize) -> Result<Self> {
        Self::new(count, self.packing)
    }
}

impl<T> fmt::Debug for BitStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitStore")
            .field("count", &self.count)
            .field("width", &self.packing.width())
            .field("words", &self.words.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encoding, UnsignedBits};
    use crate::error::ErrorKind;

    fn packing<const W: u32>() -> BitPacking<UnsignedBits<W>> {
        let Encoding::Bits(b) = UnsignedBits::<W>::default().encoding() else {
            unreachable!()
        };
        b
    }

    #[test]
    fn test_word_count() {
        assert_eq!(BitStore::new(64, packing::<1>()).unwrap().words().len(), 1);
        assert_eq!(BitStore::new(65, packing::<1>()).unwrap().words().len(), 2);
        assert_eq!(BitStore::new(22, packing::<3>()).unwrap().words().len(), 2);
    }

    #[test]
    fn test_field_straddles_words() {
        // 3-bit fields: element 21 covers bits 63..66
        let mut store = BitStore::new(30, packing::<3>()).unwrap();
        store.set(21, &UnsignedBits::new(0b101)).unwrap();
        assert_eq!(store.words()[0], 1 << 63);
        assert_eq!(store.words()[1], 0b10);
        let mut out = UnsignedBits::default();
        store.get(21, &mut out).unwrap();
        assert_eq!(out.value(), 0b101);
        store.get(20, &mut out).unwrap();
        assert_eq!(out.value(), 0);
        store.get(22, &mut out).unwrap();
        assert_eq!(out.value(), 0);
    }

    #[test]
    fn test_neighbours_untouched() {
        let mut store = BitStore::new(100, packing::<7>()).unwrap();
        for i in 0..100 {
            store.set(i, &UnsignedBits::new((i % 128) as u8)).unwrap();
        }
        store.set(50, &UnsignedBits::new(0)).unwrap();
        let mut out = UnsignedBits::default();
        for i in 0..100 {
            store.get(i, &mut out).unwrap();
            let expected = if i == 50 { 0 } else { (i % 128) as u8 };
            assert_eq!(out.value(), expected, "element {i}");
        }
    }

    #[test]
    fn test_bounds_and_width() {
        let store = BitStore::new(3, packing::<2>()).unwrap();
        let mut out = UnsignedBits::default();
        assert_eq!(store.get(3, &mut out).unwrap_err().kind(), ErrorKind::Bounds);
        let wide = BitPacking::<u64>::new(64, |v| *v, |b, v| *v = b);
        assert_eq!(
            BitStore::new(1, wide).unwrap_err().kind(),
            ErrorKind::Construction
        );
        let err = BitStore::new(usize::MAX, packing::<2>()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }
}
