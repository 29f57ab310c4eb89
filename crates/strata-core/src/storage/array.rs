//! Fixed-granularity primitive array store.

use core::fmt;
use core::ops::Range;

use crate::codec::{Codec, Packing, Primitive};
use crate::error::{Result, StorageError};

use super::{IndexedStore, StorageKind};

/// Elements packed as `packing.count()` consecutive primitives of `P`.
pub struct ArrayStore<T, P> {
    data: Vec<P>,
    count: usize,
    packing: Packing<T, P>,
}

impl<T, P: Primitive> ArrayStore<T, P> {
    /// Allocate `count` zeroed elements.
    ///
    /// The primitive length `count * packing.count()` is checked against the
    /// largest allocation `Vec<P>` can address before anything is allocated.
    pub fn new(count: usize, packing: Packing<T, P>) -> Result<Self> {
        let width = packing.count();
        let limit = Self::limit();
        let len = count
            .checked_mul(width)
            .filter(|&len| len <= limit)
            .ok_or(StorageError::CapacityExceeded {
                count,
                width,
                limit,
            })?;
        Ok(Self {
            data: vec![P::default(); len],
            count,
            packing,
        })
    }

    /// Largest primitive count a single store may hold.
    pub fn limit() -> usize {
        isize::MAX as usize / core::mem::size_of::<P>().max(1)
    }

    /// The raw primitives, element 0 first.
    #[inline]
    pub fn primitives(&self) -> &[P] {
        &self.data
    }

    #[inline]
    pub(crate) fn primitives_mut(&mut self) -> &mut [P] {
        &mut self.data
    }

    #[inline]
    fn slots(&self, index: usize) -> Result<Range<usize>> {
        if index >= self.count {
            return Err(StorageError::IndexOutOfBounds {
                index,
                size: self.count,
            });
        }
        let width = self.packing.count();
        Ok(index * width..(index + 1) * width)
    }
}

impl<T: Codec, P: Primitive> IndexedStore<T> for ArrayStore<T, P> {
    #[inline]
    fn size(&self) -> usize {
        self.count
    }

    #[inline]
    fn get(&self, index: usize, out: &mut T) -> Result<()> {
        let slots = self.slots(index)?;
        self.packing.decode(&self.data[slots], out);
        Ok(())
    }

    #[inline]
    fn set(&mut self, index: usize, value: &T) -> Result<()> {
        let slots = self.slots(index)?;
        self.packing.encode(value, &mut self.data[slots]);
        Ok(())
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Array(P::KIND)
    }

    fn requires_exclusive_access(&self) -> bool {
        self.packing.count() != 1
    }

    fn duplicate(&self) -> Result<Self> {
        Ok(Self {
            data: self.data.clone(),
            count: self.count,
            packing: self.packing,
        })
    }

    fn allocate(&self, count: usize) -> Result<Self> {
        Self::new(count, self.packing)
    }
}

impl<T, P: fmt::Debug> fmt::Debug for ArrayStore<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayStore")
            .field("count", &self.count)
            .field("width", &self.packing.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use num_complex::Complex;

    use super::*;
    use crate::codec::Encoding;
    use crate::error::ErrorKind;

    fn f64_packing() -> Packing<f64, f64> {
        let Encoding::F64(p) = 0.0_f64.encoding() else {
            unreachable!()
        };
        p
    }

    fn complex_packing() -> Packing<Complex<f64>, f64> {
        let Encoding::F64(p) = Complex::new(0.0_f64, 0.0).encoding() else {
            unreachable!()
        };
        p
    }

    #[test]
    fn test_starts_zeroed() {
        let store = ArrayStore::new(4, f64_packing()).unwrap();
        assert_eq!(store.primitives(), &[0.0; 4]);
        assert_eq!(store.size(), 4);
    }

    #[test]
    fn test_multi_primitive_layout() {
        let mut store = ArrayStore::new(3, complex_packing()).unwrap();
        store.set(1, &Complex::new(2.0, -1.0)).unwrap();
        assert_eq!(store.primitives(), &[0.0, 0.0, 2.0, -1.0, 0.0, 0.0]);
        let mut out = Complex::default();
        store.get(1, &mut out).unwrap();
        assert_eq!(out, Complex::new(2.0, -1.0));
        assert!(store.requires_exclusive_access());
    }

    #[test]
    fn test_index_out_of_bounds() {
        let mut store = ArrayStore::new(2, f64_packing()).unwrap();
        let mut out = 0.0;
        assert_eq!(store.get(2, &mut out).unwrap_err().kind(), ErrorKind::Bounds);
        assert_eq!(store.set(5, &1.0).unwrap_err().kind(), ErrorKind::Bounds);
    }

    #[test]
    fn test_capacity_checked_before_allocation() {
        let limit = ArrayStore::<f64, f64>::limit();
        let err = ArrayStore::new(limit + 1, f64_packing()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::CapacityExceeded { width: 1, .. }
        ));
        // count fits, count * width does not
        let err = ArrayStore::new(limit / 2 + 1, complex_packing()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
        let err = ArrayStore::new(usize::MAX, complex_packing()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn test_duplicate_is_deep() {
        let mut store = ArrayStore::new(2, f64_packing()).unwrap();
        store.set(0, &9.5).unwrap();
        let copy = store.duplicate().unwrap();
        store.set(0, &1.0).unwrap();
        assert_eq!(copy.primitives(), &[9.5, 0.0]);
    }
}
