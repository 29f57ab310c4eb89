//! N-dimensional datasets over a backing store.
//!
//! A [`DimensionedDataset`] pairs an immutable [`Shape`] with an
//! [`IndexedStore`] and a little metadata. Coordinates are linearized with
//! axis 0 varying fastest, so for shape `[2, 3]`:
//!
//! ```text
//! coordinate  [0,0] [1,0] [0,1] [1,1] [0,2] [1,2]
//! linear        0     1     2     3     4     5
//! ```
//!
//! Access comes in two flavours:
//!
//! - `get` / `set` trust the coordinate. The linear index is summed with
//!   wrapping arithmetic; if it lands in `[0, size)` the access aliases that
//!   element, otherwise the store rejects it with a bounds error. For shape
//!   `[2, 3]`, `[2, 0]` reaches `[0, 1]` and `[-1, 1]` reaches `[1, 0]`,
//!   while `[-1, 0]` wraps below zero and `[0, 3]` runs past `size`, so both
//!   are rejected.
//! - `safe_get` / `safe_set` validate first and fail with a bounds error.
//!
//! One-dimensional windows are obtained with [`piped`](DimensionedDataset::piped),
//! and out-of-range reads are synthesized by wrapping a dataset in
//! [`ConstantPadded`] or [`ProcedurePadded`].

mod metadata;
mod padded;
mod piped;

pub use metadata::{LinearCoordinateSpace, Metadata};
pub use padded::{ConstantPadded, ProcedurePadded};
pub use piped::Piped;

use core::fmt;
use core::marker::PhantomData;

use crate::codec::Codec;
use crate::error::{Result, StorageError};
use crate::index::Shape;
use crate::storage::{self, IndexedStore, Storage, StorageOptions};

// ======================================================================
// Coordinate-addressed access traits
// ======================================================================

/// Read access by coordinate.
pub trait DimensionedSource<T> {
    fn shape(&self) -> &Shape;

    /// Copy the element at `coord` into `out`.
    fn get(&self, coord: &[i64], out: &mut T) -> Result<()>;

    #[inline]
    fn num_dimensions(&self) -> usize {
        self.shape().rank()
    }

    /// Extent of axis `d`; 1 for axes beyond the declared rank.
    #[inline]
    fn dimension(&self, d: usize) -> usize {
        self.shape().dimension(d)
    }

    #[inline]
    fn num_elements(&self) -> usize {
        self.shape().num_elements()
    }

    #[inline]
    fn is_out_of_bounds(&self, coord: &[i64]) -> bool {
        self.shape().is_out_of_bounds(coord)
    }
}

/// Write access by coordinate.
pub trait Dimensioned<T>: DimensionedSource<T> {
    /// Copy `value` into the element at `coord`.
    fn set(&mut self, coord: &[i64], value: &T) -> Result<()>;
}

impl<T, D: DimensionedSource<T> + ?Sized> DimensionedSource<T> for &D {
    #[inline]
    fn shape(&self) -> &Shape {
        (**self).shape()
    }

    #[inline]
    fn get(&self, coord: &[i64], out: &mut T) -> Result<()> {
        (**self).get(coord, out)
    }
}

impl<T, D: DimensionedSource<T> + ?Sized> DimensionedSource<T> for &mut D {
    #[inline]
    fn shape(&self) -> &Shape {
        (**self).shape()
    }

    #[inline]
    fn get(&self, coord: &[i64], out: &mut T) -> Result<()> {
        (**self).get(coord, out)
    }
}

impl<T, D: Dimensioned<T> + ?Sized> Dimensioned<T> for &mut D {
    #[inline]
    fn set(&mut self, coord: &[i64], value: &T) -> Result<()> {
        (**self).set(coord, value)
    }
}

// ======================================================================
// DimensionedDataset
// ======================================================================

/// A shape, the store holding its elements, and descriptive metadata.
///
/// The dataset owns its store; `numElements(shape) == store.size()` holds for
/// its whole life and the shape never changes.
pub struct DimensionedDataset<T, S = Storage<T>> {
    shape: Shape,
    store: S,
    metadata: Metadata,
    _element: PhantomData<fn() -> T>,
}

impl<T: Codec> DimensionedDataset<T> {
    /// Allocate a zeroed dataset of the given extents.
    ///
    /// The prototype's encoding picks the backing store.
    ///
    /// ```
    /// # use strata_core::dataset::DimensionedDataset;
    /// let mut ds = DimensionedDataset::allocate(&[2, 3], &0i32).unwrap();
    /// ds.safe_set(&[1, 2], &7).unwrap();
    /// let mut v = 0;
    /// ds.safe_get(&[1, 2], &mut v).unwrap();
    /// assert_eq!(v, 7);
    /// assert!(ds.safe_get(&[2, 0], &mut v).is_err());
    /// ```
    pub fn allocate(extents: &[usize], prototype: &T) -> Result<Self> {
        Self::allocate_with(extents, prototype, &StorageOptions::default())
    }

    /// Allocate with an explicit storage strategy.
    pub fn allocate_with(
        extents: &[usize],
        prototype: &T,
        options: &StorageOptions,
    ) -> Result<Self> {
        let shape = Shape::new(extents)?;
        let store = storage::allocate(shape.num_elements(), prototype, options)?;
        Self::from_parts(shape, store)
    }
}

impl<T, S: IndexedStore<T>> DimensionedDataset<T, S> {
    /// Wrap an existing store; it must hold exactly `product(extents)` elements.
    pub fn from_store(extents: &[usize], store: S) -> Result<Self> {
        Self::from_parts(Shape::new(extents)?, store)
    }

    fn from_parts(shape: Shape, store: S) -> Result<Self> {
        if shape.num_elements() != store.size() {
            return Err(StorageError::CountMismatch {
                expected: shape.num_elements(),
                actual: store.size(),
            });
        }
        Ok(Self {
            shape,
            store,
            metadata: Metadata::default(),
            _element: PhantomData,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn num_dimensions(&self) -> usize {
        self.shape.rank()
    }

    /// Extent of axis `d`; 1 for axes beyond the declared rank.
    #[inline]
    pub fn dimension(&self, d: usize) -> usize {
        self.shape.dimension(d)
    }

    #[inline]
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give up the dataset, keeping its store.
    pub fn into_store(self) -> S {
        self.store
    }

    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[inline]
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    // ------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------

    #[inline]
    pub fn is_out_of_bounds(&self, coord: &[i64]) -> bool {
        self.shape.is_out_of_bounds(coord)
    }

    /// Read without validating `coord`.
    #[inline]
    pub fn get(&self, coord: &[i64], out: &mut T) -> Result<()> {
        self.store.get(self.shape.coordinate_to_linear(coord), out)
    }

    /// Write without validating `coord`.
    #[inline]
    pub fn set(&mut self, coord: &[i64], value: &T) -> Result<()> {
        let index = self.shape.coordinate_to_linear(coord);
        self.store.set(index, value)
    }

    /// Read, failing with a bounds error if `coord` is outside the shape.
    #[inline]
    pub fn safe_get(&self, coord: &[i64], out: &mut T) -> Result<()> {
        let index = self.shape.checked_linear(coord)?;
        self.store.get(index, out)
    }

    /// Write, failing with a bounds error if `coord` is outside the shape.
    #[inline]
    pub fn safe_set(&mut self, coord: &[i64], value: &T) -> Result<()> {
        let index = self.shape.checked_linear(coord)?;
        self.store.set(index, value)
    }

    /// Deep copy: a duplicated store under the same shape and metadata.
    pub fn duplicate(&self) -> Result<Self> {
        Ok(Self {
            shape: self.shape.clone(),
            store: self.store.duplicate()?,
            metadata: self.metadata.clone(),
            _element: PhantomData,
        })
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Read-only window along `axis` through `coord`.
    ///
    /// `coord` must have one position per axis; its position on `axis` is
    /// ignored and the others must be in bounds.
    pub fn piped(&self, axis: usize, coord: &[i64]) -> Result<Piped<&Self>> {
        Piped::new(self, axis, coord)
    }

    /// Read-write window along `axis` through `coord`. Writes land in this
    /// dataset's store.
    pub fn piped_mut(&mut self, axis: usize, coord: &[i64]) -> Result<Piped<&mut Self>> {
        Piped::new(self, axis, coord)
    }
}

impl<T, S: IndexedStore<T>> DimensionedSource<T> for DimensionedDataset<T, S> {
    #[inline]
    fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    fn get(&self, coord: &[i64], out: &mut T) -> Result<()> {
        DimensionedDataset::get(self, coord, out)
    }
}

impl<T, S: IndexedStore<T>> Dimensioned<T> for DimensionedDataset<T, S> {
    #[inline]
    fn set(&mut self, coord: &[i64], value: &T) -> Result<()> {
        DimensionedDataset::set(self, coord, value)
    }
}

impl<T, S: fmt::Debug> fmt::Debug for DimensionedDataset<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimensionedDataset")
            .field("shape", &self.shape.extents())
            .field("store", &self.store)
            .field("metadata", &self.metadata)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encoding, UnsignedBits};
    use crate::error::ErrorKind;
    use crate::storage::{ArrayStore, StorageKind, StorageStrategy};

    #[test]
    fn test_linearization_example() {
        let mut ds = DimensionedDataset::allocate(&[2, 3], &0.0_f64).unwrap();
        let writes = [
            ([0, 0], 1.0),
            ([1, 0], 2.0),
            ([0, 1], 3.0),
            ([1, 1], 4.0),
            ([0, 2], 5.0),
            ([1, 2], 6.0),
        ];
        for (coord, v) in writes {
            ds.set(&coord, &v).unwrap();
        }
        let mut raw = Vec::new();
        let mut v = 0.0;
        for i in 0..ds.store().size() {
            ds.store().get(i, &mut v).unwrap();
            raw.push(v);
        }
        assert_eq!(raw, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let Storage::F64(array) = ds.store() else {
            panic!("f64 elements should live in an f64 array");
        };
        assert_eq!(array.primitives(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_roundtrip_every_coordinate() {
        let mut ds = DimensionedDataset::allocate(&[3, 4, 2], &0i64).unwrap();
        let coords: Vec<_> = ds.shape().coordinates().collect();
        for (n, c) in coords.iter().enumerate() {
            ds.safe_set(c, &(n as i64 * 10)).unwrap();
        }
        let mut v = 0;
        for (n, c) in coords.iter().enumerate() {
            ds.safe_get(c, &mut v).unwrap();
            assert_eq!(v, n as i64 * 10);
        }
    }

    #[test]
    fn test_safe_access_matches_bounds_predicate() {
        let mut ds = DimensionedDataset::allocate(&[4, 5], &0u8).unwrap();
        let probes: [&[i64]; 7] = [
            &[0, 0],
            &[3, 4],
            &[4, 0],
            &[-1, 2],
            &[1, 5],
            &[1, 1, 0],
            &[1, 1, 2],
        ];
        let mut v = 0;
        for coord in probes {
            let oob = ds.is_out_of_bounds(coord);
            let got = ds.safe_get(coord, &mut v);
            assert_eq!(got.is_err(), oob, "get {coord:?}");
            if let Err(e) = got {
                assert_eq!(e.kind(), ErrorKind::Bounds);
            }
            assert_eq!(ds.safe_set(coord, &1).is_err(), oob, "set {coord:?}");
        }
    }

    #[test]
    fn test_unchecked_access_aliases_or_rejects() {
        let mut ds = DimensionedDataset::allocate(&[2, 3], &0i32).unwrap();
        ds.safe_set(&[0, 1], &7).unwrap();
        ds.safe_set(&[1, 0], &9).unwrap();
        let mut v = 0;
        ds.get(&[2, 0], &mut v).unwrap();
        assert_eq!(v, 7);
        ds.get(&[-1, 1], &mut v).unwrap();
        assert_eq!(v, 9);
        assert_eq!(ds.get(&[-1, 0], &mut v).unwrap_err().kind(), ErrorKind::Bounds);
        assert_eq!(ds.set(&[0, 3], &1).unwrap_err().kind(), ErrorKind::Bounds);
    }

    #[test]
    fn test_empty_axis_left_out_of_coordinate() {
        let mut ds = DimensionedDataset::allocate(&[3, 0], &0i32).unwrap();
        assert!(ds.is_out_of_bounds(&[1]));
        let mut v = 0;
        let err = ds.safe_get(&[1], &mut v).unwrap_err();
        assert!(matches!(err, StorageError::CoordinateOutOfBounds { .. }));
        assert_eq!(ds.safe_set(&[1], &1).unwrap_err().kind(), ErrorKind::Bounds);

        let padded = ConstantPadded::new(&ds, -4);
        padded.get(&[1], &mut v).unwrap();
        assert_eq!(v, -4);
    }

    #[test]
    fn test_dimension_queries() {
        let ds = DimensionedDataset::allocate(&[4, 5, 6], &false).unwrap();
        assert_eq!(ds.num_dimensions(), 3);
        assert_eq!(ds.dimension(2), 6);
        assert_eq!(ds.dimension(3), 1);
        assert_eq!(ds.num_elements(), 120);
    }

    #[test]
    fn test_zero_dimension_shape_rejected() {
        let err = DimensionedDataset::allocate(&[], &0.0_f32).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn test_from_store_count_mismatch() {
        let Encoding::I32(p) = 0i32.encoding() else {
            unreachable!()
        };
        let store = ArrayStore::new(5, p).unwrap();
        let err = DimensionedDataset::<i32, _>::from_store(&[2, 3], store)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            StorageError::CountMismatch {
                expected: 6,
                actual: 5
            }
        ));
        let store = ArrayStore::new(6, p).unwrap();
        let ds = DimensionedDataset::<i32, _>::from_store(&[2, 3], store).unwrap();
        assert_eq!(ds.into_store().size(), 6);
    }

    #[test]
    fn test_file_backed_dataset() {
        let opts = StorageOptions::new().with_strategy(StorageStrategy::File);
        let mut ds = DimensionedDataset::allocate_with(&[40, 30], &0i16, &opts).unwrap();
        assert_eq!(ds.store().kind(), StorageKind::File);
        for c in ds.shape().coordinates().collect::<Vec<_>>() {
            ds.set(&c, &(c[0] as i16 - c[1] as i16)).unwrap();
        }
        let mut v = 0;
        ds.safe_get(&[39, 0], &mut v).unwrap();
        assert_eq!(v, 39);
        ds.safe_get(&[0, 29], &mut v).unwrap();
        assert_eq!(v, -29);
    }

    #[test]
    fn test_bit_packed_dataset() {
        let mut ds = DimensionedDataset::allocate(&[9, 9], &UnsignedBits::<1>::default()).unwrap();
        ds.safe_set(&[8, 8], &UnsignedBits::new(1)).unwrap();
        let mut v = UnsignedBits::default();
        ds.safe_get(&[8, 8], &mut v).unwrap();
        assert_eq!(v.value(), 1);
        ds.safe_get(&[7, 8], &mut v).unwrap();
        assert_eq!(v.value(), 0);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut ds = DimensionedDataset::allocate(&[3], &0i32).unwrap();
        ds.metadata_mut().set_name("counts");
        ds.set(&[1], &5).unwrap();
        let copy = ds.duplicate().unwrap();
        ds.set(&[1], &6).unwrap();
        let mut v = 0;
        copy.get(&[1], &mut v).unwrap();
        assert_eq!(v, 5);
        assert_eq!(copy.metadata().name(), "counts");
    }

    #[test]
    fn test_trait_access_through_references() {
        fn total<D: DimensionedSource<i32>>(d: D) -> i32 {
            let mut sum = 0;
            let mut v = 0;
            for c in d.shape().coordinates() {
                d.get(&c, &mut v).unwrap();
                sum += v;
            }
            sum
        }
        fn bump<D: Dimensioned<i32>>(mut d: D) {
            d.set(&[0, 0], &100).unwrap();
        }
        let mut ds = DimensionedDataset::allocate(&[2, 2], &0i32).unwrap();
        bump(&mut ds);
        ds.set(&[1, 1], &1).unwrap();
        assert_eq!(total(&ds), 101);
    }
}
