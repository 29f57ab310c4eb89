//! One-dimensional windows along a single axis of a dataset.

use core::ops::{Deref, DerefMut};

use crate::error::{Result, StorageError};
use crate::index::Coordinate;
use crate::storage::IndexedStore;

use super::DimensionedDataset;

/// The line of elements obtained by varying one axis of a dataset while the
/// others stay fixed.
///
/// Element `i` of the window sits at linear index `offset + i * stride` of
/// the parent's store. The window borrows (or owns) the parent through `D`:
/// `Piped<&DimensionedDataset<..>>` reads, `Piped<&mut DimensionedDataset<..>>`
/// reads and writes.
///
/// ```
/// # use strata_core::dataset::DimensionedDataset;
/// let mut ds = DimensionedDataset::allocate(&[4, 5, 6], &0i32).unwrap();
/// ds.safe_set(&[2, 4, 3], &42).unwrap();
/// let pipe = ds.piped(1, &[2, 0, 3]).unwrap();
/// assert_eq!(pipe.size(), 5);
/// let mut v = 0;
/// pipe.get(4, &mut v).unwrap();
/// assert_eq!(v, 42);
/// ```
#[derive(Debug, Clone)]
pub struct Piped<D> {
    data: D,
    axis: usize,
    origin: Coordinate,
    offset: usize,
    stride: usize,
    count: usize,
}

impl<T, S, D> Piped<D>
where
    D: Deref<Target = DimensionedDataset<T, S>>,
    S: IndexedStore<T>,
{
    /// Window along `axis` through `coord`.
    ///
    /// `coord` must name every axis of the parent. Its position on `axis` is
    /// ignored; every other position must be in bounds.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn new(data: D, axis: usize, coord: &[i64]) -> Result<Self> {
        let shape = data.shape();
        let rank = shape.rank();
        if coord.len() != rank {
            return Err(StorageError::RankMismatch {
                expected: rank,
                got: coord.len(),
            });
        }
        if axis >= rank {
            return Err(StorageError::AxisOutOfRange { axis, ndim: rank });
        }
        let mut origin = Coordinate::from_slice(coord);
        origin[axis] = 0;
        let fixed_out_of_bounds = origin
            .iter()
            .zip(shape.extents())
            .enumerate()
            .any(|(d, (&c, &extent))| d != axis && (c < 0 || c as u64 >= extent as u64));
        if fixed_out_of_bounds {
            return Err(StorageError::CoordinateOutOfBounds {
                coord: coord.to_vec(),
                shape: shape.extents().to_vec(),
            });
        }

        let count = shape.dimension(axis);
        let offset = shape.coordinate_to_linear(&origin);
        let stride = if count > 1 {
            let mut end = origin.clone();
            end[axis] = (count - 1) as i64;
            (shape.coordinate_to_linear(&end) - offset) / (count - 1)
        } else {
            1
        };

        Ok(Self {
            data,
            axis,
            origin,
            offset,
            stride,
            count,
        })
    }

    /// Number of elements along the window's axis.
    #[inline]
    pub fn size(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Linear index of element 0 in the parent's store.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Linear distance between consecutive elements.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    fn linear(&self, index: usize) -> Result<usize> {
        if index >= self.count {
            return Err(StorageError::IndexOutOfBounds {
                index,
                size: self.count,
            });
        }
        Ok(self.offset + index * self.stride)
    }

    pub fn get(&self, index: usize, out: &mut T) -> Result<()> {
        let linear = self.linear(index)?;
        self.data.store().get(linear, out)
    }

    /// A second window over the same parent, axis, and fixed coordinate.
    pub fn duplicate(&self) -> Result<Self>
    where
        D: Clone,
    {
        Self::new(self.data.clone(), self.axis, &self.origin)
    }
}

impl<T, S, D> Piped<D>
where
    D: DerefMut<Target = DimensionedDataset<T, S>>,
    S: IndexedStore<T>,
{
    pub fn set(&mut self, index: usize, value: &T) -> Result<()> {
        let linear = self.linear(index)?;
        self.data.store_mut().set(linear, value)
    }
}
