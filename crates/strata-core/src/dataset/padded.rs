//! Out-of-bounds extension of a dataset.
//!
//! A padded dataset answers reads at any coordinate. Inside the wrapped
//! shape it delegates; outside it synthesizes a value, either a fixed
//! constant or the result of a procedure of the coordinate. Writes inside
//! delegate; writes outside succeed only when they agree with what a read
//! there would return.

use crate::codec::Codec;
use crate::error::{Result, StorageError};
use crate::index::Shape;

use super::{Dimensioned, DimensionedSource};

/// Answers out-of-bounds reads with a fixed value.
///
/// ```
/// # use strata_core::dataset::{ConstantPadded, DimensionedDataset, DimensionedSource};
/// let ds = DimensionedDataset::allocate(&[3, 3], &1.0_f64).unwrap();
/// let padded = ConstantPadded::new(&ds, -1.0);
/// let mut v = 0.0;
/// padded.get(&[-1, 4], &mut v).unwrap();
/// assert_eq!(v, -1.0);
/// padded.get(&[2, 2], &mut v).unwrap();
/// assert_eq!(v, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct ConstantPadded<D, T> {
    inner: D,
    value: T,
}

impl<D, T: Codec> ConstantPadded<D, T> {
    pub fn new(inner: D, value: T) -> Self {
        Self { inner, value }
    }

    /// The boundary value.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: DimensionedSource<T>, T: Codec> DimensionedSource<T> for ConstantPadded<D, T> {
    fn shape(&self) -> &Shape {
        self.inner.shape()
    }

    fn get(&self, coord: &[i64], out: &mut T) -> Result<()> {
        if self.inner.is_out_of_bounds(coord) {
            out.clone_from(&self.value);
            Ok(())
        } else {
            self.inner.get(coord, out)
        }
    }
}

impl<D: Dimensioned<T>, T: Codec> Dimensioned<T> for ConstantPadded<D, T> {
    fn set(&mut self, coord: &[i64], value: &T) -> Result<()> {
        if !self.inner.is_out_of_bounds(coord) {
            return self.inner.set(coord, value);
        }
        if *value == self.value {
            Ok(())
        } else {
            Err(StorageError::PaddingMismatch {
                coord: coord.to_vec(),
            })
        }
    }
}

/// Answers out-of-bounds reads by running `procedure(coord, out)`.
///
/// The procedure must be a pure function of the coordinate. Each call that
/// needs a comparison value computes it into a fresh local, so concurrent
/// readers never share scratch state.
///
/// ```
/// # use strata_core::dataset::{DimensionedDataset, DimensionedSource, ProcedurePadded};
/// let ds = DimensionedDataset::allocate(&[2], &0i64).unwrap();
/// let mirrored = ProcedurePadded::new(&ds, |c: &[i64], out: &mut i64| *out = c[0] * 10);
/// let mut v = 0;
/// mirrored.get(&[5], &mut v).unwrap();
/// assert_eq!(v, 50);
/// ```
#[derive(Debug, Clone)]
pub struct ProcedurePadded<D, F> {
    inner: D,
    procedure: F,
}

impl<D, F> ProcedurePadded<D, F> {
    pub fn new(inner: D, procedure: F) -> Self {
        Self { inner, procedure }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D, F, T> DimensionedSource<T> for ProcedurePadded<D, F>
where
    D: DimensionedSource<T>,
    F: Fn(&[i64], &mut T),
{
    fn shape(&self) -> &Shape {
        self.inner.shape()
    }

    fn get(&self, coord: &[i64], out: &mut T) -> Result<()> {
        if self.inner.is_out_of_bounds(coord) {
            (self.procedure)(coord, out);
            Ok(())
        } else {
            self.inner.get(coord, out)
        }
    }
}

impl<D, F, T> Dimensioned<T> for ProcedurePadded<D, F>
where
    D: Dimensioned<T>,
    F: Fn(&[i64], &mut T),
    T: Codec,
{
    fn set(&mut self, coord: &[i64], value: &T) -> Result<()> {
        if !self.inner.is_out_of_bounds(coord) {
            return self.inner.set(coord, value);
        }
        let mut expected = T::default();
        (self.procedure)(coord, &mut expected);
        if *value == expected {
            Ok(())
        } else {
            Err(StorageError::PaddingMismatch {
                coord: coord.to_vec(),
            })
        }
    }
}
