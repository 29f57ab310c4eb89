//! Shapes and mixed-radix address math.
//!
//! A [`Shape`] maps coordinates onto linear indices with axis 0 varying
//! fastest:
//!
//! ```text
//! multiplier[0] = 1
//! multiplier[i] = multiplier[i - 1] * extent[i - 1]
//! linear        = sum(coord[i] * multiplier[i])
//! ```
//!
//! Coordinates are signed so that negative positions can be reported as out
//! of bounds instead of wrapping. A coordinate may carry more axes than the
//! shape (the extra axes must be zero) or fewer (the missing axes are taken
//! as zero).

use smallvec::SmallVec;

use crate::error::{Result, StorageError};

/// A coordinate buffer sized for the common low-rank case.
pub type Coordinate = SmallVec<[i64; 4]>;

/// Ordered per-axis extents plus their precomputed multipliers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    extents: SmallVec<[usize; 4]>,
    multipliers: SmallVec<[usize; 4]>,
    len: usize,
}

impl Shape {
    /// Build a shape from per-axis extents.
    ///
    /// Fails if `extents` is empty or the element count overflows `usize`.
    ///
    /// ```
    /// # use strata_core::index::Shape;
    /// let shape = Shape::new(&[2, 3]).unwrap();
    /// assert_eq!(shape.num_elements(), 6);
    /// assert_eq!(shape.multipliers(), &[1, 2]);
    /// ```
    pub fn new(extents: &[usize]) -> Result<Self> {
        if extents.is_empty() {
            return Err(StorageError::InvalidShape {
                shape: Vec::new(),
                reason: "a shape needs at least one axis",
            });
        }
        let len = extents
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| StorageError::InvalidShape {
                shape: extents.to_vec(),
                reason: "element count overflows usize",
            })?;
        Ok(Self {
            extents: SmallVec::from_slice(extents),
            multipliers: compute_multipliers(extents),
            len,
        })
    }

    #[inline]
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    #[inline]
    pub fn multipliers(&self) -> &[usize] {
        &self.multipliers
    }

    /// Number of declared axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    #[inline]
    pub fn num_elements(&self) -> usize {
        self.len
    }

    /// Extent of axis `d`; axes beyond the declared rank have extent 1.
    #[inline]
    pub fn dimension(&self, d: usize) -> usize {
        self.extents.get(d).copied().unwrap_or(1)
    }

    // ------------------------------------------------------------------
    // Coordinate -> linear
    // ------------------------------------------------------------------

    /// Linearize `coord` without any validation.
    ///
    /// Only the axes shared by `coord` and the shape contribute. Out-of-bounds
    /// input yields a meaningless index.
    #[inline]
    #[allow(clippy::cast_sign_loss)]
    pub fn coordinate_to_linear(&self, coord: &[i64]) -> usize {
        coord
            .iter()
            .zip(self.multipliers.iter())
            .fold(0usize, |acc, (&c, &m)| {
                acc.wrapping_add((c as usize).wrapping_mul(m))
            })
    }

    /// Whether `coord` falls outside the shape.
    ///
    /// True if an overlapping axis is negative or not below its extent, or if
    /// an axis beyond the shape's rank is nonzero. Shape axes the coordinate
    /// leaves out are taken at position 0, which lies outside an empty axis.
    #[allow(clippy::cast_sign_loss)]
    pub fn is_out_of_bounds(&self, coord: &[i64]) -> bool {
        let covered = coord.len().min(self.rank());
        let (shared, excess) = coord.split_at(covered);
        shared
            .iter()
            .zip(self.extents.iter())
            .any(|(&c, &extent)| c < 0 || c as u64 >= extent as u64)
            || excess.iter().any(|&c| c != 0)
            || self.extents[covered..].contains(&0)
    }

    /// Fail with a bounds error if `coord` falls outside the shape.
    pub fn check_bounds(&self, coord: &[i64]) -> Result<()> {
        if self.is_out_of_bounds(coord) {
            return Err(StorageError::CoordinateOutOfBounds {
                coord: coord.to_vec(),
                shape: self.extents.to_vec(),
            });
        }
        Ok(())
    }

    /// Bounds-check `coord`, then linearize it.
    #[inline]
    pub fn checked_linear(&self, coord: &[i64]) -> Result<usize> {
        self.check_bounds(coord)?;
        Ok(self.coordinate_to_linear(coord))
    }

    // ------------------------------------------------------------------
    // Linear -> coordinate
    // ------------------------------------------------------------------

    /// Expand `linear` into `out`, highest axis first.
    ///
    /// `out` must hold at least `rank()` axes; any extra axes are zeroed.
    #[allow(clippy::cast_possible_wrap)]
    pub fn linear_to_coordinate(&self, linear: usize, out: &mut [i64]) -> Result<()> {
        if out.len() < self.rank() {
            return Err(StorageError::RankMismatch {
                expected: self.rank(),
                got: out.len(),
            });
        }
        if linear >= self.len {
            return Err(StorageError::IndexOutOfBounds {
                index: linear,
                size: self.len,
            });
        }
        let mut rest = linear;
        for axis in (0..self.rank()).rev() {
            let m = self.multipliers[axis];
            out[axis] = (rest / m) as i64;
            rest %= m;
        }
        out[self.rank()..].fill(0);
        Ok(())
    }

    /// Every coordinate of the shape, in linear-index order.
    pub fn coordinates(&self) -> Coordinates<'_> {
        Coordinates {
            shape: self,
            next: (self.len > 0).then(|| SmallVec::from_elem(0, self.rank())),
        }
    }
}

/// Iterator over the coordinates of a [`Shape`], axis 0 fastest.
#[derive(Debug, Clone)]
pub struct Coordinates<'s> {
    shape: &'s Shape,
    next: Option<Coordinate>,
}

impl Iterator for Coordinates<'_> {
    type Item = Coordinate;

    #[allow(clippy::cast_possible_wrap)]
    fn next(&mut self) -> Option<Coordinate> {
        let current = self.next.take()?;
        let mut advanced = current.clone();
        for (axis, &extent) in self.shape.extents.iter().enumerate() {
            advanced[axis] += 1;
            if advanced[axis] < extent as i64 {
                self.next = Some(advanced);
                return Some(current);
            }
            advanced[axis] = 0;
        }
        Some(current)
    }
}

/// Compute mixed-radix multipliers (axis 0 fastest) from extents.
pub fn compute_multipliers(extents: &[usize]) -> SmallVec<[usize; 4]> {
    let mut multipliers = SmallVec::with_capacity(extents.len());
    let mut running = 1usize;
    for &extent in extents {
        multipliers.push(running);
        running = running.saturating_mul(extent);
    }
    multipliers
}
