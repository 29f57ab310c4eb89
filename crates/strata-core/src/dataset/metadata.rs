//! Descriptive metadata attached to a dataset.

use std::borrow::Cow;

use crate::error::{Result, StorageError};
use crate::storage::IndexedStore;

use super::DimensionedDataset;

/// Names, units, and a coordinate calibration.
///
/// Unset fields read back as defaults: an empty name, source, and value unit,
/// a value type of `"unk"`, axis type `"d<i>"` for axis `i`, and an empty axis
/// unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    name: Option<String>,
    source: Option<String>,
    value_type: Option<String>,
    value_unit: Option<String>,
    axis_types: Vec<Option<String>>,
    axis_units: Vec<Option<String>>,
    coordinate_space: Option<LinearCoordinateSpace>,
}

fn axis_slot(slots: &mut Vec<Option<String>>, axis: usize) -> &mut Option<String> {
    if slots.len() <= axis {
        slots.resize(axis + 1, None);
    }
    &mut slots[axis]
}

impl Metadata {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn source(&self) -> &str {
        self.source.as_deref().unwrap_or("")
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    /// What the values measure, e.g. `"temperature"`.
    pub fn value_type(&self) -> &str {
        self.value_type.as_deref().unwrap_or("unk")
    }

    pub fn set_value_type(&mut self, value_type: impl Into<String>) {
        self.value_type = Some(value_type.into());
    }

    pub fn value_unit(&self) -> &str {
        self.value_unit.as_deref().unwrap_or("")
    }

    pub fn set_value_unit(&mut self, unit: impl Into<String>) {
        self.value_unit = Some(unit.into());
    }

    /// What axis `axis` measures; `"d<axis>"` if never set.
    pub fn axis_type(&self, axis: usize) -> Cow<'_, str> {
        match self.axis_types.get(axis).and_then(Option::as_deref) {
            Some(t) => Cow::Borrowed(t),
            None => Cow::Owned(format!("d{axis}")),
        }
    }

    pub fn set_axis_type(&mut self, axis: usize, axis_type: impl Into<String>) {
        *axis_slot(&mut self.axis_types, axis) = Some(axis_type.into());
    }

    pub fn axis_unit(&self, axis: usize) -> &str {
        self.axis_units
            .get(axis)
            .and_then(Option::as_deref)
            .unwrap_or("")
    }

    pub fn set_axis_unit(&mut self, axis: usize, unit: impl Into<String>) {
        *axis_slot(&mut self.axis_units, axis) = Some(unit.into());
    }

    pub fn coordinate_space(&self) -> Option<&LinearCoordinateSpace> {
        self.coordinate_space.as_ref()
    }
}

impl<T, S: IndexedStore<T>> DimensionedDataset<T, S> {
    /// Attach a calibration; its rank must match the dataset's.
    pub fn set_coordinate_space(&mut self, space: LinearCoordinateSpace) -> Result<()> {
        if space.rank() != self.num_dimensions() {
            return Err(StorageError::RankMismatch {
                expected: self.num_dimensions(),
                got: space.rank(),
            });
        }
        self.metadata_mut().coordinate_space = Some(space);
        Ok(())
    }

    /// The attached calibration, or the identity mapping if none was set.
    pub fn coordinate_space(&self) -> LinearCoordinateSpace {
        self.metadata()
            .coordinate_space()
            .cloned()
            .unwrap_or_else(|| LinearCoordinateSpace::identity(self.num_dimensions()))
    }
}

// ======================================================================
// LinearCoordinateSpace
// ======================================================================

/// Per-axis affine map from grid positions to physical coordinates:
/// `physical[i] = offset[i] + scale[i] * coord[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCoordinateSpace {
    scales: Vec<f64>,
    offsets: Vec<f64>,
}

impl LinearCoordinateSpace {
    /// ```
    /// # use strata_core::dataset::LinearCoordinateSpace;
    /// let space = LinearCoordinateSpace::new(vec![0.5, 2.0], vec![10.0, 0.0]).unwrap();
    /// let mut out = [0.0; 2];
    /// space.project(&[4, 3], &mut out).unwrap();
    /// assert_eq!(out, [12.0, 6.0]);
    /// ```
    pub fn new(scales: Vec<f64>, offsets: Vec<f64>) -> Result<Self> {
        if scales.len() != offsets.len() {
            return Err(StorageError::RankMismatch {
                expected: scales.len(),
                got: offsets.len(),
            });
        }
        if scales.is_empty() {
            return Err(StorageError::InvalidShape {
                shape: Vec::new(),
                reason: "a coordinate space needs at least one axis",
            });
        }
        Ok(Self { scales, offsets })
    }

    /// Unit scale and zero offset on every axis.
    pub fn identity(rank: usize) -> Self {
        Self {
            scales: vec![1.0; rank],
            offsets: vec![0.0; rank],
        }
    }

    pub fn rank(&self) -> usize {
        self.scales.len()
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn project_axis(&self, axis: usize, position: i64) -> Option<f64> {
        Some(self.offsets.get(axis)? + self.scales.get(axis)? * position as f64)
    }

    /// Map a grid coordinate of exactly `rank()` axes into `out`.
    pub fn project(&self, coord: &[i64], out: &mut [f64]) -> Result<()> {
        if coord.len() != self.rank() || out.len() != self.rank() {
            return Err(StorageError::RankMismatch {
                expected: self.rank(),
                got: if coord.len() != self.rank() {
                    coord.len()
                } else {
                    out.len()
                },
            });
        }
        for (axis, (&c, o)) in coord.iter().zip(out.iter_mut()).enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let c = c as f64;
            *o = self.offsets[axis] + self.scales[axis] * c;
        }
        Ok(())
    }
}
