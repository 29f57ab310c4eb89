//! # Strata
//!
//! Multidimensional datasets with pluggable storage.
//!
//! One `use strata::prelude::*;` gives you shapes, datasets, one-dimensional
//! views, padded boundaries, and the element codecs that decide how values
//! are laid out in memory or on disk.
//!
//! ## Feature Flags
//!
//! | Feature | Enables |
//! |---------|---------|
//! | `core` *(default)* | Datasets, stores, codecs, views |
//!
//! ```
//! use strata::prelude::*;
//!
//! let mut ds = DimensionedDataset::allocate(&[2, 3], &0.0_f64).unwrap();
//! ds.safe_set(&[1, 2], &6.0).unwrap();
//! let padded = ConstantPadded::new(&ds, f64::NAN);
//! let mut v = 0.0;
//! padded.get(&[1, 2], &mut v).unwrap();
//! assert_eq!(v, 6.0);
//! padded.get(&[5, 5], &mut v).unwrap();
//! assert!(v.is_nan());
//! ```

#[cfg(feature = "core")]
pub use strata_core as core;

/// Glob-import convenience: `use strata::prelude::*;`
pub mod prelude {
    #[cfg(feature = "core")]
    pub use strata_core::prelude::*;
}
