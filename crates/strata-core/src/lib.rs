//! `strata-core`: foundation crate for the Strata ecosystem.
//!
//! Provides multidimensional datasets over interchangeable element stores.
//! Higher-level `strata-*` crates build on top of this one.
//!
//! # Design
//!
//! - An element type declares its layout once through [`Codec`]; the
//!   [`Encoding`] it returns picks a dense primitive array, a bit-packed word
//!   array, a boxed arena, or a temp-file store paged through memory.
//! - A [`DimensionedDataset`] adds a [`Shape`] (axis 0 varies fastest) and
//!   metadata on top of any [`IndexedStore`].
//! - Views ([`Piped`]) and out-of-bounds decorators ([`ConstantPadded`],
//!   [`ProcedurePadded`]) borrow a dataset rather than copying it.
//! - Every fallible operation returns [`Result`]; nothing panics on bad
//!   input.

pub mod codec;
pub mod dataset;
pub mod error;
pub mod index;
pub mod storage;

// Re-export key types at crate root for convenience.
pub use codec::{Codec, Decimal, Encoding, UnsignedBits};
pub use dataset::{
    ConstantPadded, Dimensioned, DimensionedDataset, DimensionedSource, LinearCoordinateSpace,
    Metadata, Piped, ProcedurePadded,
};
pub use error::{ErrorKind, Result, StorageError};
pub use index::{Coordinate, Shape};
pub use storage::{IndexedStore, Storage, StorageKind, StorageOptions, StorageStrategy};

/// Items intended for glob-import: `use strata_core::prelude::*;`
pub mod prelude {
    pub use crate::codec::{Codec, Decimal, Encoding, UnsignedBits};
    pub use crate::dataset::{
        ConstantPadded, Dimensioned, DimensionedDataset, DimensionedSource,
        LinearCoordinateSpace, Piped, ProcedurePadded,
    };
    pub use crate::error::{ErrorKind, Result, StorageError};
    pub use crate::index::Shape;
    pub use crate::storage::{IndexedStore, StorageOptions, StorageStrategy};
}
