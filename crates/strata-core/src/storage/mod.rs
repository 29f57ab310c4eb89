//! Backing stores: one-dimensional element storage addressed by linear index.
//!
//! | Store | Representation | Chosen for |
//! |-------|----------------|------------|
//! | [`ArrayStore`] | `Vec<P>`, `count` primitives per element | fixed-granularity encodings |
//! | [`BitStore`] | `w`-bit fields packed into `u64` words | [`Encoding::Bits`] |
//! | [`BoxedStore`] | arena of whole elements | [`Encoding::Boxed`] |
//! | [`FileStore`] | temp file paged through one 512-element buffer | out-of-core allocation |
//!
//! [`allocate`] resolves an element's [`Encoding`] once and wraps the
//! resulting store in the [`Storage`] tagged union.

mod array;
mod bits;
mod boxed;
mod file;
mod options;

pub use array::ArrayStore;
pub use bits::BitStore;
pub use boxed::BoxedStore;
pub use file::{FileStore, PAGE_ELEMENTS};
pub use options::{MAX_FILE_BYTES, StorageOptions, StorageStrategy};

use core::fmt;

use num_bigint::BigInt;

use crate::codec::{Codec, Encoding, PrimitiveKind};
use crate::error::{ErrorKind, Result, StorageError};

/// Tag describing how a store lays out its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// In-memory primitive array.
    Array(PrimitiveKind),
    /// In-memory bit-packed words.
    Bits { width: u32 },
    /// In-memory arena of whole elements.
    Boxed,
    /// Temp-file backed, paged.
    File,
}

/// Linear-index storage for elements of type `T`.
///
/// Every store rejects indices outside `[0, size)` with a bounds error.
pub trait IndexedStore<T> {
    /// Number of elements.
    fn size(&self) -> usize;

    /// Copy element `index` into `out`.
    fn get(&self, index: usize, out: &mut T) -> Result<()>;

    /// Copy `value` into element `index`.
    fn set(&mut self, index: usize, value: &T) -> Result<()>;

    fn kind(&self) -> StorageKind;

    /// True when one logical access touches several underlying slots or
    /// shared words, so concurrent use needs outside coordination even for
    /// distinct indices.
    fn requires_exclusive_access(&self) -> bool;

    /// Deep copy holding the same elements.
    fn duplicate(&self) -> Result<Self>
    where
        Self: Sized;

    /// Fresh zeroed store of the same representation with `count` elements.
    fn allocate(&self, count: usize) -> Result<Self>
    where
        Self: Sized;
}

/// The concrete store chosen for an element type.
pub enum Storage<T> {
    F64(ArrayStore<T, f64>),
    F32(ArrayStore<T, f32>),
    I64(ArrayStore<T, i64>),
    I32(ArrayStore<T, i32>),
    I16(ArrayStore<T, i16>),
    Bool(ArrayStore<T, bool>),
    BigInt(ArrayStore<T, BigInt>),
    Str(ArrayStore<T, String>),
    Char(ArrayStore<T, char>),
    I8(ArrayStore<T, i8>),
    Bits(BitStore<T>),
    Boxed(BoxedStore<T>),
    File(FileStore<T>),
}

macro_rules! dispatch {
    ($value:expr, $s:ident => $body:expr) => {
        match $value {
            Storage::F64($s) => $body,
            Storage::F32($s) => $body,
            Storage::I64($s) => $body,
            Storage::I32($s) => $body,
            Storage::I16($s) => $body,
            Storage::Bool($s) => $body,
            Storage::BigInt($s) => $body,
            Storage::Str($s) => $body,
            Storage::Char($s) => $body,
            Storage::I8($s) => $body,
            Storage::Bits($s) => $body,
            Storage::Boxed($s) => $body,
            Storage::File($s) => $body,
        }
    };
}

macro_rules! rewrap {
    ($value:expr, $s:ident => $body:expr) => {
        match $value {
            Storage::F64($s) => Storage::F64($body),
            Storage::F32($s) => Storage::F32($body),
            Storage::I64($s) => Storage::I64($body),
            Storage::I32($s) => Storage::I32($body),
            Storage::I16($s) => Storage::I16($body),
            Storage::Bool($s) => Storage::Bool($body),
            Storage::BigInt($s) => Storage::BigInt($body),
            Storage::Str($s) => Storage::Str($body),
            Storage::Char($s) => Storage::Char($body),
            Storage::I8($s) => Storage::I8($body),
            Storage::Bits($s) => Storage::Bits($body),
            Storage::Boxed($s) => Storage::Boxed($body),
            Storage::File($s) => Storage::File($body),
        }
    };
}

impl<T: Codec> Storage<T> {
    /// The file store behind this storage, if it is paged.
    pub fn as_file(&self) -> Option<&FileStore<T>> {
        match self {
            Self::File(store) => Some(store),
            _ => None,
        }
    }
}

impl<T: Codec> IndexedStore<T> for Storage<T> {
    #[inline]
    fn size(&self) -> usize {
        dispatch!(self, s => s.size())
    }

    #[inline]
    fn get(&self, index: usize, out: &mut T) -> Result<()> {
        dispatch!(self, s => s.get(index, out))
    }

    #[inline]
    fn set(&mut self, index: usize, value: &T) -> Result<()> {
        dispatch!(self, s => s.set(index, value))
    }

    fn kind(&self) -> StorageKind {
        dispatch!(self, s => s.kind())
    }

    fn requires_exclusive_access(&self) -> bool {
        dispatch!(self, s => s.requires_exclusive_access())
    }

    fn duplicate(&self) -> Result<Self> {
        Ok(rewrap!(self, s => s.duplicate()?))
    }

    fn allocate(&self, count: usize) -> Result<Self> {
        Ok(rewrap!(self, s => s.allocate(count)?))
    }
}

impl<T> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, s => fmt::Debug::fmt(s, f))
    }
}

// ======================================================================
// Factory
// ======================================================================

/// Allocate storage for `count` elements shaped like `prototype`.
///
/// The prototype's [`Encoding`] is resolved once here. See
/// [`StorageStrategy`] for how `options` overrides the in-memory default.
///
/// ```
/// # use strata_core::storage::{self, IndexedStore, StorageKind, StorageOptions};
/// # use strata_core::codec::PrimitiveKind;
/// let store = storage::allocate(10, &0.0_f32, &StorageOptions::default()).unwrap();
/// assert_eq!(store.size(), 10);
/// assert_eq!(store.kind(), StorageKind::Array(PrimitiveKind::F32));
/// ```
pub fn allocate<T: Codec>(
    count: usize,
    prototype: &T,
    options: &StorageOptions,
) -> Result<Storage<T>> {
    let encoding = prototype.encoding();
    match options.strategy() {
        StorageStrategy::Array => in_memory(count, encoding, options),
        StorageStrategy::File => out_of_core(count, encoding, options),
        StorageStrategy::Auto => match in_memory(count, encoding, options) {
            Err(e) if e.kind() == ErrorKind::Capacity && FileStore::<T>::pageable(&encoding) => {
                out_of_core(count, encoding, options)
            }
            other => other,
        },
    }
}

/// Fail with a capacity error if `count` elements exceed the configured
/// memory limit.
fn check_memory_limit<T>(
    count: usize,
    encoding: &Encoding<T>,
    options: &StorageOptions,
) -> Result<()> {
    let Some(limit) = options.memory_limit() else {
        return Ok(());
    };
    let bits = encoding.slot_bits();
    count
        .checked_mul(bits)
        .map(|total| total.div_ceil(8))
        .filter(|&bytes| bytes <= limit)
        .map(|_| ())
        .ok_or(StorageError::CapacityExceeded {
            count,
            width: bits.div_ceil(8),
            limit,
        })
}

fn in_memory<T: Codec>(
    count: usize,
    encoding: Encoding<T>,
    options: &StorageOptions,
) -> Result<Storage<T>> {
    check_memory_limit(count, &encoding, options)?;
    Ok(match encoding {
        Encoding::F64(p) => Storage::F64(ArrayStore::new(count, p)?),
        Encoding::F32(p) => Storage::F32(ArrayStore::new(count, p)?),
        Encoding::I64(p) => Storage::I64(ArrayStore::new(count, p)?),
        Encoding::I32(p) => Storage::I32(ArrayStore::new(count, p)?),
        Encoding::I16(p) => Storage::I16(ArrayStore::new(count, p)?),
        Encoding::Bool(p) => Storage::Bool(ArrayStore::new(count, p)?),
        Encoding::BigInt(p) => Storage::BigInt(ArrayStore::new(count, p)?),
        Encoding::Str(p) => Storage::Str(ArrayStore::new(count, p)?),
        Encoding::Char(p) => Storage::Char(ArrayStore::new(count, p)?),
        Encoding::I8(p) => Storage::I8(ArrayStore::new(count, p)?),
        Encoding::Bits(b) => Storage::Bits(BitStore::new(count, b)?),
        Encoding::Boxed => Storage::Boxed(BoxedStore::new(count)?),
    })
}

fn out_of_core<T: Codec>(
    count: usize,
    encoding: Encoding<T>,
    options: &StorageOptions,
) -> Result<Storage<T>> {
    FileStore::new(count, encoding, options).map(Storage::File)
}
