//! Arena store for element types without a primitive encoding.

use core::fmt;

use crate::codec::Codec;
use crate::error::{Result, StorageError};

use super::{IndexedStore, StorageKind};

/// One preallocated slot per element.
///
/// Slots live for the life of the store. `get` and `set` copy values in and
/// out with `clone_from`, so callers never hold on to a slot itself.
pub struct BoxedStore<T> {
    slots: Vec<T>,
}

impl<T: Codec> BoxedStore<T> {
    /// Allocate `count` slots holding `T::default()`.
    pub fn new(count: usize) -> Result<Self> {
        let limit = isize::MAX as usize / core::mem::size_of::<T>().max(1);
        if count > limit {
            return Err(StorageError::CapacityExceeded {
                count,
                width: 1,
                limit,
            });
        }
        Ok(Self {
            slots: vec![T::default(); count],
        })
    }

    #[inline]
    fn slot(&self, index: usize) -> Result<&T> {
        self.slots.get(index).ok_or(StorageError::IndexOutOfBounds {
            index,
            size: self.slots.len(),
        })
    }
}

impl<T: Codec> IndexedStore<T> for BoxedStore<T> {
    #[inline]
    fn size(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn get(&self, index: usize, out: &mut T) -> Result<()> {
        out.clone_from(self.slot(index)?);
        Ok(())
    }

    #[inline]
    fn set(&mut self, index: usize, value: &T) -> Result<()> {
        let size = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(StorageError::IndexOutOfBounds { index, size })?
            .clone_from(value);
        Ok(())
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Boxed
    }

    fn requires_exclusive_access(&self) -> bool {
        true
    }

    fn duplicate(&self) -> Result<Self> {
        Ok(Self {
            slots: self.slots.clone(),
        })
    }

    fn allocate(&self, count: usize) -> Result<Self> {
        Self::new(count)
    }
}

impl<T> fmt::Debug for BoxedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedStore")
            .field("count", &self.slots.len())
            .finish()
    }
}
