use thiserror::Error;

/// Coarse classification of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A shape, store or coordinate space could not be assembled.
    Construction,
    /// A coordinate, linear index or axis lies outside the addressed shape.
    Bounds,
    /// An element count exceeds what the chosen representation can address.
    Capacity,
    /// A write to a padded coordinate disagrees with the synthesized value.
    Consistency,
    /// Reading or writing a page of an out-of-core store failed.
    Io,
}

/// All errors returned by `strata-core`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A shape cannot be built from the given extents.
    #[error("invalid shape {shape:?}: {reason}")]
    InvalidShape {
        shape: Vec<usize>,
        reason: &'static str,
    },

    /// A backing store does not hold exactly as many elements as the shape.
    #[error("shape holds {expected} elements but the store holds {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Two ranks that must agree do not.
    #[error("rank mismatch: expected {expected} axes, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// The element encoding cannot be represented by the requested store.
    #[error("{encoding} elements cannot be stored {reason}")]
    UnsupportedEncoding {
        encoding: &'static str,
        reason: &'static str,
    },

    /// A coordinate lies outside the shape.
    #[error("coordinate {coord:?} out of bounds for shape {shape:?}")]
    CoordinateOutOfBounds { coord: Vec<i64>, shape: Vec<usize> },

    /// A linear index lies outside `[0, size)`.
    #[error("index {index} out of bounds for size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    /// An axis number is not smaller than the rank.
    #[error("axis {axis} out of range for {ndim} dimensions")]
    AxisOutOfRange { axis: usize, ndim: usize },

    /// `count * width` primitives exceed the representation's limit.
    #[error("{count} elements of width {width} exceed the addressable limit of {limit}")]
    CapacityExceeded {
        count: usize,
        width: usize,
        limit: usize,
    },

    /// A value written outside the shape differs from the boundary value.
    #[error("value written at padded coordinate {coord:?} does not match the boundary value")]
    PaddingMismatch { coord: Vec<i64> },

    /// Paging I/O failed.
    #[error("paging i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidShape { .. }
            | Self::CountMismatch { .. }
            | Self::RankMismatch { .. }
            | Self::UnsupportedEncoding { .. } => ErrorKind::Construction,
            Self::CoordinateOutOfBounds { .. }
            | Self::IndexOutOfBounds { .. }
            | Self::AxisOutOfRange { .. } => ErrorKind::Bounds,
            Self::CapacityExceeded { .. } => ErrorKind::Capacity,
            Self::PaddingMismatch { .. } => ErrorKind::Consistency,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Convenience alias used throughout `strata-core`.
pub type Result<T> = std::result::Result<T, StorageError>;
