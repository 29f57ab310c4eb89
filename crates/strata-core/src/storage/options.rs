use std::path::{Path, PathBuf};

/// Largest temp file an out-of-core store may create: the furthest offset a
/// seek can address.
#[allow(clippy::cast_sign_loss)]
pub const MAX_FILE_BYTES: u64 = i64::MAX as u64;

/// Where element data is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StorageStrategy {
    /// In memory per the element's encoding; page to a temp file only when
    /// the in-memory representation cannot hold the element count, either
    /// because it cannot address it or because it exceeds the memory limit.
    #[default]
    Auto,
    /// Always in memory. Capacity errors are returned to the caller.
    Array,
    /// Always out of core.
    File,
}

/// Allocation settings for [`allocate`](super::allocate).
///
/// Both size limits are checked before anything is allocated or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
    strategy: StorageStrategy,
    temp_dir: Option<PathBuf>,
    memory_limit: Option<usize>,
    file_limit: u64,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            strategy: StorageStrategy::default(),
            temp_dir: None,
            memory_limit: None,
            file_limit: MAX_FILE_BYTES,
        }
    }
}

impl StorageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StorageStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Directory for out-of-core temp files. Defaults to the OS temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Cap, in bytes, on a single in-memory store. Unset means the
    /// representation's own addressable limit.
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Cap, in bytes, on a single temp file. Clamped to [`MAX_FILE_BYTES`].
    #[must_use]
    pub fn with_file_limit(mut self, bytes: u64) -> Self {
        self.file_limit = bytes.min(MAX_FILE_BYTES);
        self
    }

    #[inline]
    pub fn strategy(&self) -> StorageStrategy {
        self.strategy
    }

    #[inline]
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    #[inline]
    pub fn memory_limit(&self) -> Option<usize> {
        self.memory_limit
    }

    #[inline]
    pub fn file_limit(&self) -> u64 {
        self.file_limit
    }
}
