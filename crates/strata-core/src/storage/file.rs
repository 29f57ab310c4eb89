//! Out-of-core store paged through a single resident buffer.
//!
//! The element data lives in a private temp file laid out in linear-index
//! order, one fixed-width record per element, zero-filled at creation. Only
//! one page of [`PAGE_ELEMENTS`] elements is resident at a time:
//!
//! ```text
//!            set() on page P
//!  Clean@P ------------------> Dirty@P
//!     ^                           |
//!     |  access outside P:        |  access outside P:
//!     |  load Q                   |  flush P, load Q
//!     +------- Clean@Q <----------+
//! ```
//!
//! Every operation takes one per-store lock. The page is written back only
//! when it is evicted or when [`FileStore::flush`] is called; dropping the
//! store discards the temp file together with any unflushed page.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use core::fmt;

use parking_lot::Mutex;

use crate::codec::{Codec, Encoding, FixedWidth};
use crate::error::{Result, StorageError};

use super::{ArrayStore, BitStore, IndexedStore, StorageKind, StorageOptions};

/// Elements per page.
pub const PAGE_ELEMENTS: usize = 512;

// ----------------------------------------------------------------------
// Page buffers
// ----------------------------------------------------------------------

/// An in-memory store that can be filled from and spilled to page bytes.
pub(crate) trait PageBuffer<T>: IndexedStore<T> + Send {
    /// Bytes one full page occupies on disk.
    fn page_bytes(&self) -> usize;

    fn read_page(&mut self, src: &[u8]);

    fn write_page(&self, out: &mut [u8]);

    fn boxed_copy(&self) -> Result<Box<dyn PageBuffer<T>>>;
}

impl<T: Codec, P: FixedWidth> PageBuffer<T> for ArrayStore<T, P> {
    fn page_bytes(&self) -> usize {
        self.primitives().len() * P::BYTES
    }

    fn read_page(&mut self, src: &[u8]) {
        for (slot, raw) in self
            .primitives_mut()
            .iter_mut()
            .zip(src.chunks_exact(P::BYTES))
        {
            *slot = P::read_le(raw);
        }
    }

    fn write_page(&self, out: &mut [u8]) {
        for (slot, raw) in self
            .primitives()
            .iter()
            .zip(out.chunks_exact_mut(P::BYTES))
        {
            slot.write_le(raw);
        }
    }

    fn boxed_copy(&self) -> Result<Box<dyn PageBuffer<T>>> {
        Ok(Box::new(self.duplicate()?))
    }
}

impl<T: Codec> PageBuffer<T> for BitStore<T> {
    fn page_bytes(&self) -> usize {
        self.words().len() * 8
    }

    fn read_page(&mut self, src: &[u8]) {
        for (word, raw) in self.words_mut().iter_mut().zip(src.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(raw);
            *word = u64::from_le_bytes(bytes);
        }
    }

    fn write_page(&self, out: &mut [u8]) {
        for (word, raw) in self.words().iter().zip(out.chunks_exact_mut(8)) {
            raw.copy_from_slice(&word.to_le_bytes());
        }
    }

    fn boxed_copy(&self) -> Result<Box<dyn PageBuffer<T>>> {
        Ok(Box::new(self.duplicate()?))
    }
}

fn page_buffer<T: Codec>(encoding: Encoding<T>) -> Result<Box<dyn PageBuffer<T>>> {
    let buffer: Box<dyn PageBuffer<T>> = match encoding {
        Encoding::F64(p) => Box::new(ArrayStore::new(PAGE_ELEMENTS, p)?),
        Encoding::F32(p) => Box::new(ArrayStore::new(PAGE_ELEMENTS, p)?),
        Encoding::I64(p) => Box::new(ArrayStore::new(PAGE_ELEMENTS, p)?),
        Encoding::I32(p) => Box::new(ArrayStore::new(PAGE_ELEMENTS, p)?),
        Encoding::I16(p) => Box::new(ArrayStore::new(PAGE_ELEMENTS, p)?),
        Encoding::Bool(p) => Box::new(ArrayStore::new(PAGE_ELEMENTS, p)?),
        Encoding::Char(p) => Box::new(ArrayStore::new(PAGE_ELEMENTS, p)?),
        Encoding::I8(p) => Box::new(ArrayStore::new(PAGE_ELEMENTS, p)?),
        Encoding::Bits(b) => Box::new(BitStore::new(PAGE_ELEMENTS, b)?),
        Encoding::BigInt(_) | Encoding::Str(_) | Encoding::Boxed => {
            return Err(StorageError::UnsupportedEncoding {
                encoding: encoding.name(),
                reason: "out of core: they have no fixed-width record",
            });
        }
    };
    Ok(buffer)
}

// ----------------------------------------------------------------------
// Pager
// ----------------------------------------------------------------------

/// Everything guarded by the store lock.
struct Pager<T> {
    file: File,
    buffer: Box<dyn PageBuffer<T>>,
    scratch: Vec<u8>,
    current_page: usize,
    dirty: bool,
    loads: u64,
    flushes: u64,
}

impl<T> Pager<T> {
    fn page_offset(&self, page: usize) -> u64 {
        page as u64 * self.scratch.len() as u64
    }

    /// Make the page holding `index` resident.
    fn load(&mut self, index: usize) -> Result<()> {
        let page = index / PAGE_ELEMENTS;
        if page == self.current_page {
            return Ok(());
        }
        self.flush()?;
        let offset = self.page_offset(page);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut self.scratch)?;
        self.buffer.read_page(&self.scratch);
        self.current_page = page;
        self.loads += 1;
        Ok(())
    }

    /// Write the resident page back if it was modified.
    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.buffer.write_page(&mut self.scratch);
        let offset = self.page_offset(self.current_page);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&self.scratch)?;
        self.dirty = false;
        self.flushes += 1;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// FileStore
// ----------------------------------------------------------------------

/// Temp-file backed store with single-page write-back caching.
pub struct FileStore<T> {
    count: usize,
    encoding: Encoding<T>,
    options: StorageOptions,
    pager: Mutex<Pager<T>>,
}

impl<T: Codec> FileStore<T> {
    /// Create a zero-filled temp file for `count` elements.
    ///
    /// The file is created in the options' temp directory, or the OS temp
    /// directory, and is removed when the store is dropped. A file larger
    /// than [`StorageOptions::file_limit`] bytes is refused before anything
    /// is created.
    pub fn new(count: usize, encoding: Encoding<T>, options: &StorageOptions) -> Result<Self> {
        let buffer = page_buffer(encoding)?;
        let page_bytes = buffer.page_bytes();
        let pages = count.div_ceil(PAGE_ELEMENTS);
        let limit = options.file_limit();
        (pages as u64)
            .checked_mul(page_bytes as u64)
            .filter(|&bytes| bytes <= limit)
            .ok_or(StorageError::CapacityExceeded {
                count,
                width: page_bytes.div_ceil(PAGE_ELEMENTS),
                limit: usize::try_from(limit).unwrap_or(usize::MAX),
            })?;

        let mut file = create_temp(options.temp_dir())?;
        let zeros = vec![0u8; page_bytes];
        for _ in 0..pages {
            file.write_all(&zeros)?;
        }
        file.flush()?;

        Ok(Self {
            count,
            encoding,
            options: options.clone(),
            pager: Mutex::new(Pager {
                file,
                buffer,
                scratch: zeros,
                current_page: 0,
                dirty: false,
                loads: 0,
                flushes: 0,
            }),
        })
    }

    /// Whether elements with this encoding have a fixed-width page record.
    pub fn pageable(encoding: &Encoding<T>) -> bool {
        !matches!(
            encoding,
            Encoding::BigInt(_) | Encoding::Str(_) | Encoding::Boxed
        )
    }

    /// Write the resident page back to the temp file if it is dirty.
    pub fn flush(&self) -> Result<()> {
        self.pager.lock().flush()
    }

    /// Page currently held in memory.
    pub fn current_page(&self) -> usize {
        self.pager.lock().current_page
    }

    /// Whether the resident page has unflushed writes.
    pub fn is_dirty(&self) -> bool {
        self.pager.lock().dirty
    }

    /// Number of pages read from disk so far.
    pub fn page_loads(&self) -> u64 {
        self.pager.lock().loads
    }

    /// Number of pages written back so far.
    pub fn page_flushes(&self) -> u64 {
        self.pager.lock().flushes
    }

    #[inline]
    fn check(&self, index: usize) -> Result<()> {
        if index >= self.count {
            return Err(StorageError::IndexOutOfBounds {
                index,
                size: self.count,
            });
        }
        Ok(())
    }
}

fn create_temp(dir: Option<&Path>) -> std::io::Result<File> {
    match dir {
        Some(dir) => tempfile::tempfile_in(dir),
        None => tempfile::tempfile(),
    }
}

impl<T: Codec> IndexedStore<T> for FileStore<T> {
    #[inline]
    fn size(&self) -> usize {
        self.count
    }

    fn get(&self, index: usize, out: &mut T) -> Result<()> {
        self.check(index)?;
        let mut pager = self.pager.lock();
        pager.load(index)?;
        pager.buffer.get(index % PAGE_ELEMENTS, out)
    }

    fn set(&mut self, index: usize, value: &T) -> Result<()> {
        self.check(index)?;
        let pager = self.pager.get_mut();
        pager.load(index)?;
        pager.buffer.set(index % PAGE_ELEMENTS, value)?;
        pager.dirty = true;
        Ok(())
    }

    fn kind(&self) -> StorageKind {
        StorageKind::File
    }

    fn requires_exclusive_access(&self) -> bool {
        false
    }

    /// Byte-for-byte copy into a fresh temp file; the resident page, its
    /// dirty flag and page number are cloned independently.
    fn duplicate(&self) -> Result<Self> {
        let mut pager = self.pager.lock();
        let mut file = create_temp(self.options.temp_dir())?;
        pager.file.seek(SeekFrom::Start(0))?;
        std::io::copy(&mut pager.file, &mut file)?;
        file.flush()?;

        Ok(Self {
            count: self.count,
            encoding: self.encoding,
            options: self.options.clone(),
            pager: Mutex::new(Pager {
                file,
                buffer: pager.buffer.boxed_copy()?,
                scratch: pager.scratch.clone(),
                current_page: pager.current_page,
                dirty: pager.dirty,
                loads: 0,
                flushes: 0,
            }),
        })
    }

    fn allocate(&self, count: usize) -> Result<Self> {
        Self::new(count, self.encoding, &self.options)
    }
}

impl<T> fmt::Debug for FileStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("count", &self.count)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use num_complex::Complex;

    use super::*;
    use crate::codec::UnsignedBits;
    use crate::error::ErrorKind;

    fn store<T: Codec>(count: usize, prototype: &T) -> FileStore<T> {
        FileStore::new(count, prototype.encoding(), &StorageOptions::default()).unwrap()
    }

    #[test]
    fn test_starts_zeroed_and_clean() {
        let s = store(1500, &0.0_f64);
        let mut out = 1.0;
        for i in [0, 511, 512, 1499] {
            s.get(i, &mut out).unwrap();
            assert_eq!(out, 0.0);
        }
        assert!(!s.is_dirty());
        assert_eq!(s.page_flushes(), 0);
    }

    #[test]
    fn test_page_boundary_flush_then_load() {
        let mut s = store(2048, &0i32);
        s.set(511, &77).unwrap();
        assert!(s.is_dirty());
        assert_eq!(s.current_page(), 0);
        let mut out = 0;
        s.get(512, &mut out).unwrap();
        assert_eq!(s.page_flushes(), 1);
        assert_eq!(s.page_loads(), 1);
        assert_eq!(s.current_page(), 1);
        assert!(!s.is_dirty());
        s.get(511, &mut out).unwrap();
        assert_eq!(out, 77);
        assert_eq!(s.page_flushes(), 1);
        assert_eq!(s.page_loads(), 2);
    }

    #[test]
    fn test_sequential_write_reverse_read() {
        let mut s = store(1024, &0i64);
        for i in 0..1024 {
            s.set(i, &(i as i64 * 3 - 7)).unwrap();
        }
        let mut out = 0;
        for i in (0..1024).rev() {
            s.get(i, &mut out).unwrap();
            assert_eq!(out, i as i64 * 3 - 7);
        }
    }

    #[test]
    fn test_clean_page_is_not_flushed() {
        let s = store(1024, &0u8);
        let mut out = 0;
        s.get(0, &mut out).unwrap();
        s.get(600, &mut out).unwrap();
        s.get(1, &mut out).unwrap();
        assert_eq!(s.page_flushes(), 0);
        assert_eq!(s.page_loads(), 2);
    }

    #[test]
    fn test_explicit_flush() {
        let mut s = store(10, &0.0_f32);
        s.set(3, &2.5).unwrap();
        s.flush().unwrap();
        assert!(!s.is_dirty());
        assert_eq!(s.page_flushes(), 1);
        s.flush().unwrap();
        assert_eq!(s.page_flushes(), 1);
    }

    #[test]
    fn test_multi_primitive_and_bit_records() {
        let mut s = store(1200, &Complex::new(0.0_f64, 0.0));
        s.set(5, &Complex::new(1.0, -1.0)).unwrap();
        s.set(1100, &Complex::new(2.0, 3.0)).unwrap();
        let mut out = Complex::default();
        s.get(5, &mut out).unwrap();
        assert_eq!(out, Complex::new(1.0, -1.0));

        let mut bits = store(2000, &UnsignedBits::<3>::default());
        for i in 0..2000 {
            bits.set(i, &UnsignedBits::new((i % 8) as u8)).unwrap();
        }
        let mut out = UnsignedBits::default();
        for i in (0..2000).step_by(97) {
            bits.get(i, &mut out).unwrap();
            assert_eq!(out.value(), (i % 8) as u8);
        }
    }

    #[test]
    fn test_bounds() {
        let mut s = store(600, &0i16);
        let mut out = 0;
        assert_eq!(s.get(600, &mut out).unwrap_err().kind(), ErrorKind::Bounds);
        assert_eq!(s.set(9999, &1).unwrap_err().kind(), ErrorKind::Bounds);
    }

    #[test]
    fn test_unpageable_encodings() {
        let err = FileStore::new(4, String::new().encoding(), &StorageOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert!(!FileStore::<String>::pageable(&String::new().encoding()));
        assert!(FileStore::<char>::pageable(&'a'.encoding()));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut s = store(1100, &0i32);
        s.set(10, &1).unwrap();
        s.set(700, &2).unwrap(); // flushes page 0
        s.set(701, &3).unwrap(); // page 1 dirty, unflushed
        let mut copy = s.duplicate().unwrap();
        assert!(copy.is_dirty());
        assert_eq!(copy.current_page(), 1);

        s.set(10, &-1).unwrap();
        s.set(701, &-3).unwrap();
        copy.set(1050, &4).unwrap();

        let mut out = 0;
        for (i, want) in [(10, 1), (700, 2), (701, 3), (1050, 4)] {
            copy.get(i, &mut out).unwrap();
            assert_eq!(out, want, "copy index {i}");
        }
        for (i, want) in [(10, -1), (700, 2), (701, -3), (1050, 0)] {
            s.get(i, &mut out).unwrap();
            assert_eq!(out, want, "original index {i}");
        }
    }

    #[test]
    fn test_temp_dir_is_honoured() {
        let dir = tempfile::TempDir::new().unwrap();
        let opts = StorageOptions::new().with_temp_dir(dir.path());
        let mut s = FileStore::new(5, 0u16.encoding(), &opts).unwrap();
        s.set(4, &9).unwrap();
        let fresh = s.allocate(3).unwrap();
        assert_eq!(fresh.size(), 3);
        let missing = dir.path().join("missing");
        let opts = StorageOptions::new().with_temp_dir(missing);
        let err = FileStore::new(5, 0u16.encoding(), &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_file_limit_checked_before_creation() {
        // 2^60 f64 elements would need 2^63 bytes, one past the largest seek
        let err = FileStore::new(1 << 60, 0.0_f64.encoding(), &StorageOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::CapacityExceeded { width: 8, .. }
        ));

        // one 4 KiB page fits, two do not
        let dir = tempfile::TempDir::new().unwrap();
        let opts = StorageOptions::new()
            .with_temp_dir(dir.path())
            .with_file_limit(4096);
        assert!(FileStore::new(512, 0.0_f64.encoding(), &opts).is_ok());
        let err = FileStore::new(513, 0.0_f64.encoding(), &opts).unwrap_err();
        assert!(matches!(
            err,
            StorageError::CapacityExceeded { limit: 4096, .. }
        ));

        // a missing directory shows the check runs before the file is opened
        let opts = StorageOptions::new()
            .with_temp_dir(dir.path().join("missing"))
            .with_file_limit(4096);
        let err = FileStore::new(513, 0.0_f64.encoding(), &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn test_concurrent_readers() {
        let mut s = store(4096, &0i32);
        for i in 0..4096 {
            s.set(i, &(i as i32)).unwrap();
        }
        let s = Arc::new(s);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    let mut out = 0;
                    for i in (t..4096).step_by(4) {
                        s.get(i, &mut out).unwrap();
                        assert_eq!(out, i as i32);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
