//! Persistently-Mapped Region dengan N section berukuran sama
//!
//! Region di-map sekali saat ring dibuat dan tidak pernah di-resize
//! atau dipindah selama dipakai:
//! - Producer menulis lewat `view_mut` (satu section per acquire)
//! - Consumer membaca lewat `ConsumerView` (capability yang diberikan sekali)
//! - Unmap hanya terjadi saat `MappedRegion` di-drop atau `release`

use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::io;
use std::ops::Range;
use std::sync::atomic::{fence, Ordering};
use std::sync::{Arc, Weak};

use crate::config::{Backing, RingConfig, DEFAULT_MAX_REGION_BYTES};
use crate::error::AllocationError;

/// View logis non-owning ke satu section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Section {
    pub index: usize,
    pub offset: usize,
    pub len: usize,
}

impl Section {
    #[inline(always)]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    #[inline]
    pub fn overlaps(&self, other: &Section) -> bool {
        self.offset < other.offset + other.len && other.offset < self.offset + self.len
    }
}

/// Mapping mentah. Base pointer di-cache saat init supaya
/// producer dan consumer bisa akses tanpa `&mut MmapMut`.
struct Mapping {
    map: MmapMut,
    base: *mut u8,
    len: usize,
    file_backed: bool,
}

// SAFETY: Mapping aman untuk Send/Sync karena:
// - Base pointer valid selama `map` hidup (dijaga oleh Arc)
// - Producer dan consumer hanya menyentuh section yang disjoint,
//   diatur oleh token discipline di StreamingRing
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

/// Region memory yang bisa ditulis producer dan dibaca consumer sekaligus
pub struct MappedRegion {
    mapping: Arc<Mapping>,
    section_size: usize,
    section_count: usize,
    coherent: bool,
}

impl MappedRegion {
    /// Alokasi anonymous region dengan limit default
    pub fn allocate(
        section_size: usize,
        section_count: usize,
        coherent: bool,
    ) -> Result<Self, AllocationError> {
        let config = RingConfig::new(section_size, section_count)
            .coherent(coherent)
            .max_region_bytes(DEFAULT_MAX_REGION_BYTES);
        Self::allocate_with(&config)
    }

    /// Alokasi region sesuai config
    ///
    /// Validasi dilakukan sebelum mapping, jadi parameter yang salah
    /// tidak pernah membuat region.
    pub fn allocate_with(config: &RingConfig) -> Result<Self, AllocationError> {
        if config.section_count < 2 {
            return Err(AllocationError::TooFewSections {
                count: config.section_count,
            });
        }
        if config.section_size == 0 {
            return Err(AllocationError::EmptySection);
        }

        let total_size = config.region_size().ok_or(AllocationError::Overflow {
            section_size: config.section_size,
            section_count: config.section_count,
        })?;

        if total_size > config.max_region_bytes {
            return Err(AllocationError::ExceedsLimit {
                requested: total_size,
                limit: config.max_region_bytes,
            });
        }

        let (mut map, file_backed) = match &config.backing {
            Backing::Anonymous => {
                let map = MmapOptions::new()
                    .len(total_size)
                    .map_anon()
                    .map_err(AllocationError::Map)?;
                (map, false)
            }
            Backing::File(path) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)
                    .map_err(AllocationError::Map)?;

                file.set_len(total_size as u64)
                    .map_err(AllocationError::Map)?;

                // SAFETY: File dibuka read/write dan ukurannya sudah di-set
                let map = unsafe { MmapOptions::new().len(total_size).map_mut(&file) }
                    .map_err(AllocationError::Map)?;
                (map, true)
            }
        };

        let base = map.as_mut_ptr();

        if config.lock_memory {
            lock_pages(base, total_size).map_err(AllocationError::Lock)?;
        }

        log::info!(
            "mapped region: {} sections x {} bytes ({} KB, coherent={}, file_backed={})",
            config.section_count,
            config.section_size,
            total_size / 1024,
            config.coherent,
            file_backed
        );

        Ok(Self {
            mapping: Arc::new(Mapping {
                map,
                base,
                len: total_size,
                file_backed,
            }),
            section_size: config.section_size,
            section_count: config.section_count,
            coherent: config.coherent,
        })
    }

    #[inline(always)]
    pub fn section_size(&self) -> usize {
        self.section_size
    }

    #[inline(always)]
    pub fn section_count(&self) -> usize {
        self.section_count
    }

    #[inline(always)]
    pub fn total_size(&self) -> usize {
        self.mapping.len
    }

    #[inline(always)]
    pub fn is_coherent(&self) -> bool {
        self.coherent
    }

    /// Section ke-`index`, atau `None` jika di luar range
    #[inline]
    pub fn section(&self, index: usize) -> Option<Section> {
        (index < self.section_count).then(|| Section {
            index,
            offset: index * self.section_size,
            len: self.section_size,
        })
    }

    /// Byte range yang bisa ditulis untuk section `index`
    ///
    /// Bounds dicek sekali di sini, bukan per byte.
    #[inline]
    pub fn view_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let section = self.section(index)?;
        // SAFETY: Section berada di dalam mapping (dicek oleh `section`),
        // dan `&mut self` menjamin hanya satu writer
        unsafe {
            let ptr = self.mapping.base.add(section.offset);
            Some(std::slice::from_raw_parts_mut(ptr, section.len))
        }
    }

    /// Visibility barrier untuk region non-coherent
    ///
    /// Harus dipanggil setelah write selesai dan sebelum token dibuat.
    pub fn flush(&self, section: Section) -> io::Result<()> {
        fence(Ordering::Release);
        if self.mapping.file_backed {
            self.mapping.map.flush_range(section.offset, section.len)?;
        }
        Ok(())
    }

    /// Capability read-only untuk consumer
    pub fn consumer_view(&self) -> ConsumerView {
        ConsumerView {
            mapping: Arc::downgrade(&self.mapping),
            section_size: self.section_size,
            section_count: self.section_count,
        }
    }

    /// Unmap region. Semua `ConsumerView` menjadi invalid.
    pub fn release(self) {
        log::info!("releasing mapped region ({} KB)", self.mapping.len / 1024);
        drop(self);
    }

    /// Mapping tidak akan pernah di-unmap.
    /// Dipakai saat consumer mungkin masih membaca region.
    pub(crate) fn leak(&self) {
        std::mem::forget(Arc::clone(&self.mapping));
    }
}

/// Akses read-only ke region dari sisi consumer
///
/// Memegang weak reference: setelah region di-release, semua read
/// mengembalikan `None`.
#[derive(Clone)]
pub struct ConsumerView {
    mapping: Weak<Mapping>,
    section_size: usize,
    section_count: usize,
}

impl ConsumerView {
    /// Baca isi section yang sedang di-publish
    ///
    /// Mapping dijaga tetap hidup selama `f` berjalan.
    ///
    /// # Safety
    /// Caller hanya boleh membaca section yang sudah di-publish dan
    /// token-nya belum di-signal oleh consumer ini. Membaca section lain
    /// bisa race dengan write dari producer.
    pub unsafe fn with_section<R>(
        &self,
        section: Section,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Option<R> {
        if section.index >= self.section_count
            || section.len != self.section_size
            || section.offset != section.index * self.section_size
        {
            return None;
        }

        let mapping = self.mapping.upgrade()?;
        fence(Ordering::Acquire);

        let bytes = std::slice::from_raw_parts(mapping.base.add(section.offset), section.len);
        Some(f(bytes))
    }

    pub fn is_released(&self) -> bool {
        self.mapping.strong_count() == 0
    }
}

#[cfg(unix)]
fn lock_pages(base: *mut u8, len: usize) -> io::Result<()> {
    // SAFETY: base..base+len adalah mapping yang valid
    let rc = unsafe { libc::mlock(base as *const libc::c_void, len) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
fn lock_pages(_base: *mut u8, _len: usize) -> io::Result<()> {
    log::warn!("memory locking is not supported on this platform, ignoring");
    Ok(())
}
