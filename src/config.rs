//! Ring configuration
//!
//! Semua parameter ditentukan sekali saat inisialisasi.
//! Tidak ada global state: setiap `StreamingRing` membawa config-nya sendiri.

use std::path::PathBuf;
use std::time::Duration;

/// Default section: 1024x1024 RGBA8
pub const DEFAULT_SECTION_SIZE: usize = 4 * 1024 * 1024;
/// Triple buffering
pub const DEFAULT_SECTION_COUNT: usize = 3;
/// 1 GiB
pub const DEFAULT_MAX_REGION_BYTES: usize = 1024 * 1024 * 1024;

/// Sumber memory untuk region
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Backing {
    /// Private anonymous mapping (consumer di proses yang sama)
    #[default]
    Anonymous,
    /// Shared file mapping, consumer di proses lain bisa map file yang sama
    File(PathBuf),
}

/// Cara producer menunggu token section yang akan dipakai ulang
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Bounded wait dengan quantum tetap per iterasi.
    /// `quantum = 0` adalah tight poll loop.
    Spin { quantum: Duration },
    /// Quantum mulai dari `initial`, dikali dua setiap iterasi sampai `max`
    Backoff { initial: Duration, max: Duration },
    /// Satu wait native dari provider (unbounded kecuali ada deadline)
    Blocking,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::Backoff {
            initial: Duration::from_micros(10),
            max: Duration::from_millis(1),
        }
    }
}

impl WaitPolicy {
    /// Quantum untuk iterasi pertama. `None` berarti unbounded.
    #[inline]
    pub fn initial_quantum(&self) -> Option<Duration> {
        match *self {
            Self::Spin { quantum } => Some(quantum),
            Self::Backoff { initial, max } => Some(initial.min(max)),
            Self::Blocking => None,
        }
    }

    /// Quantum untuk iterasi berikutnya
    #[inline]
    pub fn next_quantum(&self, current: Option<Duration>) -> Option<Duration> {
        match *self {
            Self::Spin { quantum } => Some(quantum),
            Self::Backoff { initial, max } => {
                let current = current.unwrap_or(initial);
                // Quantum nol tidak pernah tumbuh, mulai dari 1µs
                let grown = if current.is_zero() {
                    Duration::from_micros(1)
                } else {
                    current.saturating_mul(2)
                };
                Some(grown.min(max))
            }
            Self::Blocking => None,
        }
    }
}

/// Konfigurasi `StreamingRing`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    pub section_size: usize,
    pub section_count: usize,
    /// Jika `false`, ring mengeluarkan visibility barrier sebelum token dibuat
    pub coherent: bool,
    pub backing: Backing,
    /// `mlock` region supaya write di frame loop tidak page-fault (unix only)
    pub lock_memory: bool,
    pub max_region_bytes: usize,
    pub wait_policy: WaitPolicy,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            section_size: DEFAULT_SECTION_SIZE,
            section_count: DEFAULT_SECTION_COUNT,
            coherent: true,
            backing: Backing::Anonymous,
            lock_memory: false,
            max_region_bytes: DEFAULT_MAX_REGION_BYTES,
            wait_policy: WaitPolicy::default(),
        }
    }
}

impl RingConfig {
    pub fn new(section_size: usize, section_count: usize) -> Self {
        Self {
            section_size,
            section_count,
            ..Self::default()
        }
    }

    /// Konfigurasi kanonik: 3 section
    pub fn triple(section_size: usize) -> Self {
        Self::new(section_size, DEFAULT_SECTION_COUNT)
    }

    pub fn coherent(mut self, coherent: bool) -> Self {
        self.coherent = coherent;
        self
    }

    pub fn backing(mut self, backing: Backing) -> Self {
        self.backing = backing;
        self
    }

    pub fn lock_memory(mut self, lock: bool) -> Self {
        self.lock_memory = lock;
        self
    }

    pub fn max_region_bytes(mut self, limit: usize) -> Self {
        self.max_region_bytes = limit;
        self
    }

    pub fn wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Total bytes region, `None` jika overflow
    #[inline]
    pub fn region_size(&self) -> Option<usize> {
        self.section_size.checked_mul(self.section_count)
    }
}
