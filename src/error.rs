//! Error types untuk region allocation dan ring state machine
//!
//! Dua kelas error:
//! - `AllocationError`: fatal untuk instance ring, tidak bisa di-retry tanpa ganti parameter
//! - `RingError`: timeout (recoverable) atau pelanggaran kontrak (bug di caller)

use std::io;
use std::time::Duration;

use crate::core::SectionState;

/// Region tidak bisa dibuat dengan parameter yang diminta
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// Ring butuh minimal satu section "write" dan satu section "read"
    #[error("a streaming ring needs at least 2 sections, got {count}")]
    TooFewSections { count: usize },

    #[error("section size must be non-zero")]
    EmptySection,

    #[error("region size overflows: {section_count} sections of {section_size} bytes")]
    Overflow {
        section_size: usize,
        section_count: usize,
    },

    /// Melebihi batas `max_region_bytes` dari config
    #[error("region of {requested} bytes exceeds the configured limit of {limit} bytes")]
    ExceedsLimit { requested: usize, limit: usize },

    #[error("failed to map region: {0}")]
    Map(#[source] io::Error),

    #[error("failed to lock region into memory: {0}")]
    Lock(#[source] io::Error),
}

/// Error dari operasi `StreamingRing`
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Token section masih pending setelah deadline habis.
    /// Section tetap `Consuming`, caller boleh retry.
    #[error("timed out after {waited:?} waiting for the consumer to release section {section}")]
    Timeout { section: usize, waited: Duration },

    /// Transisi state yang tidak valid (bug di caller)
    #[error("cannot {op} section {section} while it is {state}")]
    InvalidTransition {
        op: &'static str,
        section: usize,
        state: SectionState,
    },

    #[error("section index {index} out of range (ring has {count} sections)")]
    OutOfRange { index: usize, count: usize },
}

impl RingError {
    /// Hanya timeout yang boleh di-retry
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    #[inline]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. } | Self::OutOfRange { .. }
        )
    }

    /// Kategori error untuk logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Allocation(_) => "allocation",
            Self::Timeout { .. } => "timeout",
            Self::InvalidTransition { .. } | Self::OutOfRange { .. } => "contract",
        }
    }
}
