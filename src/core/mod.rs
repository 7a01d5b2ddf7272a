//! Core module: Mapped Region + Streaming Ring
//!
//! Prinsip desain:
//! - Persistent mapping: region di-map sekali, tidak pernah di-resize
//! - Lazy wait: producer hanya menunggu section yang akan dipakai ulang
//! - No-Allocation: tidak ada alokasi di hot path acquire/publish

mod mapped_region;
mod streaming_ring;

pub use mapped_region::{ConsumerView, MappedRegion, Section};
pub use streaming_ring::{RingStats, SectionState, SectionWriter, StreamingRing, WaitProgress};
