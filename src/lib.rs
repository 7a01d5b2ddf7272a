//! Tristream - Triple-Buffered Persistently-Mapped Streaming Ring
//!
//! Arsitektur:
//! - `core`: MappedRegion (N section disjoint) + StreamingRing (round-robin, token per section)
//! - `sync`: kontrak token dengan consumer timeline asynchronous
//! - `config`: parameter ring dan wait policy
//! - `error`: AllocationError dan RingError

pub mod config;
pub mod core;
pub mod error;
pub mod sync;

pub use crate::config::{Backing, RingConfig, WaitPolicy};
pub use crate::core::{MappedRegion, Section, SectionState, StreamingRing};
pub use crate::error::{AllocationError, RingError};
pub use crate::sync::SyncProvider;
