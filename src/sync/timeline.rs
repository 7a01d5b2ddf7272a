//! In-order timeline provider
//!
//! Model fence pada GPU queue: consumer memproses section sesuai urutan
//! publish, dan setiap section yang selesai menaikkan counter `completed`.
//! Token adalah nilai target pada timeline; token complete jika
//! `completed >= target`.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{SyncProvider, TokenStatus, WaitStatus};
use crate::core::Section;

struct Timeline {
    submitted: AtomicU64,
    completed: AtomicU64,
    lock: Mutex<()>,
    cond: Condvar,
}

impl Timeline {
    #[inline(always)]
    fn reached(&self, value: u64) -> bool {
        self.completed.load(Ordering::Acquire) >= value
    }
}

/// Token = nilai target pada timeline
#[derive(Debug)]
pub struct TimelineToken {
    value: u64,
    section: usize,
}

impl TimelineToken {
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn section(&self) -> usize {
        self.section
    }
}

/// Sisi producer (dimiliki oleh ring)
pub struct TimelineProvider {
    timeline: Arc<Timeline>,
}

/// Sisi consumer: men-signal progress timeline
#[derive(Clone)]
pub struct TimelineSignal {
    timeline: Arc<Timeline>,
}

impl TimelineProvider {
    pub fn new() -> (Self, TimelineSignal) {
        let timeline = Arc::new(Timeline {
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            lock: Mutex::new(()),
            cond: Condvar::new(),
        });

        (
            Self {
                timeline: Arc::clone(&timeline),
            },
            TimelineSignal { timeline },
        )
    }
}

impl SyncProvider for TimelineProvider {
    type Token = TimelineToken;

    fn create_token(&mut self, section: Section) -> TimelineToken {
        let value = self.timeline.submitted.fetch_add(1, Ordering::AcqRel) + 1;
        TimelineToken {
            value,
            section: section.index,
        }
    }

    #[inline]
    fn poll(&self, token: &TimelineToken) -> TokenStatus {
        if self.timeline.reached(token.value) {
            TokenStatus::Complete
        } else {
            TokenStatus::Pending
        }
    }

    fn wait(&self, token: &TimelineToken, timeout: Option<Duration>) -> WaitStatus {
        if self.timeline.reached(token.value) {
            return WaitStatus::Complete;
        }

        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut guard = self.timeline.lock.lock();

        while !self.timeline.reached(token.value) {
            match deadline {
                None => self.timeline.cond.wait(&mut guard),
                Some(deadline) => {
                    if self.timeline.cond.wait_until(&mut guard, deadline).timed_out() {
                        return if self.timeline.reached(token.value) {
                            WaitStatus::Complete
                        } else {
                            WaitStatus::TimedOut
                        };
                    }
                }
            }
        }

        WaitStatus::Complete
    }

    fn destroy(&mut self, token: TimelineToken) {
        debug_assert!(
            self.timeline.reached(token.value),
            "destroying pending timeline token {}",
            token.value
        );
    }
}

impl TimelineSignal {
    /// Satu section selesai dibaca consumer (urutan publish)
    ///
    /// Returns nilai timeline yang baru.
    pub fn signal_next(&self) -> u64 {
        let _guard = self.timeline.lock.lock();
        let value = self.timeline.completed.fetch_add(1, Ordering::Release) + 1;
        debug_assert!(
            value <= self.timeline.submitted.load(Ordering::Acquire),
            "signalled past the last submitted token"
        );
        self.timeline.cond.notify_all();
        value
    }

    /// Lompat langsung ke `value` (tidak pernah mundur)
    pub fn signal(&self, value: u64) {
        let _guard = self.timeline.lock.lock();
        self.timeline.completed.fetch_max(value, Ordering::Release);
        self.timeline.cond.notify_all();
    }

    pub fn completed(&self) -> u64 {
        self.timeline.completed.load(Ordering::Acquire)
    }

    pub fn submitted(&self) -> u64 {
        self.timeline.submitted.load(Ordering::Acquire)
    }

    /// Jumlah token yang belum selesai
    pub fn pending(&self) -> u64 {
        self.submitted().saturating_sub(self.completed())
    }
}
