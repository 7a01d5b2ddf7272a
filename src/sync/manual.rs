//! Manual provider: setiap token di-complete secara eksplisit
//!
//! Berguna untuk consumer yang menyelesaikan section tidak berurutan,
//! dan untuk test deterministik (token yang tidak pernah selesai,
//! token yang selesai setelah delay, dll).

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{SyncProvider, TokenStatus, WaitStatus};
use crate::core::Section;

#[derive(Default)]
struct ManualState {
    next_id: u64,
    // id -> (section, complete)
    live: HashMap<u64, (usize, bool)>,
    auto_complete: bool,
    created: u64,
    destroyed: u64,
}

impl ManualState {
    #[inline]
    fn is_complete(&self, id: u64) -> bool {
        self.live.get(&id).map_or(true, |&(_, complete)| complete)
    }
}

struct Shared {
    state: Mutex<ManualState>,
    cond: Condvar,
}

/// Token unik per publish
#[derive(Debug)]
pub struct ManualToken {
    id: u64,
    section: usize,
}

impl ManualToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn section(&self) -> usize {
        self.section
    }
}

pub struct ManualProvider {
    shared: Arc<Shared>,
}

/// Handle untuk men-complete token dari luar ring
#[derive(Clone)]
pub struct ManualController {
    shared: Arc<Shared>,
}

impl ManualProvider {
    pub fn new() -> (Self, ManualController) {
        let shared = Arc::new(Shared {
            state: Mutex::new(ManualState::default()),
            cond: Condvar::new(),
        });

        (
            Self {
                shared: Arc::clone(&shared),
            },
            ManualController { shared },
        )
    }

    /// Provider yang setiap token-nya langsung complete
    pub fn auto_complete() -> (Self, ManualController) {
        let (provider, controller) = Self::new();
        controller.set_auto_complete(true);
        (provider, controller)
    }
}

impl SyncProvider for ManualProvider {
    type Token = ManualToken;

    fn create_token(&mut self, section: Section) -> ManualToken {
        let mut state = self.shared.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.created += 1;

        let complete = state.auto_complete;
        state.live.insert(id, (section.index, complete));

        ManualToken {
            id,
            section: section.index,
        }
    }

    fn poll(&self, token: &ManualToken) -> TokenStatus {
        if self.shared.state.lock().is_complete(token.id) {
            TokenStatus::Complete
        } else {
            TokenStatus::Pending
        }
    }

    fn wait(&self, token: &ManualToken, timeout: Option<Duration>) -> WaitStatus {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.shared.state.lock();

        while !state.is_complete(token.id) {
            match deadline {
                None => self.shared.cond.wait(&mut state),
                Some(deadline) => {
                    if self.shared.cond.wait_until(&mut state, deadline).timed_out() {
                        return if state.is_complete(token.id) {
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

    fn destroy(&mut self, token: ManualToken) {
        let mut state = self.shared.state.lock();
        state.live.remove(&token.id);
        state.destroyed += 1;
    }
}

impl ManualController {
    /// Complete token yang sedang hidup untuk `section`.
    /// Returns `false` jika tidak ada token pending untuk section itu.
    pub fn complete_section(&self, section: usize) -> bool {
        let mut state = self.shared.state.lock();
        let mut found = false;
        for (owner, complete) in state.live.values_mut() {
            if *owner == section && !*complete {
                *complete = true;
                found = true;
            }
        }
        if found {
            self.shared.cond.notify_all();
        }
        found
    }

    pub fn complete_all(&self) {
        let mut state = self.shared.state.lock();
        for (_, complete) in state.live.values_mut() {
            *complete = true;
        }
        self.shared.cond.notify_all();
    }

    /// Token baru langsung complete saat dibuat
    pub fn set_auto_complete(&self, enabled: bool) {
        self.shared.state.lock().auto_complete = enabled;
    }

    pub fn is_pending(&self, section: usize) -> bool {
        self.shared
            .state
            .lock()
            .live
            .values()
            .any(|&(owner, complete)| owner == section && !complete)
    }

    /// Token yang sudah dibuat dan belum di-destroy
    pub fn live_tokens(&self) -> usize {
        self.shared.state.lock().live.len()
    }

    /// Section dari setiap token hidup, terurut
    pub fn live_sections(&self) -> Vec<usize> {
        let state = self.shared.state.lock();
        let mut sections: Vec<usize> = state.live.values().map(|&(s, _)| s).collect();
        sections.sort_unstable();
        sections
    }

    pub fn created_count(&self) -> u64 {
        self.shared.state.lock().created
    }

    pub fn destroyed_count(&self) -> u64 {
        self.shared.state.lock().destroyed
    }
}
