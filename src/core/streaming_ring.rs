//! Triple-Buffered Streaming Ring
//!
//! Producer (thread caller) mengisi section secara round-robin,
//! consumer asynchronous (GPU) membaca section yang sudah di-publish.
//!
//! State per section:
//! - `Idle`: tidak ada token, atau token sudah terkonfirmasi complete
//! - `Producing`: sedang ditulis producer
//! - `Consuming`: sudah di-publish, token masih outstanding
//!
//! Wait hanya terjadi secara lazy di `acquire_next`, dan hanya untuk
//! section yang akan dipakai ulang. Dengan N=3, token biasanya sudah
//! complete karena consumer punya slack dua frame.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use super::mapped_region::{ConsumerView, MappedRegion, Section};
use crate::config::{RingConfig, WaitPolicy};
use crate::error::RingError;
use crate::sync::{SyncProvider, TokenStatus, WaitStatus};

/// State sebuah section dari sudut pandang producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Idle,
    Producing,
    Consuming,
}

impl fmt::Display for SectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Producing => "producing",
            Self::Consuming => "consuming",
        };
        f.write_str(name)
    }
}

/// Satu slot per section. Token tidak pernah dipindah antar slot.
struct Slot<T> {
    state: SectionState,
    token: Option<T>,
}

/// Counter untuk telemetry frame loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    pub acquires: u64,
    pub publishes: u64,
    pub abandons: u64,
    /// Acquire yang harus menunggu token
    pub stalls: u64,
    /// Jumlah poll/wait yang tidak berhasil
    pub wait_iterations: u64,
    pub timeouts: u64,
    pub total_wait: Duration,
}

/// Info yang diberikan ke callback di antara poll
#[derive(Debug, Clone, Copy)]
pub struct WaitProgress {
    pub section: usize,
    pub iteration: u64,
    pub elapsed: Duration,
}

/// Section yang sedang ditulis producer
///
/// Deref ke `[u8]` milik section tersebut.
pub struct SectionWriter<'a> {
    section: Section,
    bytes: &'a mut [u8],
}

impl SectionWriter<'_> {
    #[inline(always)]
    pub fn section(&self) -> Section {
        self.section
    }

    #[inline(always)]
    pub fn index(&self) -> usize {
        self.section.index
    }
}

impl Deref for SectionWriter<'_> {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl DerefMut for SectionWriter<'_> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

/// Ring N section di atas satu `MappedRegion`
///
/// Tidak ada global state. Satu ring = satu region + satu provider,
/// dipakai oleh satu producer context pada satu waktu.
pub struct StreamingRing<P: SyncProvider> {
    region: MappedRegion,
    provider: P,
    slots: Box<[Slot<P::Token>]>,
    current: usize,
    last_published: Option<Section>,
    wait_policy: WaitPolicy,
    stats: RingStats,
}

impl<P: SyncProvider> StreamingRing<P> {
    /// Alokasi region dan siapkan N slot kosong
    pub fn new(config: RingConfig, provider: P) -> Result<Self, RingError> {
        let region = MappedRegion::allocate_with(&config)?;
        Ok(Self::with_region(region, provider, config.wait_policy))
    }

    /// Bangun ring di atas region yang sudah dialokasikan
    pub fn with_region(region: MappedRegion, provider: P, wait_policy: WaitPolicy) -> Self {
        let slots = (0..region.section_count())
            .map(|_| Slot {
                state: SectionState::Idle,
                token: None,
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            region,
            provider,
            slots,
            current: 0,
            last_published: None,
            wait_policy,
            stats: RingStats::default(),
        }
    }

    #[inline(always)]
    pub fn section_count(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn state(&self, index: usize) -> Option<SectionState> {
        self.slots.get(index).map(|slot| slot.state)
    }

    #[inline]
    pub fn section(&self, index: usize) -> Option<Section> {
        self.region.section(index)
    }

    /// Section terakhir yang di-publish: offset dan length untuk
    /// command consumer (copy/draw)
    #[inline]
    pub fn last_published(&self) -> Option<Section> {
        self.last_published
    }

    pub fn consumer_view(&self) -> ConsumerView {
        self.region.consumer_view()
    }

    pub fn region(&self) -> &MappedRegion {
        &self.region
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Jumlah token yang belum di-destroy
    pub fn outstanding_tokens(&self) -> usize {
        self.slots.iter().filter(|slot| slot.token.is_some()).count()
    }

    #[inline]
    pub fn stats(&self) -> RingStats {
        self.stats
    }

    /// Ambil section berikutnya, tunggu tanpa batas waktu jika perlu
    pub fn acquire_next(&mut self) -> Result<SectionWriter<'_>, RingError> {
        self.acquire_next_with(None, |_| {})
    }

    /// Ambil section berikutnya dengan batas waktu.
    ///
    /// Timeout tidak mengubah state: section tetap `Consuming` dan
    /// caller boleh retry atau skip frame.
    pub fn try_acquire_next(&mut self, timeout: Duration) -> Result<SectionWriter<'_>, RingError> {
        self.acquire_next_with(Some(timeout), |_| {})
    }

    /// Bentuk umum acquire
    ///
    /// `between_polls` dipanggil setiap kali satu quantum wait habis
    /// tanpa hasil, supaya caller bisa mengerjakan bookkeeping lain.
    pub fn acquire_next_with<F>(
        &mut self,
        deadline: Option<Duration>,
        between_polls: F,
    ) -> Result<SectionWriter<'_>, RingError>
    where
        F: FnMut(&WaitProgress),
    {
        if let Some(producing) = self
            .slots
            .iter()
            .position(|slot| slot.state == SectionState::Producing)
        {
            return Err(RingError::InvalidTransition {
                op: "acquire",
                section: producing,
                state: SectionState::Producing,
            });
        }

        let index = self.current;
        let count = self.slots.len();
        let section = self
            .region
            .section(index)
            .ok_or(RingError::OutOfRange { index, count })?;

        if self.slots[index].token.is_some() {
            self.wait_for_slot(index, deadline, between_polls)?;
        }

        let slot = &mut self.slots[index];
        if let Some(token) = slot.token.take() {
            self.provider.destroy(token);
        }
        slot.state = SectionState::Producing;
        self.stats.acquires += 1;

        let bytes = self
            .region
            .view_mut(index)
            .ok_or(RingError::OutOfRange { index, count })?;

        Ok(SectionWriter { section, bytes })
    }

    /// Satu-satunya suspension point di ring
    fn wait_for_slot<F>(
        &mut self,
        index: usize,
        deadline: Option<Duration>,
        mut between_polls: F,
    ) -> Result<(), RingError>
    where
        F: FnMut(&WaitProgress),
    {
        let Some(token) = self.slots[index].token.as_ref() else {
            return Ok(());
        };

        // Fast path: consumer sudah selesai
        if self.provider.poll(token) == TokenStatus::Complete {
            self.slots[index].state = SectionState::Idle;
            return Ok(());
        }

        self.stats.stalls += 1;
        log::debug!("section {} still in use by consumer, waiting", index);

        let start = Instant::now();
        let mut quantum = self.wait_policy.initial_quantum();
        let mut iteration = 0u64;

        loop {
            let elapsed = start.elapsed();
            let remaining = deadline.map(|d| d.saturating_sub(elapsed));

            let wait_for = match (quantum, remaining) {
                (Some(q), Some(r)) => Some(q.min(r)),
                (Some(q), None) => Some(q),
                (None, r) => r,
            };

            if self.provider.wait(token, wait_for) == WaitStatus::Complete {
                break;
            }

            iteration += 1;
            self.stats.wait_iterations += 1;

            let elapsed = start.elapsed();
            between_polls(&WaitProgress {
                section: index,
                iteration,
                elapsed,
            });

            if let Some(deadline) = deadline {
                if elapsed >= deadline {
                    // Token bisa selesai selama between_polls
                    if self.provider.poll(token) == TokenStatus::Complete {
                        break;
                    }
                    self.stats.timeouts += 1;
                    self.stats.total_wait += elapsed;
                    log::warn!(
                        "timed out after {:?} waiting for section {}",
                        elapsed,
                        index
                    );
                    return Err(RingError::Timeout {
                        section: index,
                        waited: elapsed,
                    });
                }
            }

            quantum = self.wait_policy.next_quantum(quantum);
        }

        let waited = start.elapsed();
        self.stats.total_wait += waited;
        self.slots[index].state = SectionState::Idle;
        log::debug!("section {} released after {:?}", index, waited);

        Ok(())
    }

    /// Producer selesai menulis section `index`
    ///
    /// Urutan: visibility barrier (non-coherent) -> token -> advance.
    pub fn publish(&mut self, index: usize) -> Result<Section, RingError> {
        let section = self.check_producing("publish", index)?;

        if !self.region.is_coherent() {
            if let Err(e) = self.region.flush(section) {
                // msync gagal bukan alasan untuk menahan section:
                // fence sudah dikeluarkan untuk consumer in-process
                log::warn!("flush of section {} failed: {}", index, e);
            }
        }

        let token = self.provider.create_token(section);
        let slot = &mut self.slots[index];
        debug_assert!(slot.token.is_none(), "slot {} already holds a token", index);
        slot.token = Some(token);
        slot.state = SectionState::Consuming;

        self.current = (index + 1) % self.slots.len();
        self.last_published = Some(section);
        self.stats.publishes += 1;

        log::trace!("published section {} ({:?})", index, section.range());

        Ok(section)
    }

    /// Batalkan section yang sudah di-acquire tanpa publish
    ///
    /// `Producing(i) -> Idle(i)`. Index tidak maju, jadi acquire
    /// berikutnya mengembalikan section yang sama.
    pub fn abandon(&mut self, index: usize) -> Result<(), RingError> {
        self.check_producing("abandon", index)?;

        self.slots[index].state = SectionState::Idle;
        self.stats.abandons += 1;
        log::warn!("section {} abandoned before publish", index);

        Ok(())
    }

    fn check_producing(&self, op: &'static str, index: usize) -> Result<Section, RingError> {
        let count = self.slots.len();
        let slot = self
            .slots
            .get(index)
            .ok_or(RingError::OutOfRange { index, count })?;

        if slot.state != SectionState::Producing {
            return Err(RingError::InvalidTransition {
                op,
                section: index,
                state: slot.state,
            });
        }

        self.region
            .section(index)
            .ok_or(RingError::OutOfRange { index, count })
    }

    /// Tunggu semua token outstanding lalu destroy.
    /// Ring tetap bisa dipakai setelahnya.
    pub fn drain(&mut self, timeout: Option<Duration>) -> Result<(), RingError> {
        let start = Instant::now();

        for index in 0..self.slots.len() {
            let Some(token) = self.slots[index].token.as_ref() else {
                continue;
            };

            let remaining = timeout.map(|t| t.saturating_sub(start.elapsed()));
            if self.provider.wait(token, remaining) == WaitStatus::TimedOut {
                let waited = start.elapsed();
                self.stats.timeouts += 1;
                log::warn!(
                    "drain timed out after {:?} waiting for section {}",
                    waited,
                    index
                );
                return Err(RingError::Timeout {
                    section: index,
                    waited,
                });
            }

            if let Some(token) = self.slots[index].token.take() {
                self.provider.destroy(token);
            }
            if self.slots[index].state == SectionState::Consuming {
                self.slots[index].state = SectionState::Idle;
            }
        }

        Ok(())
    }

    /// Drain lalu unmap region
    ///
    /// Jika drain gagal, ring di-drop dengan token outstanding dan
    /// mapping tidak pernah di-unmap.
    pub fn shutdown(mut self, timeout: Option<Duration>) -> Result<RingStats, RingError> {
        self.drain(timeout)?;
        log::info!(
            "ring shut down: {} publishes, {} stalls, {:?} total wait",
            self.stats.publishes,
            self.stats.stalls,
            self.stats.total_wait
        );
        Ok(self.stats)
    }
}

impl<P: SyncProvider> Drop for StreamingRing<P> {
    fn drop(&mut self) {
        let outstanding = self.outstanding_tokens();
        if outstanding == 0 {
            return;
        }

        // Consumer mungkin masih membaca: jangan unmap, jangan destroy
        log::error!(
            "streaming ring dropped with {} outstanding tokens, leaking mapped region",
            outstanding
        );
        self.region.leak();
        for slot in self.slots.iter_mut() {
            if let Some(token) = slot.token.take() {
                std::mem::forget(token);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ManualController, ManualProvider};
    use std::thread;

    fn manual_ring(
        section_size: usize,
        count: usize,
    ) -> (StreamingRing<ManualProvider>, ManualController) {
        let (provider, controller) = ManualProvider::new();
        let config = RingConfig::new(section_size, count).wait_policy(WaitPolicy::Spin {
            quantum: Duration::from_millis(1),
        });
        (StreamingRing::new(config, provider).unwrap(), controller)
    }

    fn cycle(ring: &mut StreamingRing<ManualProvider>) -> Section {
        let index = ring.acquire_next().unwrap().index();
        ring.publish(index).unwrap()
    }

    #[test]
    fn test_triple_buffer_scenario() {
        let (mut ring, controller) = manual_ring(1024, 3);

        let w = ring.acquire_next().unwrap();
        assert_eq!(w.section().range(), 0..1024);
        assert_eq!(w.len(), 1024);
        ring.publish(0).unwrap();

        let w = ring.acquire_next().unwrap();
        assert_eq!(w.section().range(), 1024..2048);
        ring.publish(1).unwrap();

        let w = ring.acquire_next().unwrap();
        assert_eq!(w.section().range(), 2048..3072);
        ring.publish(2).unwrap();

        assert_eq!(ring.stats().stalls, 0);
        assert_eq!(ring.stats().wait_iterations, 0);

        // Section 0 masih dipegang consumer
        let handle = {
            let controller = controller.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                controller.complete_section(0);
            })
        };

        let start = Instant::now();
        let w = ring.acquire_next().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(w.section().range(), 0..1024);
        handle.join().unwrap();

        assert_eq!(ring.stats().stalls, 1);
        assert!(ring.stats().wait_iterations > 0);
    }

    #[test]
    fn test_round_robin_order() {
        let (provider, _controller) = ManualProvider::auto_complete();
        let mut ring = StreamingRing::new(RingConfig::new(64, 4), provider).unwrap();

        let indices: Vec<usize> = (0..10).map(|_| cycle(&mut ring).index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1]);
    }

    #[test]
    fn test_round_robin_survives_timeouts() {
        let (mut ring, controller) = manual_ring(64, 3);
        for _ in 0..3 {
            cycle(&mut ring);
        }

        for _ in 0..2 {
            let err = ring.try_acquire_next(Duration::from_millis(5)).err().unwrap();
            assert!(matches!(err, RingError::Timeout { section: 0, .. }));
        }

        controller.complete_all();
        let indices: Vec<usize> = (0..5)
            .map(|_| {
                let section = cycle(&mut ring);
                controller.complete_all();
                section.index
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_no_wait_fast_path() {
        let (provider, _controller) = ManualProvider::auto_complete();
        let mut ring = StreamingRing::new(RingConfig::new(256, 3), provider).unwrap();

        for _ in 0..100 {
            cycle(&mut ring);
        }

        let stats = ring.stats();
        assert_eq!(stats.acquires, 100);
        assert_eq!(stats.publishes, 100);
        assert_eq!(stats.stalls, 0);
        assert_eq!(stats.wait_iterations, 0);
        assert_eq!(stats.total_wait, Duration::ZERO);
    }

    #[test]
    fn test_timeout_is_deterministic() {
        let (mut ring, _controller) = manual_ring(64, 2);
        cycle(&mut ring);
        cycle(&mut ring);

        for attempt in 1..=2 {
            let start = Instant::now();
            let err = ring.try_acquire_next(Duration::from_millis(10)).err().unwrap();
            assert!(start.elapsed() >= Duration::from_millis(10));
            assert!(err.is_recoverable());
            assert!(matches!(err, RingError::Timeout { section: 0, .. }));

            assert_eq!(ring.state(0), Some(SectionState::Consuming));
            assert_eq!(ring.current_index(), 0);
            assert_eq!(ring.stats().timeouts, attempt);
        }
    }

    #[test]
    fn test_token_isolation() {
        let (mut ring, controller) = manual_ring(64, 3);
        for _ in 0..3 {
            cycle(&mut ring);
        }

        // Section 1 dan 2 selesai, section 0 tidak
        controller.complete_section(1);
        controller.complete_section(2);

        let err = ring.try_acquire_next(Duration::from_millis(10)).err().unwrap();
        assert!(matches!(err, RingError::Timeout { section: 0, .. }));
        assert_eq!(ring.state(0), Some(SectionState::Consuming));

        controller.complete_section(0);
        assert_eq!(ring.acquire_next().unwrap().index(), 0);
    }

    #[test]
    fn test_token_isolation_while_waiting() {
        let (mut ring, controller) = manual_ring(64, 3);
        for _ in 0..3 {
            cycle(&mut ring);
        }

        let handle = {
            let controller = controller.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                controller.complete_section(2);
                thread::sleep(Duration::from_millis(10));
                controller.complete_section(1);
                thread::sleep(Duration::from_millis(20));
                controller.complete_section(0);
            })
        };

        let start = Instant::now();
        let index = ring.acquire_next().unwrap().index();
        assert_eq!(index, 0);
        assert!(start.elapsed() >= Duration::from_millis(40));
        handle.join().unwrap();
    }

    #[test]
    fn test_no_overlap_with_outstanding_tokens() {
        let (mut ring, controller) = manual_ring(128, 3);

        for frame in 0..30 {
            let acquired = ring.acquire_next().unwrap().section();

            for index in 0..ring.section_count() {
                if index != acquired.index && controller.is_pending(index) {
                    let exposed = ring.section(index).unwrap();
                    assert!(!acquired.overlaps(&exposed), "frame {}", frame);
                }
            }
            assert!(!controller.is_pending(acquired.index));

            ring.publish(acquired.index).unwrap();
            // Consumer tertinggal satu frame
            let lagging = (acquired.index + ring.section_count() - 1) % ring.section_count();
            controller.complete_section(lagging);
        }
    }

    #[test]
    fn test_one_live_token_per_section() {
        let (provider, controller) = ManualProvider::auto_complete();
        let mut ring = StreamingRing::new(RingConfig::new(64, 3), provider).unwrap();

        for _ in 0..9 {
            cycle(&mut ring);
            let live = controller.live_sections();
            let mut dedup = live.clone();
            dedup.dedup();
            assert_eq!(live, dedup);
        }

        assert_eq!(controller.live_tokens(), 3);
        assert_eq!(controller.created_count(), 9);
        assert_eq!(controller.destroyed_count(), 6);
    }

    #[test]
    fn test_double_acquire_is_rejected() {
        let (mut ring, _controller) = manual_ring(64, 3);
        ring.acquire_next().unwrap();

        let err = ring.acquire_next().err().unwrap();
        assert!(err.is_contract_violation());
        assert!(matches!(
            err,
            RingError::InvalidTransition {
                op: "acquire",
                section: 0,
                state: SectionState::Producing
            }
        ));
        assert_eq!(ring.state(0), Some(SectionState::Producing));
    }

    #[test]
    fn test_publish_requires_producing() {
        let (mut ring, _controller) = manual_ring(64, 3);

        let err = ring.publish(0).err().unwrap();
        assert!(matches!(
            err,
            RingError::InvalidTransition {
                state: SectionState::Idle,
                ..
            }
        ));

        cycle(&mut ring);
        let err = ring.publish(0).err().unwrap();
        assert!(matches!(
            err,
            RingError::InvalidTransition {
                state: SectionState::Consuming,
                ..
            }
        ));

        let err = ring.publish(9).err().unwrap();
        assert!(matches!(err, RingError::OutOfRange { index: 9, count: 3 }));
        assert_eq!(ring.current_index(), 1);
    }

    #[test]
    fn test_publish_other_section_is_rejected() {
        let (mut ring, _controller) = manual_ring(64, 3);
        ring.acquire_next().unwrap();

        assert!(ring.publish(1).err().unwrap().is_contract_violation());
        assert_eq!(ring.state(0), Some(SectionState::Producing));
        assert!(ring.publish(0).is_ok());
    }

    #[test]
    fn test_abandon_returns_to_idle() {
        let (mut ring, controller) = manual_ring(64, 3);
        cycle(&mut ring);

        let index = ring.acquire_next().unwrap().index();
        assert_eq!(index, 1);
        ring.abandon(index).unwrap();

        assert_eq!(ring.state(1), Some(SectionState::Idle));
        assert_eq!(ring.current_index(), 1);
        assert_eq!(controller.created_count(), 1);

        // Acquire berikutnya mendapat section yang sama
        assert_eq!(ring.acquire_next().unwrap().index(), 1);
        assert!(ring.abandon(2).err().unwrap().is_contract_violation());
        assert_eq!(ring.stats().abandons, 1);
    }

    #[test]
    fn test_between_polls_callback() {
        let (mut ring, controller) = manual_ring(64, 2);
        cycle(&mut ring);
        cycle(&mut ring);

        let mut ticks = Vec::new();
        let result = ring.acquire_next_with(Some(Duration::from_millis(20)), |progress| {
            ticks.push(progress.iteration);
            if progress.iteration == 3 {
                controller.complete_section(0);
            }
        });

        assert_eq!(result.unwrap().index(), 0);
        assert_eq!(ticks, vec![1, 2, 3]);
    }

    #[test]
    fn test_completion_during_last_poll_is_not_a_timeout() {
        let (provider, controller) = ManualProvider::new();
        let config = RingConfig::new(64, 2).wait_policy(WaitPolicy::Spin {
            quantum: Duration::from_millis(5),
        });
        let mut ring = StreamingRing::new(config, provider).unwrap();
        cycle(&mut ring);
        cycle(&mut ring);

        // Quantum pertama sudah menghabiskan deadline
        let result = ring.acquire_next_with(Some(Duration::from_millis(5)), |_| {
            controller.complete_section(0);
        });

        assert_eq!(result.unwrap().index(), 0);
        assert_eq!(ring.stats().timeouts, 0);
        assert_eq!(ring.stats().wait_iterations, 1);
    }

    #[test]
    fn test_written_bytes_visible_to_consumer() {
        let (mut ring, _controller) = manual_ring(32, 3);
        let view = ring.consumer_view();

        let mut writer = ring.acquire_next().unwrap();
        writer.copy_from_slice(&[0x5A; 32]);
        let section = ring.publish(0).unwrap();

        assert_eq!(ring.last_published(), Some(section));
        let ok = unsafe { view.with_section(section, |b| b.iter().all(|&x| x == 0x5A)) };
        assert_eq!(ok, Some(true));
    }

    #[test]
    fn test_non_coherent_publish() {
        let (provider, _controller) = ManualProvider::auto_complete();
        let config = RingConfig::triple(64).coherent(false);
        let mut ring = StreamingRing::new(config, provider).unwrap();
        assert!(!ring.region().is_coherent());

        for _ in 0..6 {
            cycle(&mut ring);
        }
        assert_eq!(ring.stats().publishes, 6);
    }

    #[test]
    fn test_allocation_failure() {
        let (provider, controller) = ManualProvider::new();
        let err = StreamingRing::new(RingConfig::new(1024, 1), provider)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RingError::Allocation(crate::error::AllocationError::TooFewSections { count: 1 })
        ));
        assert_eq!(controller.created_count(), 0);
    }

    #[test]
    fn test_drain_and_shutdown() {
        let (mut ring, controller) = manual_ring(64, 3);
        cycle(&mut ring);
        cycle(&mut ring);
        assert_eq!(ring.outstanding_tokens(), 2);

        let err = ring.drain(Some(Duration::from_millis(5))).err().unwrap();
        assert!(err.is_recoverable());

        controller.complete_all();
        ring.drain(Some(Duration::from_millis(5))).unwrap();
        assert_eq!(ring.outstanding_tokens(), 0);
        assert_eq!(controller.live_tokens(), 0);
        assert_eq!(ring.state(0), Some(SectionState::Idle));

        let view = ring.consumer_view();
        cycle(&mut ring);
        controller.complete_all();
        let stats = ring.shutdown(None).unwrap();
        assert_eq!(stats.publishes, 3);
        assert!(view.is_released());
    }

    #[test]
    fn test_drop_with_outstanding_tokens_leaks_region() {
        let (mut ring, _controller) = manual_ring(64, 3);
        let view = ring.consumer_view();
        cycle(&mut ring);

        drop(ring);
        assert!(!view.is_released());
    }
}
