//! Sync Layer: kontrak antara ring dan consumer timeline
//!
//! Consumer (misal GPU queue) berjalan asynchronous. Ring hanya bisa
//! mengamati progress consumer lewat token:
//! - `create_token`: dipanggil tepat setelah section di-publish
//! - `poll` / `wait`: dipanggil saat section akan dipakai ulang
//! - `destroy`: setelah token terkonfirmasi complete
//!
//! Provider yang tersedia:
//! - `TimelineProvider`: in-order timeline (model fence GPU queue)
//! - `ManualProvider`: token di-complete satu per satu oleh controller

mod manual;
mod timeline;

use std::time::Duration;

use crate::core::Section;

pub use manual::{ManualController, ManualProvider, ManualToken};
pub use timeline::{TimelineProvider, TimelineSignal, TimelineToken};

/// Hasil `poll` terhadap token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Pending,
    Complete,
}

/// Hasil `wait` terhadap token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Complete,
    TimedOut,
}

/// Synchronization provider untuk consumer timeline
///
/// `Token` adalah handle yang dimiliki secara unik: tidak boleh `Clone`,
/// dipindah ke slot section saat publish, dan dikembalikan lewat `destroy`.
pub trait SyncProvider {
    type Token;

    /// Token untuk "semua read consumer terhadap isi section saat ini"
    fn create_token(&mut self, section: Section) -> Self::Token;

    /// Cek non-blocking
    fn poll(&self, token: &Self::Token) -> TokenStatus;

    /// Tunggu sampai token complete. `None` berarti tanpa batas waktu.
    fn wait(&self, token: &Self::Token, timeout: Option<Duration>) -> WaitStatus;

    fn destroy(&mut self, token: Self::Token);
}
