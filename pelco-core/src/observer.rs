//! Passive bus observer.
//!
//! When enabled, the observer repeatedly listens on the bus for a short slice
//! and reports whatever arrived as a hex trace. Each slice is taken through
//! the engine's port lock, so a slice never overlaps a transaction and can
//! never swallow an acknowledgement or response meant for the engine.

use crate::engine::BusEngine;
use crate::transport::Transport;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use pelco_proto::{HexTrace, MAX_TRACE_BYTES};

/// How long one listening slice lasts.
pub const POLL_SLICE: Duration = Duration::from_millis(100);

/// Pause between slices so the port lock is regularly free for commands.
pub const POLL_INTERVAL_MS: u32 = 10;

/// Error type for observer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ObserverError {
    /// Observation is already enabled.
    AlreadyRunning,
    /// There is no running observer to stop.
    NotRunning,
}

impl core::fmt::Display for ObserverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "observer already running"),
            Self::NotRunning => write!(f, "observer not running"),
        }
    }
}

/// Proof that observation is enabled.
///
/// Returned by [`BusEngine::start_observer`]. Observation ends when the
/// handle is stopped or dropped; the poll loop notices before its next slice.
#[must_use = "observation stops when the handle is dropped"]
pub struct ObserverHandle<'a, M: RawMutex, T: Transport> {
    engine: &'a BusEngine<M, T>,
}

impl<'a, M: RawMutex, T: Transport> ObserverHandle<'a, M, T> {
    pub(crate) fn new(engine: &'a BusEngine<M, T>) -> Self {
        Self { engine }
    }

    /// Stop observing.
    pub fn stop(self) {}
}

impl<M: RawMutex, T: Transport> Drop for ObserverHandle<'_, M, T> {
    fn drop(&mut self) {
        self.engine.end_observation();
    }
}

/// Listen for one slice and render anything received.
///
/// Returns `None` when observation is off or nothing arrived.
pub async fn poll_once<M: RawMutex, T: Transport>(engine: &BusEngine<M, T>) -> Option<HexTrace> {
    let mut buf = [0u8; MAX_TRACE_BYTES];
    match engine.observe_slice(&mut buf, POLL_SLICE).await {
        Some(n) if n > 0 => Some(HexTrace::new(&buf[..n])),
        _ => None,
    }
}

/// Observer loop. Runs for the life of the firmware.
///
/// Sleeps until observation is enabled, then polls in [`POLL_SLICE`]
/// slices with [`POLL_INTERVAL_MS`] between them, logging every trace and
/// handing it to `sink`.
pub async fn run<M, T, D, F>(engine: &BusEngine<M, T>, mut delay: D, mut sink: F) -> !
where
    M: RawMutex,
    T: Transport,
    D: DelayNs,
    F: FnMut(&HexTrace),
{
    loop {
        engine.wait_observing().await;

        if let Some(trace) = poll_once(engine).await {
            info!("pelco bus {}", trace);
            sink(&trace);
        }

        delay.delay_ms(POLL_INTERVAL_MS).await;
    }
}
