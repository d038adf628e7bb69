//! Serial transport trait and error types.

use core::future::Future;
use embassy_time::Duration;

/// State of the RS-485 direction-enable line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Driver enabled (line high).
    Transmit,
    /// Driver disabled, receiver listening (line low).
    Receive,
}

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Peripheral could not be opened or configured.
    Init,
    /// The driver rejected a write.
    Write,
}

/// Async trait for a half-duplex serial port with an optional direction line.
///
/// Direction is never changed implicitly by `write` or `read`; the bus
/// engine sequences it around each transaction.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait Transport {
    /// Hand `bytes` to the driver.
    ///
    /// Returns the number of bytes the driver accepted. May block while the
    /// transmit FIFO is full.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<usize, TransportError>>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// Returns the number of bytes received, which is 0 on timeout.
    /// Receive errors are not distinguished from an empty read.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> impl Future<Output = usize>;

    /// Drive the direction-enable line. A no-op when no line is configured.
    ///
    /// Switching to [`Direction::Receive`] must not cut off bytes still
    /// being shifted out.
    fn set_direction(&mut self, direction: Direction) -> impl Future<Output = ()>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for host tests.

    extern crate std;

    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::vec::Vec;

    /// Something the engine did to the transport.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Write(Vec<u8>),
        Read { max: usize, timeout_ms: u64 },
        Direction(Direction),
    }

    #[derive(Default)]
    pub struct Script {
        pub events: Vec<Event>,
        /// Each read consumes one queued chunk; an empty queue times out.
        pub replies: VecDeque<Vec<u8>>,
        /// Cap on bytes accepted per write.
        pub write_limit: Option<usize>,
        pub write_error: bool,
    }

    impl Script {
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Write(bytes) => Some(bytes.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn last_direction(&self) -> Option<Direction> {
            self.events.iter().rev().find_map(|e| match e {
                Event::Direction(d) => Some(*d),
                _ => None,
            })
        }
    }

    #[derive(Clone, Default)]
    pub struct MockTransport {
        pub script: Arc<Mutex<Script>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(&self, bytes: &[u8]) {
            self.script.lock().unwrap().replies.push_back(bytes.to_vec());
        }
    }

    impl Transport for MockTransport {
        fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<usize, TransportError>> {
            let mut script = self.script.lock().unwrap();
            let result = if script.write_error {
                Err(TransportError::Write)
            } else {
                let n = script.write_limit.unwrap_or(bytes.len()).min(bytes.len());
                script.events.push(Event::Write(bytes[..n].to_vec()));
                Ok(n)
            };
            core::future::ready(result)
        }

        fn read(&mut self, buf: &mut [u8], timeout: Duration) -> impl Future<Output = usize> {
            let mut script = self.script.lock().unwrap();
            script.events.push(Event::Read {
                max: buf.len(),
                timeout_ms: timeout.as_millis(),
            });
            let n = match script.replies.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    n
                }
                None => 0,
            };
            core::future::ready(n)
        }

        fn set_direction(&mut self, direction: Direction) -> impl Future<Output = ()> {
            self.script
                .lock()
                .unwrap()
                .events
                .push(Event::Direction(direction));
            core::future::ready(())
        }
    }
}
