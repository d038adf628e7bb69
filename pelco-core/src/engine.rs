//! BusEngine: owns the serial port and runs Pelco-D transactions on it.
//!
//! Every operation takes the port lock for its whole duration: the first
//! written byte, the turnaround, and the last received byte all happen while
//! no other task can touch the port. The passive observer reads through the
//! same lock, so it only ever sees the bus while the engine is idle.

use crate::config::BusConfig;
use crate::observer::{ObserverError, ObserverHandle};
use crate::transport::{Direction, Transport, TransportError};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Duration;
use pelco_proto::{
    encode, expected_ack, parse_frame, repair, validate, FrameError, HexError, Motion, Repair,
    ACK_LEN, FRAME_LEN,
};
use portable_atomic::{AtomicBool, Ordering};

/// How long a camera has to acknowledge a command.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Largest line-fill burst accepted by [`BusEngine::send_fill`].
pub const MAX_FILL_LEN: usize = 256;

/// Value legacy callers of [`BusEngine::request_or_sentinel`] receive on failure.
pub const REQUEST_SENTINEL: u16 = 0xFFFF;

/// Error type for bus operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Port could not be opened or configured.
    TransportInit,
    /// Driver accepted fewer bytes than the frame holds.
    WriteShort,
    /// Fewer than 4 acknowledgement bytes within [`ACK_TIMEOUT`].
    AckTimeout,
    /// Acknowledgement received but it does not echo the command.
    BadAck,
    /// Fewer than 7 response bytes within the caller's timeout.
    RequestTimeout,
    /// Response does not start with 0xFF.
    BadSync,
    /// Response checksum mismatch.
    BadChecksum,
    /// Raw injection input is not exactly 7 hex bytes.
    BadHex,
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TransportInit => write!(f, "transport init failed"),
            Self::WriteShort => write!(f, "incomplete write"),
            Self::AckTimeout => write!(f, "ack timeout or wrong length"),
            Self::BadAck => write!(f, "invalid ack"),
            Self::RequestTimeout => write!(f, "request timeout or wrong response length"),
            Self::BadSync => write!(f, "response sync byte error"),
            Self::BadChecksum => write!(f, "response checksum error"),
            Self::BadHex => write!(f, "hex string error"),
        }
    }
}

impl From<TransportError> for BusError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Init => BusError::TransportInit,
            TransportError::Write => BusError::WriteShort,
        }
    }
}

impl From<FrameError> for BusError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::BadLength => BusError::RequestTimeout,
            FrameError::BadSync => BusError::BadSync,
            FrameError::BadChecksum => BusError::BadChecksum,
        }
    }
}

impl From<HexError> for BusError {
    fn from(_: HexError) -> Self {
        BusError::BadHex
    }
}

/// Whether a transaction currently holds the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineState {
    Idle,
    Transacting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    FireAndForget,
    AckExpected,
    RequestResponse,
}

/// One in-flight interaction, alive only for the duration of a call.
struct Operation {
    kind: OperationKind,
    frame: [u8; FRAME_LEN],
    timeout: Duration,
}

impl Operation {
    fn fire_and_forget(frame: [u8; FRAME_LEN]) -> Self {
        Self {
            kind: OperationKind::FireAndForget,
            frame,
            timeout: Duration::from_ticks(0),
        }
    }

    /// Number of reply bytes this operation waits for.
    fn reply_len(&self) -> usize {
        match self.kind {
            OperationKind::FireAndForget => 0,
            OperationKind::AckExpected => ACK_LEN,
            OperationKind::RequestResponse => FRAME_LEN,
        }
    }
}

/// The Pelco-D protocol engine for one camera on one port.
///
/// The camera address comes from the [`BusConfig`] captured at construction.
/// All operations are serialized on an internal async mutex; concurrent
/// callers wait in whatever order the mutex grants.
pub struct BusEngine<M: RawMutex, T: Transport> {
    config: BusConfig,
    pub(crate) port: Mutex<M, T>,
    observing: AtomicBool,
    observer_wake: Signal<M, ()>,
}

impl<M: RawMutex, T: Transport> BusEngine<M, T> {
    /// Create an engine over an already opened transport.
    pub const fn new(config: BusConfig, transport: T) -> Self {
        Self {
            config,
            port: Mutex::new(transport),
            observing: AtomicBool::new(false),
            observer_wake: Signal::new(),
        }
    }

    /// The configuration this engine was built with.
    #[inline]
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Camera address used in every outgoing frame.
    #[inline]
    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// Current transaction state.
    pub fn state(&self) -> EngineState {
        match self.port.try_lock() {
            Ok(_) => EngineState::Idle,
            Err(_) => EngineState::Transacting,
        }
    }

    /// Send a command without waiting for any reply.
    ///
    /// The direction line is left in transmit mode.
    pub async fn command(&self, cmd2: u8, data1: u8, data2: u8) -> Result<(), BusError> {
        let frame = self.frame(cmd2, data1, data2);
        self.transact(Operation::fire_and_forget(frame)).await?;
        Ok(())
    }

    /// Send a command and require the camera's 4-byte acknowledgement.
    pub async fn command_ack(&self, cmd2: u8, data1: u8, data2: u8) -> Result<(), BusError> {
        let frame = self.frame(cmd2, data1, data2);
        self.transact(Operation {
            kind: OperationKind::AckExpected,
            frame,
            timeout: ACK_TIMEOUT,
        })
        .await?;
        Ok(())
    }

    /// Send a translated motion, optionally waiting for the acknowledgement.
    pub async fn send_motion(&self, motion: Motion, acknowledged: bool) -> Result<(), BusError> {
        if acknowledged {
            self.command_ack(motion.cmd2, motion.data1, motion.data2)
                .await
        } else {
            self.command(motion.cmd2, motion.data1, motion.data2).await
        }
    }

    /// Send `opcode` with zero data and return the 16-bit value of the reply.
    ///
    /// The value is taken from data1 (MSB) and data2 (LSB) of a
    /// structurally valid 7-byte response.
    pub async fn request(&self, opcode: u8, timeout_ms: u32) -> Result<u16, BusError> {
        let frame = self.frame(opcode, 0x00, 0x00);
        let reply = self
            .transact(Operation {
                kind: OperationKind::RequestResponse,
                frame,
                timeout: Duration::from_millis(timeout_ms as u64),
            })
            .await?;
        let response = validate(&reply)?;
        Ok(response.word())
    }

    /// [`request`](Self::request) for callers that expect
    /// [`REQUEST_SENTINEL`] in place of an error.
    pub async fn request_or_sentinel(&self, opcode: u8, timeout_ms: u32) -> u16 {
        self.request(opcode, timeout_ms)
            .await
            .unwrap_or(REQUEST_SENTINEL)
    }

    /// Inject a frame written as 14 hex digits (spaces allowed).
    ///
    /// A wrong sync byte or checksum is corrected before sending; the
    /// returned [`Repair`] says which.
    pub async fn send_raw(&self, hex: &str) -> Result<Repair, BusError> {
        let mut frame = parse_frame(hex)?;
        let fixed = repair(&mut frame);
        if fixed.sync {
            warn!("Fixing sync byte");
        }
        if fixed.checksum {
            warn!("Fixing checksum");
        }
        self.transact(Operation::fire_and_forget(frame)).await?;
        Ok(fixed)
    }

    /// Transmit `count` copies of `byte` back to back.
    ///
    /// Used to stress the line or flush a confused receiver. `count` is
    /// capped at [`MAX_FILL_LEN`]. Returns the number of bytes sent.
    pub async fn send_fill(&self, byte: u8, count: usize) -> Result<usize, BusError> {
        let buf = [byte; MAX_FILL_LEN];
        let bytes = &buf[..count.min(MAX_FILL_LEN)];
        let mut port = self.port.lock().await;
        Self::transmit(&mut *port, bytes).await?;
        Ok(bytes.len())
    }

    /// Begin passive observation.
    ///
    /// Observation stops when the returned handle is stopped or dropped.
    pub fn start_observer(&self) -> Result<ObserverHandle<'_, M, T>, ObserverError> {
        self.observing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ObserverError::AlreadyRunning)?;
        self.observer_wake.signal(());
        debug!("observer started");
        Ok(ObserverHandle::new(self))
    }

    pub(crate) fn end_observation(&self) {
        self.observing.store(false, Ordering::Release);
        debug!("observer stopped");
    }

    /// Whether passive observation is enabled.
    #[inline]
    pub fn is_observing(&self) -> bool {
        self.observing.load(Ordering::Acquire)
    }

    /// Wait until observation is enabled.
    pub async fn wait_observing(&self) {
        while !self.is_observing() {
            self.observer_wake.wait().await;
        }
    }

    /// Listen on the bus for one slice while no transaction is running.
    ///
    /// Returns `None` without touching the port when observation is off,
    /// otherwise the number of bytes read into `buf`.
    pub async fn observe_slice(&self, buf: &mut [u8], timeout: Duration) -> Option<usize> {
        if !self.is_observing() {
            return None;
        }
        let mut port = self.port.lock().await;
        // Stopped while waiting for the lock.
        if !self.is_observing() {
            return None;
        }
        port.set_direction(Direction::Receive).await;
        let received = port.read(buf, timeout).await;
        port.set_direction(Direction::Transmit).await;
        Some(received)
    }

    fn frame(&self, cmd2: u8, data1: u8, data2: u8) -> [u8; FRAME_LEN] {
        encode(self.config.address, 0x00, cmd2, data1, data2)
    }

    /// Assert transmit and write all of `bytes`.
    async fn transmit(port: &mut T, bytes: &[u8]) -> Result<(), BusError> {
        port.set_direction(Direction::Transmit).await;
        let written = port.write(bytes).await?;
        if written != bytes.len() {
            return Err(BusError::WriteShort);
        }
        trace!("pelco tx {:02X}", bytes);
        Ok(())
    }

    /// Run one operation with the port held throughout.
    ///
    /// Returns the raw reply bytes (zeroed when no reply was expected).
    async fn transact(&self, op: Operation) -> Result<[u8; FRAME_LEN], BusError> {
        let mut port = self.port.lock().await;
        Self::transmit(&mut *port, &op.frame).await?;

        let mut reply = [0u8; FRAME_LEN];
        let expected = op.reply_len();
        if expected == 0 {
            return Ok(reply);
        }

        port.set_direction(Direction::Receive).await;
        let received = port.read(&mut reply[..expected], op.timeout).await;
        port.set_direction(Direction::Transmit).await;
        drop(port);

        match op.kind {
            OperationKind::AckExpected => {
                if received < ACK_LEN {
                    return Err(BusError::AckTimeout);
                }
                if reply[..ACK_LEN] != expected_ack(&op.frame) {
                    return Err(BusError::BadAck);
                }
                trace!("pelco ack {:02X}", &reply[..ACK_LEN]);
            }
            OperationKind::RequestResponse => {
                if received < FRAME_LEN {
                    return Err(BusError::RequestTimeout);
                }
                trace!("pelco rx {:02X}", &reply[..]);
            }
            OperationKind::FireAndForget => {}
        }
        Ok(reply)
    }
}
