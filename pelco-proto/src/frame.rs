//! Pelco-D frame encoding and structural validation.
//!
//! Every Pelco-D message is a fixed 7-byte frame:
//!
//! ```text
//! +------+---------+------+------+-------+-------+----------+
//! | 0xFF | address | cmd1 | cmd2 | data1 | data2 | checksum |
//! +------+---------+------+------+-------+-------+----------+
//! ```
//!
//! The checksum is the low 8 bits of the sum of bytes 1..=5.

/// Synchronisation byte that starts every frame.
pub const SYNC: u8 = 0xFF;

/// Length of a Pelco-D frame in bytes.
pub const FRAME_LEN: usize = 7;

/// Length of an acknowledgement frame in bytes.
pub const ACK_LEN: usize = 4;

/// Offset of the checksum byte within a frame.
pub const CHECKSUM_OFFSET: usize = 6;

/// Error type for frame validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Fewer than [`FRAME_LEN`] bytes were supplied.
    BadLength,
    /// Byte 0 is not [`SYNC`].
    BadSync,
    /// Byte 6 does not match the sum of bytes 1..=5.
    BadChecksum,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BadLength => write!(f, "frame too short"),
            Self::BadSync => write!(f, "bad sync byte"),
            Self::BadChecksum => write!(f, "bad checksum"),
        }
    }
}

/// The five payload fields of a frame, without sync and checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    /// Target camera address.
    pub address: u8,
    /// High command byte.
    pub cmd1: u8,
    /// Low command byte / opcode.
    pub cmd2: u8,
    /// Parameter MSB or pan speed.
    pub data1: u8,
    /// Parameter LSB or tilt speed.
    pub data2: u8,
}

impl Command {
    /// Create a command from its five payload fields.
    #[inline]
    #[must_use]
    pub const fn new(address: u8, cmd1: u8, cmd2: u8, data1: u8, data2: u8) -> Self {
        Self {
            address,
            cmd1,
            cmd2,
            data1,
            data2,
        }
    }

    /// Serialize into a complete frame with sync byte and checksum.
    #[inline]
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        encode(self.address, self.cmd1, self.cmd2, self.data1, self.data2)
    }

    /// The 16-bit parameter carried in data1 (MSB) and data2 (LSB).
    #[inline]
    #[must_use]
    pub const fn word(&self) -> u16 {
        ((self.data1 as u16) << 8) | self.data2 as u16
    }
}

/// Compute the checksum over bytes 1..=5 of a frame.
///
/// Only the payload positions are summed, so the sync byte and any
/// existing checksum in `frame` are ignored.
#[inline]
#[must_use]
pub fn checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    frame[1..CHECKSUM_OFFSET]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Build a 7-byte frame from its payload fields.
#[must_use]
pub fn encode(address: u8, cmd1: u8, cmd2: u8, data1: u8, data2: u8) -> [u8; FRAME_LEN] {
    let mut frame = [SYNC, address, cmd1, cmd2, data1, data2, 0];
    frame[CHECKSUM_OFFSET] = checksum(&frame);
    frame
}

/// Structurally validate an inbound frame.
///
/// Only the first [`FRAME_LEN`] bytes are examined. No meaning is attached
/// to the payload beyond returning it.
pub fn validate(bytes: &[u8]) -> Result<Command, FrameError> {
    let frame: &[u8; FRAME_LEN] = bytes
        .get(..FRAME_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or(FrameError::BadLength)?;

    if frame[0] != SYNC {
        return Err(FrameError::BadSync);
    }
    if frame[CHECKSUM_OFFSET] != checksum(frame) {
        return Err(FrameError::BadChecksum);
    }

    Ok(Command::new(frame[1], frame[2], frame[3], frame[4], frame[5]))
}

/// The acknowledgement a camera sends for `frame`.
///
/// Layout: `{0xFF, address, 0x00, checksum-of-frame}`.
#[inline]
#[must_use]
pub fn expected_ack(frame: &[u8; FRAME_LEN]) -> [u8; ACK_LEN] {
    [SYNC, frame[1], 0x00, frame[CHECKSUM_OFFSET]]
}
