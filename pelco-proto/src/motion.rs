//! Translation from operator-level motion requests to Pelco-D payloads.
//!
//! | input     | cmd2 | data1 | data2 |
//! |-----------|------|-------|-------|
//! | pan > 0   | 0x02 | \|pan\| | 0   |
//! | pan < 0   | 0x04 | \|pan\| | 0   |
//! | tilt > 0  | 0x08 | 0     | \|tilt\| |
//! | tilt < 0  | 0x10 | 0     | \|tilt\| |
//! | 0         | 0x00 | 0     | 0     |

use crate::opcode;

/// Maximum velocity magnitude accepted for pan or tilt.
pub const MAX_SPEED: i16 = 63;

/// Error type for motion translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionError {
    /// Speed magnitude exceeds [`MAX_SPEED`].
    SpeedOutOfRange,
}

impl core::fmt::Display for MotionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SpeedOutOfRange => write!(f, "speed must be between -63 and 63"),
        }
    }
}

/// The opcode and data bytes of a motion command, without the address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub struct Motion {
    pub cmd2: u8,
    pub data1: u8,
    pub data2: u8,
}

impl Motion {
    /// The stop command.
    pub const STOP: Self = Self {
        cmd2: opcode::STOP,
        data1: 0,
        data2: 0,
    };

    /// Velocity pan. Positive is right, negative is left, zero stops.
    pub fn pan(speed: i16) -> Result<Self, MotionError> {
        let magnitude = speed_byte(speed)?;
        Ok(match speed.signum() {
            1 => Self {
                cmd2: opcode::PAN_RIGHT,
                data1: magnitude,
                data2: 0,
            },
            -1 => Self {
                cmd2: opcode::PAN_LEFT,
                data1: magnitude,
                data2: 0,
            },
            _ => Self::STOP,
        })
    }

    /// Velocity tilt. Positive is up, negative is down, zero stops.
    pub fn tilt(speed: i16) -> Result<Self, MotionError> {
        let magnitude = speed_byte(speed)?;
        Ok(match speed.signum() {
            1 => Self {
                cmd2: opcode::TILT_UP,
                data1: 0,
                data2: magnitude,
            },
            -1 => Self {
                cmd2: opcode::TILT_DOWN,
                data1: 0,
                data2: magnitude,
            },
            _ => Self::STOP,
        })
    }

    /// Absolute pan position via the extended opcode 0x4B.
    pub const fn pan_position(position: u16) -> Self {
        Self::position(opcode::SET_PAN_POSITION, position)
    }

    /// Absolute tilt position via the extended opcode 0x3D.
    pub const fn tilt_position(position: u16) -> Self {
        Self::position(opcode::SET_TILT_POSITION, position)
    }

    const fn position(cmd2: u8, position: u16) -> Self {
        let [msb, lsb] = position.to_be_bytes();
        Self {
            cmd2,
            data1: msb,
            data2: lsb,
        }
    }

    /// Merge a pan velocity and a tilt velocity into one frame payload.
    ///
    /// Only meaningful for the basic motion bitfield; the direction bits and
    /// the speed bytes occupy disjoint positions.
    pub const fn combine(pan: Self, tilt: Self) -> Self {
        Self {
            cmd2: pan.cmd2 | tilt.cmd2,
            data1: pan.data1,
            data2: tilt.data2,
        }
    }
}

#[inline]
fn speed_byte(speed: i16) -> Result<u8, MotionError> {
    if !(-MAX_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(MotionError::SpeedOutOfRange);
    }
    Ok(speed.unsigned_abs() as u8)
}
