//! Pelco-D command byte values used by the bridge.
//!
//! The basic motion opcodes in cmd2 form a bitfield, so pan and tilt
//! directions can be OR-ed into a single frame. The extended opcodes are
//! whole-byte values and must not be combined.

/// Stop all motion.
pub const STOP: u8 = 0x00;
/// Pan right (data1 = pan speed).
pub const PAN_RIGHT: u8 = 0x02;
/// Pan left (data1 = pan speed).
pub const PAN_LEFT: u8 = 0x04;
/// Tilt up (data2 = tilt speed).
pub const TILT_UP: u8 = 0x08;
/// Tilt down (data2 = tilt speed).
pub const TILT_DOWN: u8 = 0x10;

/// Extended: set absolute pan position (data1 = MSB, data2 = LSB).
pub const SET_PAN_POSITION: u8 = 0x4B;
/// Extended: set absolute tilt position (data1 = MSB, data2 = LSB).
pub const SET_TILT_POSITION: u8 = 0x3D;

/// Extended: query pan position. The camera answers with opcode 0x59 and
/// the position in data1/data2.
///
/// Some firmware headers label 0x51 and 0x53 as tilt/rotate "set"
/// commands; the standard Pelco-D table assigns them to the queries.
pub const QUERY_PAN_POSITION: u8 = 0x51;
/// Extended: query tilt position. The camera answers with opcode 0x5B.
pub const QUERY_TILT_POSITION: u8 = 0x53;

/// Fill byte used by the line-fill stress burst.
pub const LINE_FILL: u8 = 0xEF;
