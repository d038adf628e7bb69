//! Pelco-D frame codec and helpers for the PTZ bridge.
//!
//! This crate has no I/O. It provides:
//!
//! - **Frames**: [`encode`], [`validate`], [`checksum`], [`expected_ack`]
//! - **Opcodes**: the [`opcode`] table used by the bridge
//! - **Motion**: [`Motion`] translates signed velocities and absolute
//!   positions into cmd2/data1/data2
//! - **Raw hex**: [`parse_frame`] and [`repair`] for diagnostic injection,
//!   [`HexTrace`] for rendering received bytes
//!
//! # Wire Format
//!
//! ```text
//! FF <addr> <cmd1> <cmd2> <data1> <data2> <sum>
//! ```
//!
//! `sum` is `(addr + cmd1 + cmd2 + data1 + data2) mod 256`. The camera
//! acknowledges with `FF <addr> 00 <sum>`.
//!
//! # Example
//!
//! ```
//! use pelco_proto::{encode, validate, Motion};
//!
//! let motion = Motion::pan(32).unwrap();
//! let frame = encode(0x01, 0x00, motion.cmd2, motion.data1, motion.data2);
//! assert_eq!(frame, [0xFF, 0x01, 0x00, 0x02, 0x20, 0x00, 0x23]);
//! assert!(validate(&frame).is_ok());
//! ```
//!
//! # Serial Configuration
//!
//! Pelco-D runs at 2400, 4800 or 9600 baud, 8N1, no flow control.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod frame;
pub mod hex;
pub mod motion;
pub mod opcode;

pub use frame::{
    checksum, encode, expected_ack, validate, Command, FrameError, ACK_LEN, CHECKSUM_OFFSET,
    FRAME_LEN, SYNC,
};
pub use hex::{parse_byte, parse_frame, repair, HexError, HexTrace, Repair, MAX_TRACE_BYTES};
pub use motion::{Motion, MotionError, MAX_SPEED};
