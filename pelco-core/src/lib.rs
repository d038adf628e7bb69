//! Platform-agnostic Pelco-D bus engine for the PTZ bridge.
//!
//! This crate owns the protocol state for one half-duplex RS-485 bus and
//! contains no hardware code. The firmware supplies a [`Transport`]; host
//! tests supply a scripted one.
//!
//! # Overview
//!
//! - [`config`]: bus parameters ([`BusConfig`], [`BaudRate`])
//! - [`transport`]: the serial port seam ([`Transport`], [`Direction`])
//! - [`engine`]: fire-and-forget, acknowledged and request-response
//!   operations with exclusive port access ([`BusEngine`])
//! - [`observer`]: passive hex trace of bus traffic ([`ObserverHandle`])
//! - [`shell`]: the text command surface ([`Shell`])
//! - [`line`]: console line editing ([`LineEditor`])
//!
//! # Direction
//!
//! The direction line rests in transmit. It is switched to receive only
//! for the duration of a reply read or an observer slice, and always
//! switched back before the port is released.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt logging (for embedded targets)

#![cfg_attr(not(any(feature = "std", test)), no_std)]

// Must come first so the macros are visible to the other modules.
mod fmt;

pub mod config;
pub mod engine;
pub mod line;
pub mod observer;
pub mod shell;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{BaudRate, BusConfig};
pub use engine::{BusEngine, BusError, EngineState, ACK_TIMEOUT, MAX_FILL_LEN, REQUEST_SENTINEL};
pub use line::{LineEditor, LineError, MAX_LINE_LEN};
pub use observer::{ObserverError, ObserverHandle};
pub use shell::{Axis, Command, CommandInfo, ParseError, Shell, ShellConfig, COMMANDS};
pub use transport::{Direction, Transport, TransportError};

pub use pelco_proto as proto;
