//! Pelco-D PTZ bridge for RP2040.
//!
//! Binds the platform-agnostic bus engine to an RS-485 transceiver on a
//! UART and exposes the command shell on a USB CDC-ACM console.

#![no_std]

pub use pelco_core::{
    observer, BaudRate, BusConfig, BusEngine, BusError, Command, Direction, EngineState,
    ObserverError, ObserverHandle, Shell, ShellConfig, Transport, TransportError,
};
pub use pelco_proto::{HexTrace, Motion};

pub mod transport;
pub mod usb_console;

pub use transport::Rs485Transport;
pub use usb_console::{configure_usb_console, ConsoleError, UsbConsole, PROMPT};
