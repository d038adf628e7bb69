//! Bus configuration.

use crate::engine::BusError;
use crate::transport::TransportError;

/// Data bits per character (fixed).
pub const DATA_BITS: u8 = 8;
/// Stop bits per character (fixed).
pub const STOP_BITS: u8 = 1;
/// Bits on the wire per character: start + 8 data + 1 stop.
pub const BITS_PER_CHAR: u32 = 1 + DATA_BITS as u32 + STOP_BITS as u32;

/// Minimum receive buffer the transport must install.
pub const MIN_RX_BUFFER: usize = 1024;

/// Supported Pelco-D line rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudRate {
    #[default]
    B2400,
    B4800,
    B9600,
}

impl BaudRate {
    /// Bits per second.
    #[inline]
    #[must_use]
    pub const fn bps(self) -> u32 {
        match self {
            Self::B2400 => 2400,
            Self::B4800 => 4800,
            Self::B9600 => 9600,
        }
    }

    /// Time to shift out one 8-N-1 character, in microseconds (rounded up).
    #[inline]
    #[must_use]
    pub const fn char_time_us(self) -> u64 {
        let bps = self.bps() as u64;
        (BITS_PER_CHAR as u64 * 1_000_000).div_ceil(bps)
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = BusError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        match bps {
            2400 => Ok(Self::B2400),
            4800 => Ok(Self::B4800),
            9600 => Ok(Self::B9600),
            _ => Err(BusError::TransportInit),
        }
    }
}

/// Immutable description of one Pelco-D bus.
///
/// Line identifiers are the platform's GPIO numbers. When `direction_pin`
/// is `None` the transceiver switches direction by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Serial peripheral index.
    pub port: u8,
    /// Transmit line.
    pub tx_pin: u8,
    /// Receive line.
    pub rx_pin: u8,
    /// RS-485 driver-enable line, high = transmit.
    pub direction_pin: Option<u8>,
    /// Line rate.
    pub baud: BaudRate,
    /// Camera address placed in every outgoing frame.
    pub address: u8,
}

impl BusConfig {
    /// Default configuration: 2400 baud, camera address 1, self-directing
    /// transceiver.
    #[must_use]
    pub const fn new(port: u8, tx_pin: u8, rx_pin: u8) -> Self {
        Self {
            port,
            tx_pin,
            rx_pin,
            direction_pin: None,
            baud: BaudRate::B2400,
            address: 1,
        }
    }

    /// Drive the transceiver direction from `pin`.
    #[must_use]
    pub const fn with_direction_pin(mut self, pin: u8) -> Self {
        self.direction_pin = Some(pin);
        self
    }

    #[must_use]
    pub const fn with_baud(mut self, baud: BaudRate) -> Self {
        self.baud = baud;
        self
    }

    #[must_use]
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Check that a direction line was supplied exactly when one is
    /// configured.
    pub const fn check_direction_line(&self, supplied: bool) -> Result<(), TransportError> {
        if supplied == self.direction_pin.is_some() {
            Ok(())
        } else {
            Err(TransportError::Init)
        }
    }
}
