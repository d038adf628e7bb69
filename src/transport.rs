//! Half-duplex RS-485 transport over an RP2040 buffered UART.
//!
//! # Pins
//!
//! Uses UART1 by default:
//! - GPIO 8: TX
//! - GPIO 9: RX
//! - GPIO 10: DE/RE (only with the `rs485-direction` feature)
//!
//! Without a direction pin the transceiver is assumed to switch on its own.

use embassy_rp::gpio::Output;
use embassy_rp::uart::BufferedUart;
use embassy_time::{with_deadline, Duration, Instant, Timer};
use embedded_io_async::{Read, Write};
use pelco_core::{BusConfig, Direction, Transport, TransportError};

/// RS-485 port plus its optional driver-enable line.
pub struct Rs485Transport<'d> {
    uart: BufferedUart,
    direction: Option<Output<'d>>,
    turnaround: Duration,
}

impl<'d> Rs485Transport<'d> {
    /// Wrap an already configured UART.
    ///
    /// `direction` must be present exactly when `config` names a direction
    /// pin. The line is driven to transmit before returning.
    pub fn new(
        uart: BufferedUart,
        direction: Option<Output<'d>>,
        config: &BusConfig,
    ) -> Result<Self, TransportError> {
        config.check_direction_line(direction.is_some())?;

        let mut transport = Self {
            uart,
            direction,
            turnaround: Duration::from_micros(config.baud.char_time_us()),
        };
        transport.drive(Direction::Transmit);
        Ok(transport)
    }

    fn drive(&mut self, direction: Direction) {
        if let Some(pin) = self.direction.as_mut() {
            match direction {
                Direction::Transmit => pin.set_high(),
                Direction::Receive => pin.set_low(),
            }
        }
    }
}

impl Transport for Rs485Transport<'_> {
    async fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        let mut written = 0;
        while written < bytes.len() {
            match self.uart.write(&bytes[written..]).await {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(_) => return Err(TransportError::Write),
            }
        }
        Ok(written)
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut received = 0;

        while received < buf.len() {
            match with_deadline(deadline, self.uart.read(&mut buf[received..])).await {
                Ok(Ok(n)) => received += n,
                Ok(Err(e)) => {
                    defmt::warn!("RS-485 read error: {:?}", e);
                    break;
                }
                Err(_) => break,
            }
        }
        received
    }

    async fn set_direction(&mut self, direction: Direction) {
        if direction == Direction::Receive {
            // Let the last stop bit leave the wire before releasing it.
            if self.uart.flush().await.is_err() {
                defmt::warn!("RS-485 flush failed");
            }
            Timer::after(self.turnaround).await;
        }
        self.drive(direction);
    }
}
