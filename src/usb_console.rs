//! Operator console over USB CDC-ACM.
//!
//! Reads newline-terminated command lines with local echo and writes the
//! shell's replies back, translating `\n` to `\r\n` for terminals.

use defmt::Format;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;
use heapless::Vec;
use pelco_core::{LineEditor, LineError};

/// USB full-speed bulk packet size.
const PACKET_SIZE: usize = 64;

/// Prompt shown before each command line.
pub const PROMPT: &str = "ptz> ";

/// Console failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum ConsoleError {
    /// Host closed the port or the bus was reset.
    Disconnected,
    /// Line exceeded [`pelco_core::MAX_LINE_LEN`]; the rest of it was discarded.
    LineTooLong,
    /// Line was not valid UTF-8.
    InvalidText,
}

impl From<EndpointError> for ConsoleError {
    fn from(_: EndpointError) -> Self {
        Self::Disconnected
    }
}

impl From<LineError> for ConsoleError {
    fn from(err: LineError) -> Self {
        match err {
            LineError::TooLong => Self::LineTooLong,
            LineError::InvalidText => Self::InvalidText,
        }
    }
}

type UsbDriver<'d> = Driver<'d, USB>;

/// Line-oriented console on top of a CDC-ACM class.
pub struct UsbConsole<'d> {
    class: CdcAcmClass<'d, UsbDriver<'d>>,
    editor: LineEditor,
    packet: [u8; PACKET_SIZE],
    /// Unconsumed bytes of `packet`.
    pending: core::ops::Range<usize>,
}

impl<'d> UsbConsole<'d> {
    pub fn new(class: CdcAcmClass<'d, UsbDriver<'d>>) -> Self {
        Self {
            class,
            editor: LineEditor::new(),
            packet: [0; PACKET_SIZE],
            pending: 0..0,
        }
    }

    /// Wait until a terminal opens the port.
    pub async fn wait_connection(&mut self) {
        self.class.wait_connection().await;
        self.editor.reset();
        self.pending = 0..0;
    }

    /// Read the next command line, echoing what was typed.
    ///
    /// Backspace and DEL erase the previous character. Cancel safe: input
    /// is only consumed synchronously by the line editor, and queued echo
    /// is dropped only after it was written.
    pub async fn read_line(&mut self) -> Result<&str, ConsoleError> {
        loop {
            self.flush_echo().await?;

            if self.pending.is_empty() {
                let n = self.class.read_packet(&mut self.packet).await?;
                self.pending = 0..n;
            }

            let used = self.editor.feed(&self.packet[self.pending.clone()]);
            self.pending.start += used;

            if self.editor.is_complete() {
                return Ok(self.editor.line()?);
            }
        }
    }

    /// Write text, expanding `\n` to `\r\n`.
    ///
    /// Any echo still queued from the last line goes out first.
    pub async fn write_str(&mut self, text: &str) -> Result<(), ConsoleError> {
        self.flush_echo().await?;

        let mut out: Vec<u8, PACKET_SIZE> = Vec::new();
        let mut last_len = 0;

        for &byte in text.as_bytes() {
            if out.capacity() - out.len() < 2 {
                self.class.write_packet(&out).await?;
                last_len = out.len();
                out.clear();
            }
            if byte == b'\n' {
                let _ = out.push(b'\r');
            }
            let _ = out.push(byte);
        }

        if !out.is_empty() {
            self.class.write_packet(&out).await?;
            last_len = out.len();
        }
        // A full packet needs a zero-length packet to end the transfer.
        if last_len == PACKET_SIZE {
            self.class.write_packet(&[]).await?;
        }
        Ok(())
    }

    /// Print an unsolicited line above the one being typed, then redraw
    /// the prompt and the partial input.
    pub async fn interject(&mut self, text: &str) -> Result<(), ConsoleError> {
        self.write_str("\n").await?;
        self.write_str(text).await?;
        self.write_str("\n").await?;
        self.write_str(PROMPT).await?;
        let typed: Vec<u8, { pelco_core::MAX_LINE_LEN }> =
            Vec::from_slice(self.editor.partial()).unwrap_or_default();
        self.write_bytes(&typed).await
    }

    async fn flush_echo(&mut self) -> Result<(), ConsoleError> {
        if self.editor.pending_echo().is_empty() {
            return Ok(());
        }
        let echo: Vec<u8, { pelco_core::line::MAX_ECHO_LEN }> =
            Vec::from_slice(self.editor.pending_echo()).unwrap_or_default();
        self.write_bytes(&echo).await?;
        self.editor.clear_echo();
        Ok(())
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ConsoleError> {
        for chunk in bytes.chunks(PACKET_SIZE) {
            self.class.write_packet(chunk).await?;
        }
        if !bytes.is_empty() && bytes.len() % PACKET_SIZE == 0 {
            self.class.write_packet(&[]).await?;
        }
        Ok(())
    }
}

/// Add the CDC-ACM class to the USB builder.
pub fn configure_usb_console<'d>(
    builder: &mut Builder<'d, UsbDriver<'d>>,
    state: &'d mut State<'d>,
) -> CdcAcmClass<'d, UsbDriver<'d>> {
    CdcAcmClass::new(builder, state, PACKET_SIZE as u16)
}
