//! ASCII hex handling: raw frame injection and bus traces.

use crate::frame::{checksum, CHECKSUM_OFFSET, FRAME_LEN, SYNC};
use core::fmt::Write;
use heapless::String;

/// Hex digits lookup table for trace formatting.
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Number of bytes a single [`HexTrace`] renders.
pub const MAX_TRACE_BYTES: usize = 64;

/// Capacity of a rendered trace: `"[NN] "` prefix plus `"XX "` per byte.
pub const TRACE_CAPACITY: usize = 8 + MAX_TRACE_BYTES * 3;

/// Error type for raw hex parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HexError {
    /// Odd number of hex digits after removing whitespace.
    OddLength,
    /// Even number of digits, but not exactly one frame's worth.
    WrongLength,
    /// A character that is neither a hex digit nor whitespace.
    BadDigit,
}

impl core::fmt::Display for HexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OddLength => write!(f, "odd number of hex digits"),
            Self::WrongLength => write!(f, "expected exactly 14 hex digits"),
            Self::BadDigit => write!(f, "invalid hex digit"),
        }
    }
}

/// Which fields [`repair`] rewrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Repair {
    /// Byte 0 was not 0xFF.
    pub sync: bool,
    /// Byte 6 did not match the computed checksum.
    pub checksum: bool,
}

impl Repair {
    /// True if nothing had to be changed.
    #[inline]
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.sync && !self.checksum
    }
}

/// Parse exactly one frame from an ASCII hex string.
///
/// Whitespace anywhere in the input is ignored. The bytes are returned as
/// written; use [`repair`] to force a valid sync byte and checksum.
pub fn parse_frame(input: &str) -> Result<[u8; FRAME_LEN], HexError> {
    let mut frame = [0u8; FRAME_LEN];
    let mut digits = 0usize;
    let mut high = 0u8;

    for &b in input.as_bytes() {
        if b.is_ascii_whitespace() {
            continue;
        }
        let nibble = hex_digit(b)?;
        if digits < FRAME_LEN * 2 {
            if digits % 2 == 0 {
                high = nibble;
            } else {
                frame[digits / 2] = (high << 4) | nibble;
            }
        }
        digits += 1;
    }

    if digits % 2 != 0 {
        return Err(HexError::OddLength);
    }
    if digits != FRAME_LEN * 2 {
        return Err(HexError::WrongLength);
    }
    Ok(frame)
}

/// Parse a single byte written as one or two hex digits, e.g. `EF` or `0x7`.
pub fn parse_byte(input: &str) -> Result<u8, HexError> {
    let s = input.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    match s.as_bytes() {
        [lo] => hex_digit(*lo),
        [hi, lo] => Ok((hex_digit(*hi)? << 4) | hex_digit(*lo)?),
        _ => Err(HexError::WrongLength),
    }
}

/// Force a valid sync byte and checksum onto `frame`.
pub fn repair(frame: &mut [u8; FRAME_LEN]) -> Repair {
    let mut fixed = Repair::default();

    if frame[0] != SYNC {
        frame[0] = SYNC;
        fixed.sync = true;
    }

    let sum = checksum(frame);
    if frame[CHECKSUM_OFFSET] != sum {
        frame[CHECKSUM_OFFSET] = sum;
        fixed.checksum = true;
    }

    fixed
}

/// Convert a hex character to its value.
#[inline]
fn hex_digit(b: u8) -> Result<u8, HexError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        _ => Err(HexError::BadDigit),
    }
}

/// Human-readable dump of received bytes: `"[3] FF 01 00"`.
///
/// The count always reflects the full input; only the first
/// [`MAX_TRACE_BYTES`] bytes are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexTrace {
    count: usize,
    text: String<TRACE_CAPACITY>,
}

impl HexTrace {
    /// Render `bytes` as a trace line.
    #[must_use]
    pub fn new(bytes: &[u8]) -> Self {
        let mut text = String::new();
        // Capacity covers the largest prefix plus MAX_TRACE_BYTES entries.
        let _ = write!(text, "[{}]", bytes.len());
        for &b in bytes.iter().take(MAX_TRACE_BYTES) {
            let _ = text.push(' ');
            let _ = text.push(HEX_DIGITS[(b >> 4) as usize] as char);
            let _ = text.push(HEX_DIGITS[(b & 0xF) as usize] as char);
        }
        Self {
            count: bytes.len(),
            text,
        }
    }

    /// Number of bytes the trace describes.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The rendered trace.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl core::fmt::Display for HexTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HexTrace {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str());
    }
}
