//! Console line editing.
//!
//! [`LineEditor`] turns raw terminal input into command lines and queues the
//! echo the terminal should see. It never performs I/O, so the caller can
//! drop a pending read at any await point without losing typed input or a
//! completed line.

use heapless::Vec;

/// Longest accepted command line.
pub const MAX_LINE_LEN: usize = 128;

/// Echo queue size. `feed` stops early rather than overflow it.
pub const MAX_ECHO_LEN: usize = 192;

const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7F;
const ERASE: &[u8] = b"\x08 \x08";
const NEWLINE: &[u8] = b"\r\n";

/// Why a completed line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded [`MAX_LINE_LEN`]; the excess was discarded.
    TooLong,
    /// Line was not valid UTF-8.
    InvalidText,
}

impl core::fmt::Display for LineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooLong => write!(f, "line too long"),
            Self::InvalidText => write!(f, "invalid text"),
        }
    }
}

/// Line buffer plus pending echo.
#[derive(Debug, Default)]
pub struct LineEditor {
    line: Vec<u8, MAX_LINE_LEN>,
    echo: Vec<u8, MAX_ECHO_LEN>,
    overflow: bool,
    complete: bool,
    /// Last terminator was CR; a following LF belongs to it.
    after_cr: bool,
}

impl LineEditor {
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            echo: Vec::new(),
            overflow: false,
            complete: false,
            after_cr: false,
        }
    }

    /// Consume input up to and including the first line terminator.
    ///
    /// Returns how many bytes of `input` were used. Stops early when the
    /// line completes or the echo queue is nearly full; feed the rest after
    /// [`clear_echo`](Self::clear_echo).
    pub fn feed(&mut self, input: &[u8]) -> usize {
        if self.complete {
            self.line.clear();
            self.overflow = false;
            self.complete = false;
        }

        let mut used = 0;
        for &byte in input {
            if self.echo.capacity() - self.echo.len() < ERASE.len() {
                break;
            }
            used += 1;

            let after_cr = core::mem::replace(&mut self.after_cr, false);
            match byte {
                b'\n' if after_cr => {}
                b'\r' | b'\n' => {
                    self.after_cr = byte == b'\r';
                    self.complete = true;
                    let _ = self.echo.extend_from_slice(NEWLINE);
                    break;
                }
                BACKSPACE | DEL => {
                    if self.line.pop().is_some() {
                        let _ = self.echo.extend_from_slice(ERASE);
                    }
                }
                _ => {
                    if self.line.push(byte).is_ok() {
                        let _ = self.echo.push(byte);
                    } else {
                        self.overflow = true;
                    }
                }
            }
        }
        used
    }

    /// Whether a full line is waiting in [`line`](Self::line).
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The completed line. Only meaningful when [`is_complete`](Self::is_complete).
    pub fn line(&self) -> Result<&str, LineError> {
        if self.overflow {
            return Err(LineError::TooLong);
        }
        core::str::from_utf8(&self.line).map_err(|_| LineError::InvalidText)
    }

    /// What has been typed of the line in progress.
    pub fn partial(&self) -> &[u8] {
        if self.complete {
            &[]
        } else {
            &self.line
        }
    }

    /// Bytes the terminal should see, oldest first.
    #[inline]
    pub fn pending_echo(&self) -> &[u8] {
        &self.echo
    }

    /// Drop the echo once it has been written out.
    #[inline]
    pub fn clear_echo(&mut self) {
        self.echo.clear();
    }

    /// Forget everything, e.g. after the terminal reconnects.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn feed_all(editor: &mut LineEditor, mut input: &[u8]) {
        while !input.is_empty() {
            let used = editor.feed(input);
            input = &input[used..];
            if editor.is_complete() {
                break;
            }
            editor.clear_echo();
        }
    }

    #[test]
    fn test_line_completes_before_echo_is_written() {
        let mut editor = LineEditor::new();
        let used = editor.feed(b"pan 5\rtilt");

        assert_eq!(used, 6);
        assert!(editor.is_complete());
        assert_eq!(editor.line(), Ok("pan 5"));
        assert_eq!(editor.pending_echo(), b"pan 5\r\n");
    }

    #[test]
    fn test_unwritten_echo_keeps_completed_line() {
        let mut editor = LineEditor::new();
        editor.feed(b"pan 5\r");
        // The echo write was abandoned: nothing cleared, line still complete.
        assert!(editor.is_complete());
        assert_eq!(editor.line(), Ok("pan 5"));
        assert_eq!(editor.pending_echo(), b"pan 5\r\n");
    }

    #[test]
    fn test_partial_line_survives_between_reads() {
        let mut editor = LineEditor::new();
        editor.feed(b"pa");
        editor.clear_echo();
        assert!(!editor.is_complete());
        assert_eq!(editor.partial(), b"pa");

        editor.feed(b"n 1\r");
        assert_eq!(editor.line(), Ok("pan 1"));
        assert_eq!(editor.partial(), b"");
    }

    #[test]
    fn test_next_line_starts_empty() {
        let mut editor = LineEditor::new();
        editor.feed(b"build_ver\r");
        editor.clear_echo();

        editor.feed(b"help\n");
        assert_eq!(editor.line(), Ok("help"));
    }

    #[test]
    fn test_crlf_split_across_reads() {
        let mut editor = LineEditor::new();
        editor.feed(b"help\r");
        editor.clear_echo();

        assert_eq!(editor.feed(b"\n"), 1);
        assert!(!editor.is_complete());
        assert_eq!(editor.partial(), b"");
        assert_eq!(editor.pending_echo(), b"");
    }

    #[test]
    fn test_bare_enter_is_empty_line() {
        let mut editor = LineEditor::new();
        editor.feed(b"\r");
        assert_eq!(editor.line(), Ok(""));
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut editor = LineEditor::new();
        editor.feed(b"panx\x08 1\x7F2\r");
        assert_eq!(editor.line(), Ok("pan 2"));
        assert_eq!(editor.pending_echo(), b"panx\x08 \x08 1\x08 \x082\r\n");
    }

    #[test]
    fn test_backspace_on_empty_line_echoes_nothing() {
        let mut editor = LineEditor::new();
        editor.feed(b"\x08\x7F");
        assert_eq!(editor.pending_echo(), b"");
    }

    #[test]
    fn test_overflow_rejected() {
        let mut editor = LineEditor::new();
        let long = [b'a'; MAX_LINE_LEN + 10];
        feed_all(&mut editor, &long);
        feed_all(&mut editor, b"\r");

        assert!(editor.is_complete());
        assert_eq!(editor.line(), Err(LineError::TooLong));

        editor.feed(b"help\r");
        assert_eq!(editor.line(), Ok("help"));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut editor = LineEditor::new();
        editor.feed(&[0xC3, 0x28, b'\r']);
        assert_eq!(editor.line(), Err(LineError::InvalidText));
    }

    #[test]
    fn test_feed_stops_when_echo_full() {
        let mut editor = LineEditor::new();
        feed_all(&mut editor, &[b'a'; 100]);
        editor.clear_echo();

        // 65 erasures need 195 echo bytes; only 64 fit.
        let input = [BACKSPACE; 65];
        assert_eq!(editor.feed(&input), 64);
        editor.clear_echo();
        assert_eq!(editor.feed(&input[64..]), 1);
        assert_eq!(editor.partial().len(), 100 - 65);
    }

    #[test]
    fn test_reset() {
        let mut editor = LineEditor::new();
        editor.feed(b"pan");
        editor.reset();
        assert_eq!(editor.partial(), b"");
        assert_eq!(editor.pending_echo(), b"");
    }
}
