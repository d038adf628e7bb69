//! Operator command surface.
//!
//! Parses one text command per line, checks argument ranges, and calls the
//! bus engine. Nothing reaches the bus unless the whole line is valid.
//!
//! | command                         | engine call                     |
//! |---------------------------------|---------------------------------|
//! | `pan <-63..63>`                 | velocity pan (0 stops)          |
//! | `tilt <-63..63>`                | velocity tilt (0 stops)         |
//! | `pan_abs <0..65535>`            | opcode 0x4B, MSB/LSB            |
//! | `tilt_abs <0..65535>`           | opcode 0x3D, MSB/LSB            |
//! | `pelco_log <on\|off>`           | start/stop the observer         |
//! | `pelco_ack <on\|off>`           | acknowledged motion commands    |
//! | `pelco_raw <hex...>`            | raw frame injection             |
//! | `pelco_query <pan\|tilt> [ms]`  | position request (0x51 / 0x53)  |
//! | `pelco_fill [byte] [count]`     | line-fill burst                 |
//! | `build_ver`, `help`             | local only                      |

use crate::engine::{BusEngine, BusError, MAX_FILL_LEN};
use crate::observer::{ObserverError, ObserverHandle};
use crate::transport::Transport;
use core::fmt::Write;
use embassy_sync::blocking_mutex::raw::RawMutex;
use pelco_proto::{opcode, parse_byte, Motion, MAX_SPEED};

/// Default timeout for `pelco_query`.
pub const DEFAULT_QUERY_TIMEOUT_MS: u32 = 250;

/// Longest timeout `pelco_query` accepts.
pub const MAX_QUERY_TIMEOUT_MS: u32 = 5000;

/// Default line-fill burst length.
pub const DEFAULT_FILL_LEN: usize = 100;

const USAGE_PAN: &str = "Usage: pan <speed -63..63>";
const USAGE_TILT: &str = "Usage: tilt <speed -63..63>";
const USAGE_PAN_ABS: &str = "Usage: pan_abs <position 0..65535>";
const USAGE_TILT_ABS: &str = "Usage: tilt_abs <position 0..65535>";
const USAGE_LOG: &str = "Usage: pelco_log <on|off>";
const USAGE_ACK: &str = "Usage: pelco_ack <on|off>";
const USAGE_RAW: &str = "Usage: pelco_raw <14 hex digits, spaces allowed>";
const USAGE_QUERY: &str = "Usage: pelco_query <pan|tilt> [timeout_ms 1..5000]";
const USAGE_FILL: &str = "Usage: pelco_fill [byte hex] [count 1..256]";

/// Name, argument hint and help text of a console command.
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub name: &'static str,
    pub hint: &'static str,
    pub help: &'static str,
}

/// Every command the shell understands, in `help` order.
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "pan",
        hint: "<speed>",
        help: "Pan turret: negative=left, positive=right, 0=stop (-63..63)",
    },
    CommandInfo {
        name: "tilt",
        hint: "<speed>",
        help: "Tilt turret: negative=down, positive=up, 0=stop (-63..63)",
    },
    CommandInfo {
        name: "pan_abs",
        hint: "<position>",
        help: "Set absolute pan position (0..65535)",
    },
    CommandInfo {
        name: "tilt_abs",
        hint: "<position>",
        help: "Set absolute tilt position (0..65535)",
    },
    CommandInfo {
        name: "pelco_log",
        hint: "<on|off>",
        help: "Control pelco bus debugging (on/off)",
    },
    CommandInfo {
        name: "pelco_ack",
        hint: "<on|off>",
        help: "Require camera acknowledgement for motion commands",
    },
    CommandInfo {
        name: "pelco_raw",
        hint: "<hex>",
        help: "Send a raw 7-byte frame; sync and checksum are fixed up",
    },
    CommandInfo {
        name: "pelco_query",
        hint: "<pan|tilt> [timeout_ms]",
        help: "Query the current pan or tilt position",
    },
    CommandInfo {
        name: "pelco_fill",
        hint: "[byte] [count]",
        help: "Send a burst of fill bytes (default 100 x EF)",
    },
    CommandInfo {
        name: "build_ver",
        hint: "",
        help: "Show build version",
    },
    CommandInfo {
        name: "help",
        hint: "",
        help: "List all commands",
    },
];

/// Which axis a position query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    Pan,
    Tilt,
}

impl Axis {
    /// Query opcode for this axis.
    #[must_use]
    pub const fn query_opcode(self) -> u8 {
        match self {
            Self::Pan => opcode::QUERY_PAN_POSITION,
            Self::Tilt => opcode::QUERY_TILT_POSITION,
        }
    }
}

/// A fully validated console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'l> {
    /// Blank line.
    Empty,
    Help,
    BuildVer,
    Pan(i16),
    Tilt(i16),
    PanAbs(u16),
    TiltAbs(u16),
    Log(bool),
    Ack(bool),
    /// Hex text handed unchanged to [`BusEngine::send_raw`].
    Raw(&'l str),
    /// `timeout_ms` of `None` uses [`ShellConfig::query_timeout_ms`].
    Query {
        axis: Axis,
        timeout_ms: Option<u32>,
    },
    Fill {
        byte: u8,
        count: usize,
    },
}

/// Why a line was rejected before touching the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Missing or invalid argument. `reason` is printed before the usage line.
    Usage {
        reason: Option<&'static str>,
        usage: &'static str,
    },
    /// First word is not a known command.
    Unknown,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Usage {
                reason: Some(reason),
                usage,
            } => write!(f, "{}\n{}", reason, usage),
            Self::Usage {
                reason: None,
                usage,
            } => f.write_str(usage),
            Self::Unknown => write!(f, "Unrecognized command"),
        }
    }
}

impl<'l> Command<'l> {
    /// Parse one console line.
    pub fn parse(line: &'l str) -> Result<Self, ParseError> {
        let line = line.trim();
        let mut words = line.split_ascii_whitespace();
        let Some(name) = words.next() else {
            return Ok(Command::Empty);
        };

        Ok(match name {
            "help" => Command::Help,
            "build_ver" => Command::BuildVer,
            "pan" => Command::Pan(speed(words.next(), USAGE_PAN, "Pan")?),
            "tilt" => Command::Tilt(speed(words.next(), USAGE_TILT, "Tilt")?),
            "pan_abs" => Command::PanAbs(position(words.next(), USAGE_PAN_ABS)?),
            "tilt_abs" => Command::TiltAbs(position(words.next(), USAGE_TILT_ABS)?),
            "pelco_log" => Command::Log(on_off(words.next(), USAGE_LOG)?),
            "pelco_ack" => Command::Ack(on_off(words.next(), USAGE_ACK)?),
            "pelco_raw" => {
                let hex = line[name.len()..].trim();
                if hex.is_empty() {
                    return Err(usage(None, USAGE_RAW));
                }
                Command::Raw(hex)
            }
            "pelco_query" => {
                let axis = match words.next() {
                    Some("pan") => Axis::Pan,
                    Some("tilt") => Axis::Tilt,
                    Some(_) => return Err(usage(Some("Invalid axis."), USAGE_QUERY)),
                    None => return Err(usage(None, USAGE_QUERY)),
                };
                let timeout_ms = match words.next() {
                    Some(word) => {
                        let ms = number(word, USAGE_QUERY)?;
                        if !(1..=MAX_QUERY_TIMEOUT_MS as i32).contains(&ms) {
                            return Err(usage(
                                Some("Timeout must be between 1 and 5000 ms."),
                                USAGE_QUERY,
                            ));
                        }
                        Some(ms as u32)
                    }
                    None => None,
                };
                Command::Query { axis, timeout_ms }
            }
            "pelco_fill" => {
                let byte = match words.next() {
                    Some(word) => parse_byte(word)
                        .map_err(|_| usage(Some("Invalid fill byte."), USAGE_FILL))?,
                    None => opcode::LINE_FILL,
                };
                let count = match words.next() {
                    Some(word) => {
                        let n = number(word, USAGE_FILL)?;
                        if !(1..=MAX_FILL_LEN as i32).contains(&n) {
                            return Err(usage(
                                Some("Count must be between 1 and 256."),
                                USAGE_FILL,
                            ));
                        }
                        n as usize
                    }
                    None => DEFAULT_FILL_LEN,
                };
                Command::Fill { byte, count }
            }
            _ => return Err(ParseError::Unknown),
        })
    }
}

#[inline]
fn usage(reason: Option<&'static str>, usage: &'static str) -> ParseError {
    ParseError::Usage { reason, usage }
}

fn number(word: &str, usage_line: &'static str) -> Result<i32, ParseError> {
    word.parse::<i32>()
        .map_err(|_| usage(Some("Invalid number."), usage_line))
}

fn speed(word: Option<&str>, usage_line: &'static str, axis: &str) -> Result<i16, ParseError> {
    let word = word.ok_or(usage(None, usage_line))?;
    let value = number(word, usage_line)?;
    if !(-(MAX_SPEED as i32)..=MAX_SPEED as i32).contains(&value) {
        let reason = if axis == "Pan" {
            "Pan speed must be between -63 and 63."
        } else {
            "Tilt speed must be between -63 and 63."
        };
        return Err(usage(Some(reason), usage_line));
    }
    Ok(value as i16)
}

fn position(word: Option<&str>, usage_line: &'static str) -> Result<u16, ParseError> {
    let word = word.ok_or(usage(None, usage_line))?;
    let value = number(word, usage_line)?;
    u16::try_from(value)
        .map_err(|_| usage(Some("Position must be between 0 and 65535."), usage_line))
}

fn on_off(word: Option<&str>, usage_line: &'static str) -> Result<bool, ParseError> {
    match word {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        Some(_) => Err(usage(Some("Invalid argument."), usage_line)),
        None => Err(usage(None, usage_line)),
    }
}

/// Settings the shell needs from the firmware.
#[derive(Debug, Clone, Copy)]
pub struct ShellConfig {
    /// Printed by `build_ver`.
    pub build_id: &'static str,
    /// Timeout for `pelco_query` when none is given.
    pub query_timeout_ms: u32,
    /// Start with acknowledged motion commands enabled.
    pub acknowledged: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            build_id: env!("CARGO_PKG_VERSION"),
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            acknowledged: false,
        }
    }
}

/// Console session bound to one bus engine.
///
/// Owns the observer handle while `pelco_log on` is in effect.
pub struct Shell<'a, M: RawMutex, T: Transport> {
    engine: &'a BusEngine<M, T>,
    config: ShellConfig,
    acknowledged: bool,
    observer: Option<ObserverHandle<'a, M, T>>,
}

impl<'a, M: RawMutex, T: Transport> Shell<'a, M, T> {
    pub fn new(engine: &'a BusEngine<M, T>, config: ShellConfig) -> Self {
        Self {
            engine,
            config,
            acknowledged: config.acknowledged,
            observer: None,
        }
    }

    /// Whether motion commands currently wait for an acknowledgement.
    #[inline]
    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Execute one console line, writing any output to `out`.
    ///
    /// Returns the command's exit status: 0 on success, 1 on a usage,
    /// range or bus error. `pelco_log` reports observer state errors but
    /// still returns 0.
    pub async fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> u8 {
        self.dispatch(line, out).await.unwrap_or(1)
    }

    async fn dispatch<W: Write>(&mut self, line: &str, out: &mut W) -> Result<u8, core::fmt::Error> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(out, "{}", err)?;
                return Ok(1);
            }
        };

        match command {
            Command::Empty => Ok(0),
            Command::Help => {
                for info in COMMANDS {
                    writeln!(out, "{} {}", info.name, info.hint)?;
                    writeln!(out, "    {}", info.help)?;
                }
                Ok(0)
            }
            Command::BuildVer => {
                writeln!(out, "Build ver is '{}'", self.config.build_id)?;
                Ok(0)
            }
            Command::Pan(speed) => {
                let Ok(motion) = Motion::pan(speed) else {
                    writeln!(out, "{}", USAGE_PAN)?;
                    return Ok(1);
                };
                let result = self.motion(motion).await;
                report(out, result, "send pan command", |out| {
                    writeln!(out, "Rotating with speed {}.", speed)
                })
            }
            Command::Tilt(speed) => {
                let Ok(motion) = Motion::tilt(speed) else {
                    writeln!(out, "{}", USAGE_TILT)?;
                    return Ok(1);
                };
                let result = self.motion(motion).await;
                report(out, result, "send tilt command", |out| {
                    writeln!(out, "Tilting with speed {}.", speed)
                })
            }
            Command::PanAbs(pos) => {
                let result = self.motion(Motion::pan_position(pos)).await;
                report(out, result, "set absolute pan position", |out| {
                    writeln!(out, "Setting absolute pan position to {}.", pos)
                })
            }
            Command::TiltAbs(pos) => {
                let result = self.motion(Motion::tilt_position(pos)).await;
                report(out, result, "set absolute tilt position", |out| {
                    writeln!(out, "Setting absolute tilt position to {}.", pos)
                })
            }
            Command::Log(true) => {
                let engine = self.engine;
                match engine.start_observer() {
                    Ok(handle) => {
                        self.observer = Some(handle);
                        writeln!(out, "Pelco bus debugging started.")?;
                        Ok(0)
                    }
                    Err(err) => {
                        // Still status 0; only a bad argument is an error here.
                        writeln!(out, "Failed to start pelco bus debugging: {}", err)?;
                        Ok(0)
                    }
                }
            }
            Command::Log(false) => match self.observer.take() {
                Some(handle) => {
                    handle.stop();
                    writeln!(out, "Pelco bus debugging stopped.")?;
                    Ok(0)
                }
                None => {
                    writeln!(
                        out,
                        "Failed to stop pelco bus debugging: {}",
                        ObserverError::NotRunning
                    )?;
                    Ok(0)
                }
            },
            Command::Ack(on) => {
                self.acknowledged = on;
                writeln!(out, "Acknowledged mode {}.", if on { "on" } else { "off" })?;
                Ok(0)
            }
            Command::Raw(hex) => {
                let result = self.engine.send_raw(hex).await;
                report(out, result, "send raw command", |out| {
                    writeln!(out, "Raw frame sent.")
                })
            }
            Command::Query { axis, timeout_ms } => {
                let timeout_ms = timeout_ms.unwrap_or(self.config.query_timeout_ms);
                let result = self.engine.request(axis.query_opcode(), timeout_ms).await;
                match result {
                    Ok(value) => {
                        writeln!(out, "Position: {} (0x{:04X}).", value, value)?;
                        Ok(0)
                    }
                    Err(err) => {
                        writeln!(out, "Failed to query position: {}", err)?;
                        Ok(1)
                    }
                }
            }
            Command::Fill { byte, count } => {
                let result = self.engine.send_fill(byte, count).await;
                match result {
                    Ok(sent) => {
                        writeln!(out, "Sent {} bytes of 0x{:02X}.", sent, byte)?;
                        Ok(0)
                    }
                    Err(err) => {
                        writeln!(out, "Failed to send fill bytes: {}", err)?;
                        Ok(1)
                    }
                }
            }
        }
    }

    async fn motion(&self, motion: Motion) -> Result<(), BusError> {
        self.engine.send_motion(motion, self.acknowledged).await
    }
}

/// Print the success line or `Failed to <action>: <cause>`.
fn report<W: Write, R>(
    out: &mut W,
    result: Result<R, BusError>,
    action: &str,
    ok: impl FnOnce(&mut W) -> core::fmt::Result,
) -> Result<u8, core::fmt::Error> {
    match result {
        Ok(_) => {
            ok(out)?;
            Ok(0)
        }
        Err(err) => {
            writeln!(out, "Failed to {}: {}", action, err)?;
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::BusConfig;
    use crate::testing::block_on;
    use crate::transport::mock::{Event, MockTransport};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use std::string::String;
    use std::vec;

    type Engine = BusEngine<NoopRawMutex, MockTransport>;

    fn engine() -> (Engine, MockTransport) {
        let transport = MockTransport::new();
        let engine = BusEngine::new(BusConfig::new(1, 8, 9), transport.clone());
        (engine, transport)
    }

    fn run(shell: &mut Shell<'_, NoopRawMutex, MockTransport>, line: &str) -> (u8, String) {
        let mut out = String::new();
        let status = block_on(shell.execute(line, &mut out));
        (status, out)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("pan 32"), Ok(Command::Pan(32)));
        assert_eq!(Command::parse("  tilt   -5 "), Ok(Command::Tilt(-5)));
        assert_eq!(Command::parse("pan_abs 1000"), Ok(Command::PanAbs(1000)));
        assert_eq!(Command::parse("pelco_log on"), Ok(Command::Log(true)));
        assert_eq!(Command::parse("pelco_ack off"), Ok(Command::Ack(false)));
        assert_eq!(
            Command::parse("pelco_raw 00 01 00 02 20 00 00"),
            Ok(Command::Raw("00 01 00 02 20 00 00"))
        );
        assert_eq!(
            Command::parse("pelco_query tilt"),
            Ok(Command::Query {
                axis: Axis::Tilt,
                timeout_ms: None
            })
        );
        assert_eq!(
            Command::parse("pelco_query pan 1000"),
            Ok(Command::Query {
                axis: Axis::Pan,
                timeout_ms: Some(1000)
            })
        );
        assert_eq!(
            Command::parse("pelco_fill"),
            Ok(Command::Fill {
                byte: 0xEF,
                count: DEFAULT_FILL_LEN
            })
        );
        assert_eq!(
            Command::parse("pelco_fill 0x55 3"),
            Ok(Command::Fill { byte: 0x55, count: 3 })
        );
        assert_eq!(Command::parse(""), Ok(Command::Empty));
        assert_eq!(Command::parse("   "), Ok(Command::Empty));
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(Command::parse("zoom 3"), Err(ParseError::Unknown));
        assert_eq!(
            Command::parse("pan"),
            Err(ParseError::Usage {
                reason: None,
                usage: USAGE_PAN
            })
        );
        assert!(matches!(
            Command::parse("pan 64"),
            Err(ParseError::Usage { reason: Some(_), .. })
        ));
        assert!(matches!(
            Command::parse("tilt -64"),
            Err(ParseError::Usage { reason: Some(_), .. })
        ));
        assert!(Command::parse("pan_abs 65536").is_err());
        assert!(Command::parse("pan_abs -1").is_err());
        assert!(Command::parse("pan fast").is_err());
        assert!(Command::parse("pelco_log maybe").is_err());
        assert!(Command::parse("pelco_raw").is_err());
        assert!(Command::parse("pelco_query zoom").is_err());
        assert!(Command::parse("pelco_query pan 0").is_err());
        assert!(Command::parse("pelco_query pan 5001").is_err());
        assert!(Command::parse("pelco_fill EF 0").is_err());
        assert!(Command::parse("pelco_fill EF 257").is_err());
        assert!(Command::parse("pelco_fill XYZ").is_err());
    }

    #[test]
    fn test_pan_right_on_wire() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "pan 32");
        assert_eq!(status, 0);
        assert_eq!(out, "Rotating with speed 32.\n");
        assert_eq!(
            mock.script.lock().unwrap().writes(),
            vec![vec![0xFF, 0x01, 0x00, 0x02, 0x20, 0x00, 0x23]]
        );
    }

    #[test]
    fn test_pan_left_on_wire() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        assert_eq!(run(&mut shell, "pan -32").0, 0);
        assert_eq!(
            mock.script.lock().unwrap().writes(),
            vec![vec![0xFF, 0x01, 0x00, 0x04, 0x20, 0x00, 0x25]]
        );
    }

    #[test]
    fn test_tilt_zero_stops() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "tilt 0");
        assert_eq!(status, 0);
        assert_eq!(out, "Tilting with speed 0.\n");
        assert_eq!(
            mock.script.lock().unwrap().writes(),
            vec![vec![0xFF, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01]]
        );
    }

    #[test]
    fn test_absolute_positions() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (_, out) = run(&mut shell, "pan_abs 1000");
        assert_eq!(out, "Setting absolute pan position to 1000.\n");
        let (_, out) = run(&mut shell, "tilt_abs 65535");
        assert_eq!(out, "Setting absolute tilt position to 65535.\n");

        assert_eq!(
            mock.script.lock().unwrap().writes(),
            vec![
                vec![0xFF, 0x01, 0x00, 0x4B, 0x03, 0xE8, 0x37],
                vec![0xFF, 0x01, 0x00, 0x3D, 0xFF, 0xFF, 0x3C],
            ]
        );
    }

    #[test]
    fn test_out_of_range_sends_nothing() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "pan 100");
        assert_eq!(status, 1);
        assert!(out.contains(USAGE_PAN));
        assert!(mock.script.lock().unwrap().events.is_empty());
    }

    #[test]
    fn test_unknown_command() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "zoom in");
        assert_eq!(status, 1);
        assert_eq!(out, "Unrecognized command\n");
        assert!(mock.script.lock().unwrap().events.is_empty());
    }

    #[test]
    fn test_raw_frame_repaired() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "pelco_raw 00 01 00 02 20 00 00");
        assert_eq!(status, 0);
        assert_eq!(out, "Raw frame sent.\n");
        assert_eq!(
            mock.script.lock().unwrap().writes(),
            vec![vec![0xFF, 0x01, 0x00, 0x02, 0x20, 0x00, 0x23]]
        );
    }

    #[test]
    fn test_raw_bad_hex_reports_failure() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "pelco_raw FF 01 zz");
        assert_eq!(status, 1);
        assert!(out.starts_with("Failed to send raw command: "));
        assert!(mock.script.lock().unwrap().writes().is_empty());
    }

    #[test]
    fn test_query_position() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());
        mock.reply(&[0xFF, 0x01, 0x00, 0x51, 0x01, 0xF4, 0x47]);

        let (status, out) = run(&mut shell, "pelco_query pan");
        assert_eq!(status, 0);
        assert_eq!(out, "Position: 500 (0x01F4).\n");

        let script = mock.script.lock().unwrap();
        assert_eq!(
            script.writes(),
            vec![vec![0xFF, 0x01, 0x00, 0x51, 0x00, 0x00, 0x52]]
        );
        assert!(script.events.contains(&Event::Read {
            max: 7,
            timeout_ms: DEFAULT_QUERY_TIMEOUT_MS as u64
        }));
    }

    #[test]
    fn test_query_opcodes() {
        assert_eq!(Axis::Pan.query_opcode(), 0x51);
        assert_eq!(Axis::Tilt.query_opcode(), 0x53);

        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());
        mock.reply(&[0xFF, 0x01, 0x00, 0x53, 0x00, 0x2A, 0x7E]);

        let (status, out) = run(&mut shell, "pelco_query tilt");
        assert_eq!(status, 0);
        assert_eq!(out, "Position: 42 (0x002A).\n");
        assert_eq!(
            mock.script.lock().unwrap().writes(),
            vec![vec![0xFF, 0x01, 0x00, 0x53, 0x00, 0x00, 0x54]]
        );
    }

    #[test]
    fn test_query_timeout() {
        let (engine, _mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "pelco_query tilt 10");
        assert_eq!(status, 1);
        assert!(out.starts_with("Failed to query position: "));
    }

    #[test]
    fn test_ack_mode_waits_for_reply() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "pelco_ack on");
        assert_eq!(status, 0);
        assert_eq!(out, "Acknowledged mode on.\n");
        assert!(shell.acknowledged());

        // No acknowledgement queued.
        let (status, out) = run(&mut shell, "pan 32");
        assert_eq!(status, 1);
        assert!(out.starts_with("Failed to send pan command: "));

        mock.reply(&[0xFF, 0x01, 0x00, 0x23]);
        let (status, _) = run(&mut shell, "pan 32");
        assert_eq!(status, 0);
    }

    #[test]
    fn test_log_on_off() {
        let (engine, _mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "pelco_log on");
        assert_eq!(status, 0);
        assert_eq!(out, "Pelco bus debugging started.\n");
        assert!(engine.is_observing());

        let (status, out) = run(&mut shell, "pelco_log on");
        assert_eq!(status, 0);
        assert_eq!(
            out,
            "Failed to start pelco bus debugging: observer already running\n"
        );
        assert!(engine.is_observing());

        let (status, out) = run(&mut shell, "pelco_log off");
        assert_eq!(status, 0);
        assert_eq!(out, "Pelco bus debugging stopped.\n");
        assert!(!engine.is_observing());

        let (status, out) = run(&mut shell, "pelco_log off");
        assert_eq!(status, 0);
        assert_eq!(out, "Failed to stop pelco bus debugging: observer not running\n");

        let (status, _) = run(&mut shell, "pelco_log maybe");
        assert_eq!(status, 1);
    }

    #[test]
    fn test_dropping_shell_stops_observer() {
        let (engine, _mock) = engine();
        {
            let mut shell = Shell::new(&engine, ShellConfig::default());
            run(&mut shell, "pelco_log on");
            assert!(engine.is_observing());
        }
        assert!(!engine.is_observing());
    }

    #[test]
    fn test_fill_burst() {
        let (engine, mock) = engine();
        let mut shell = Shell::new(&engine, ShellConfig::default());

        let (status, out) = run(&mut shell, "pelco_fill");
        assert_eq!(status, 0);
        assert_eq!(out, "Sent 100 bytes of 0xEF.\n");
        assert_eq!(mock.script.lock().unwrap().writes(), vec![vec![0xEF; 100]]);
    }

    #[test]
    fn test_build_ver_and_help() {
        let (engine, mock) = engine();
        let config = ShellConfig {
            build_id: "1n",
            ..ShellConfig::default()
        };
        let mut shell = Shell::new(&engine, config);

        let (status, out) = run(&mut shell, "build_ver");
        assert_eq!(status, 0);
        assert_eq!(out, "Build ver is '1n'\n");

        let (status, out) = run(&mut shell, "help");
        assert_eq!(status, 0);
        for info in COMMANDS {
            assert!(out.contains(info.name));
        }
        assert!(mock.script.lock().unwrap().events.is_empty());
    }
}
