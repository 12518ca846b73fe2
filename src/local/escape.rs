//! Incremental parser for the local input stream.
//!
//! Plain bytes are key activity. SGR mouse reports have the form
//! `ESC [ < button ; x ; y M` (pressed) or `... m` (released). Other CSI
//! sequences (arrow keys and the like) are consumed and dropped so their
//! final byte is not mistaken for a key.

use log::debug;

const ESC: u8 = 0x1b;

/// Motion report with no button held.
pub const BUTTON_MOTION: u32 = 35;
/// Wheel scrolled up.
pub const BUTTON_SCROLL_UP: u32 = 64;
/// Wheel scrolled down.
pub const BUTTON_SCROLL_DOWN: u32 = 65;
/// Highest button code delivered through the input hook.
pub const BUTTON_MAX_ORDINARY: u32 = 7;

/// One decoded SGR mouse report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseReport {
    /// Raw SGR button code.
    pub button: u32,
    /// Column (1-based, as reported).
    pub x: i32,
    /// Row (1-based, as reported).
    pub y: i32,
    /// `M` terminator.
    pub pressed: bool,
}

impl MouseReport {
    /// Whether this report is an ordinary button transition that should
    /// reach the input hook. Wheel and motion reports only move the pointer.
    pub const fn is_button(&self) -> bool {
        self.button <= BUTTON_MAX_ORDINARY
    }
}

/// A decoded unit of local input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalInput {
    /// Activity on a plain key.
    Key(u8),
    /// Mouse report.
    Mouse(MouseReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
    /// Inside `ESC [ <`, collecting up to three numeric fields.
    Sgr {
        fields: [u32; 3],
        index: usize,
        digits: bool,
    },
}

/// Byte-at-a-time escape parser; keeps state across reads.
#[derive(Debug, Clone)]
pub struct EscapeParser {
    state: State,
}

impl Default for EscapeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EscapeParser {
    /// Create a parser in the ground state.
    pub const fn new() -> Self {
        Self { state: State::Ground }
    }

    /// Whether the parser is in the middle of an escape sequence.
    pub const fn in_sequence(&self) -> bool {
        !matches!(self.state, State::Ground)
    }

    /// Whether the parser is inside a non-mouse CSI sequence, where any
    /// byte in `0x40..=0x7e` is a legitimate final byte.
    pub const fn in_csi(&self) -> bool {
        matches!(self.state, State::Csi)
    }

    /// Abandon any partial sequence.
    pub fn reset(&mut self) {
        self.state = State::Ground;
    }

    /// Parse a chunk, appending decoded input to `out`.
    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<LocalInput>) {
        for &byte in bytes {
            if let Some(input) = self.push(byte) {
                out.push(input);
            }
        }
    }

    /// Advance by one byte.
    pub fn push(&mut self, byte: u8) -> Option<LocalInput> {
        match self.state {
            State::Ground => self.ground(byte),
            State::Escape => {
                if byte == b'[' {
                    self.state = State::Csi;
                    None
                } else {
                    // Lone ESC (or Alt+key): drop the ESC, keep the byte.
                    debug!("dropping bare escape before 0x{byte:02x}");
                    self.state = State::Ground;
                    self.ground(byte)
                }
            }
            State::Csi => {
                if byte == b'<' {
                    self.state = State::Sgr {
                        fields: [0; 3],
                        index: 0,
                        digits: false,
                    };
                } else if (0x40..=0x7e).contains(&byte) {
                    debug!("ignoring CSI sequence ending in {:?}", byte as char);
                    self.state = State::Ground;
                }
                None
            }
            State::Sgr {
                mut fields,
                index,
                digits,
            } => match byte {
                b'0'..=b'9' => {
                    fields[index] = fields[index]
                        .saturating_mul(10)
                        .saturating_add(u32::from(byte - b'0'));
                    self.state = State::Sgr {
                        fields,
                        index,
                        digits: true,
                    };
                    None
                }
                b';' if digits && index < 2 => {
                    self.state = State::Sgr {
                        fields,
                        index: index + 1,
                        digits: false,
                    };
                    None
                }
                b'M' | b'm' if digits && index == 2 => {
                    self.state = State::Ground;
                    Some(LocalInput::Mouse(MouseReport {
                        button: fields[0],
                        x: clamp_coord(fields[1]),
                        y: clamp_coord(fields[2]),
                        pressed: byte == b'M',
                    }))
                }
                _ => {
                    debug!("malformed mouse report at 0x{byte:02x}");
                    self.state = State::Ground;
                    None
                }
            },
        }
    }

    fn ground(&mut self, byte: u8) -> Option<LocalInput> {
        if byte == ESC {
            self.state = State::Escape;
            None
        } else {
            Some(LocalInput::Key(byte))
        }
    }
}

fn clamp_coord(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Vec<LocalInput> {
        let mut parser = EscapeParser::new();
        let mut out = Vec::new();
        parser.feed(bytes, &mut out);
        out
    }

    fn mouse(button: u32, x: i32, y: i32, pressed: bool) -> LocalInput {
        LocalInput::Mouse(MouseReport {
            button,
            x,
            y,
            pressed,
        })
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(
            parse(b"wa"),
            vec![LocalInput::Key(b'w'), LocalInput::Key(b'a')]
        );
    }

    #[test]
    fn test_mouse_press_and_release() {
        assert_eq!(
            parse(b"\x1b[<0;12;34M\x1b[<0;13;35m"),
            vec![mouse(0, 12, 34, true), mouse(0, 13, 35, false)]
        );
    }

    #[test]
    fn test_wheel_and_motion_are_not_buttons() {
        let out = parse(b"\x1b[<64;1;1M\x1b[<65;1;1M\x1b[<35;7;8M");
        assert_eq!(out.len(), 3);
        for input in out {
            let LocalInput::Mouse(report) = input else {
                panic!("expected mouse report");
            };
            assert!(!report.is_button());
        }
        let LocalInput::Mouse(report) = parse(b"\x1b[<2;1;1M")[0] else {
            panic!("expected mouse report");
        };
        assert!(report.is_button());
    }

    #[test]
    fn test_split_across_reads() {
        let mut parser = EscapeParser::new();
        let mut out = Vec::new();
        parser.feed(b"\x1b[<0;1", &mut out);
        assert!(out.is_empty());
        assert!(parser.in_sequence());
        parser.feed(b"0;20Mk", &mut out);
        assert_eq!(out, vec![mouse(0, 10, 20, true), LocalInput::Key(b'k')]);
    }

    #[test]
    fn test_arrow_keys_are_swallowed() {
        assert_eq!(parse(b"\x1b[A\x1b[1;5Cz"), vec![LocalInput::Key(b'z')]);
    }

    #[test]
    fn test_bare_escape_keeps_next_byte() {
        assert_eq!(parse(b"\x1bq"), vec![LocalInput::Key(b'q')]);
    }

    #[test]
    fn test_malformed_report_is_dropped() {
        assert!(parse(b"\x1b[<0;1X").is_empty());
        assert_eq!(parse(b"\x1b[<0;1Xz"), vec![LocalInput::Key(b'z')]);
        // The sequence ends at the offending byte; what follows is plain input.
        assert_eq!(
            parse(b"\x1b[<0;1;2;3M"),
            vec![LocalInput::Key(b'3'), LocalInput::Key(b'M')]
        );
    }

    #[test]
    fn test_huge_coordinate_saturates() {
        let out = parse(b"\x1b[<0;99999999999;1M");
        assert_eq!(out, vec![mouse(0, i32::MAX, 1, true)]);
    }

    #[test]
    fn test_csi_state_tracking() {
        let mut parser = EscapeParser::new();
        assert!(parser.push(ESC).is_none());
        assert!(parser.in_sequence());
        assert!(!parser.in_csi());
        assert!(parser.push(b'[').is_none());
        assert!(parser.in_csi());
        assert!(parser.push(b'<').is_none());
        assert!(!parser.in_csi());

        parser.reset();
        assert!(!parser.in_sequence());
        assert_eq!(parser.push(b'x'), Some(LocalInput::Key(b'x')));
    }
}
