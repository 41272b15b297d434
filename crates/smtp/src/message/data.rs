//! Dot-unstuffing state machine for the `DATA` body phase.
//!
//! Scans a byte stream for the five-byte `CRLF.CRLF` end-of-data sentinel
//! and unstuffs any lone leading dot per line (RFC 5321 section 4.5.2).
//! Kept as a plain byte-feeding state machine (rather than an `AsyncRead`
//! adapter) so the body receiver can drive it from adaptively sized chunks
//! and track the size cap as bytes arrive.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Start of a line with no real preceding CRLF to hold pending: either
    /// the very first byte of the body (the header-terminating CRLF was
    /// already consumed by the header reader) or the byte right after one
    /// that was already flushed to `out`.
    #[default]
    LineStart,
    LineStartDot,
    LineStartDotCr,
    LineStartDotDot,
    LineStartDotDotCr,
    /// Mid-line, no pending bytes.
    Start,
    Cr,
    CrLf,
    CrLfDot,
    CrLfDotCr,
    CrLfDotDot,
    CrLfDotDotCr,
    Eof,
}

impl State {
    const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::LineStartDot => b".",
            Self::LineStartDotCr => b".\r",
            Self::LineStartDotDot => b"..",
            Self::LineStartDotDotCr => b"..\r",
            Self::Cr => b"\r",
            Self::CrLf => b"\r\n",
            Self::CrLfDot => b"\r\n.",
            Self::CrLfDotCr => b"\r\n.\r",
            Self::CrLfDotDot => b"\r\n..",
            Self::CrLfDotDotCr => b"\r\n..\r",
            Self::LineStart | Self::Start | Self::Eof => unreachable!(),
        }
    }

    fn advance(&mut self, out: &mut Vec<u8>, b: u8) {
        *self = match (*self, b) {
            (State::LineStart, b'\r') => State::Cr,
            (State::LineStart, b'.') => State::LineStartDot,
            (State::LineStart, _) => {
                out.push(b);
                return;
            }
            (State::LineStartDot, b'\r') => State::LineStartDotCr,
            (State::LineStartDot, b'.') => State::LineStartDotDot,
            // ".\r\n" as the very first line: an empty body.
            (State::LineStartDotCr, b'\n') => State::Eof,
            (State::LineStartDotDot, b'\r') => State::LineStartDotDotCr,
            // "..\r\n" as the very first line: a stuffed leading dot,
            // unstuffed to a single "." with its CRLF held pending.
            (State::LineStartDotDotCr, b'\n') => {
                out.push(b'.');
                State::CrLf
            }
            (State::Start, b'\r') => State::Cr,
            (State::Start, _) => {
                out.push(b);
                return;
            }
            (State::Cr, b'\n') => State::CrLf,
            (State::CrLf, b'.') => State::CrLfDot,
            (State::CrLfDot, b'\r') => State::CrLfDotCr,
            (State::CrLfDot, b'.') => State::CrLfDotDot,
            (State::CrLfDotDot, b'\r') => State::CrLfDotDotCr,
            (State::CrLfDotDotCr, b'\n') => {
                out.extend_from_slice(b"\r\n."); // unescape dot
                State::CrLf // and continue
            }
            (State::CrLfDotCr, b'\n') => {
                out.extend_from_slice(b"\r\n");
                State::Eof
            }
            (State::Eof, _) => panic!("unexpected data after end of message"),
            (state, _) => {
                out.extend_from_slice(state.as_bytes());
                State::Start
            }
        };

        if *self == State::Start {
            self.advance(out, b);
        }
    }
}

/// Feeds a byte stream through the dot-unstuffing state machine.
#[derive(Debug, Default)]
pub struct Unstuffer {
    state: State,
}

impl Unstuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte, appending unstuffed output to `out`.
    ///
    /// Returns `true` once the `CRLF.CRLF` sentinel has been consumed; the
    /// bytes preceding it (already pushed to `out`) are the final body,
    /// exclusive of the terminator.
    pub fn feed(&mut self, b: u8, out: &mut Vec<u8>) -> bool {
        self.state.advance(out, b);
        self.state == State::Eof
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == State::Eof
    }
}

#[cfg(test)]
mod tests {
    use super::Unstuffer;

    #[test]
    fn unstuffs_and_detects_sentinel() {
        let input = b"We've been trying to reach you\r\n\
about your car's extended warranty.\r\n\
..\r\n\
.\r\n";

        let mut unstuffer = Unstuffer::new();
        let mut out = Vec::new();
        for &b in input {
            if unstuffer.feed(b, &mut out) {
                break;
            }
        }

        assert_eq!(
            out,
            b"We've been trying to reach you\r\nabout your car's extended warranty.\r\n.\r\n"
        );
        assert!(unstuffer.is_done());
    }

    #[test]
    fn bare_dot_terminates_empty_body() {
        let input = b".\r\n";
        let mut unstuffer = Unstuffer::new();
        let mut out = Vec::new();
        let mut done = false;
        for &b in input {
            if unstuffer.feed(b, &mut out) {
                done = true;
                break;
            }
        }
        assert!(done);
        assert!(out.is_empty());
    }

    #[test]
    fn stuffed_dot_on_first_line_is_unstuffed() {
        // First body line is a lone dot, stuffed to "..", followed by the
        // terminating sentinel.
        let input = b"..\r\n.\r\n";
        let mut unstuffer = Unstuffer::new();
        let mut out = Vec::new();
        let mut done = false;
        for &b in input {
            if unstuffer.feed(b, &mut out) {
                done = true;
                break;
            }
        }
        assert!(done);
        assert_eq!(out, b".\r\n");
    }
}
