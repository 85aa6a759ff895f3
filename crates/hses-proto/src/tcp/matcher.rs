//! Incremental response framing.

/// Framing state of one response message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Accumulating a prefix until the framing is known.
    Unknown,
    /// Message ends at a CR immediately followed by an LF.
    Crlf,
    /// Message ends at the next CR.
    Cr,
}

/// Incremental matcher finding the end of one response message.
///
/// Command responses (`OK:`, `NG:`, `ERROR:` and the literal `0000`) are
/// terminated by CRLF. Anything else is a data body terminated by a single
/// CR. The framing is decided from the first bytes: a known prefix selects
/// CRLF framing, six bytes without a match (or an immediate CR) select CR
/// framing.
#[derive(Debug, Clone)]
pub struct ResponseMatcher {
    state: State,
    prefix: Vec<u8>,
    cr: bool,
}

impl Default for ResponseMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseMatcher {
    /// Create a matcher for one message.
    pub fn new() -> Self {
        Self { state: State::Unknown, prefix: Vec::new(), cr: false }
    }

    /// Feed one byte; true when the message is complete.
    pub fn consume(&mut self, byte: u8) -> bool {
        match self.state {
            State::Unknown => {
                if byte == b'\r' {
                    self.state = State::Cr;
                    return true;
                }
                self.prefix.push(byte);
                if self.prefix == b"OK:" || self.prefix == b"NG:" || self.prefix == b"ERROR:" {
                    self.state = State::Crlf;
                } else if self.prefix == b"0000" {
                    self.state = State::Crlf;
                } else if self.prefix.len() >= 6 {
                    self.state = State::Cr;
                }
                false
            }
            State::Crlf => {
                if self.cr && byte == b'\n' {
                    return true;
                }
                self.cr = byte == b'\r';
                false
            }
            State::Cr => byte == b'\r',
        }
    }

    /// Feed a buffer; the number of bytes making up the message, if it is
    /// complete within `data`.
    pub fn find_end(&mut self, data: &[u8]) -> Option<usize> {
        for (index, byte) in data.iter().enumerate() {
            if self.consume(*byte) {
                return Some(index + 1);
            }
        }
        None
    }
}
