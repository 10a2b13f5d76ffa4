//! Wire format shared by every endpoint.
//!
//! A request is the raw bytes of a single read, at most [`MAX_REQUEST_LEN`]
//! long, with no framing. A response is
//!
//! ```text
//! [status: u8][power tens digit: u8][power ones digit: u8][payload...]
//! ```
//!
//! The power digits hint that `2^power` bytes will hold the payload. Clients
//! may use them to size a buffer; nothing checks them.

use thiserror::Error;

/// Largest request read from a connection; anything beyond is dropped.
pub const MAX_REQUEST_LEN: usize = 128;

/// Status byte plus the two power digits.
pub const HEADER_LEN: usize = 3;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Failure = 0,
    Success = 1,
}

impl TryFrom<u8> for Status {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Status::Failure),
            1 => Ok(Status::Success),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("response too short: {0} bytes")]
    Truncated(usize),

    #[error("unknown status byte {0}")]
    UnknownStatus(u8),
}

/// One encoded reply to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    /// Result text on success, error description on failure.
    pub payload: String,
}

impl Response {
    pub fn success(payload: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            payload: payload.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            payload: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn encode(&self) -> Vec<u8> {
        let power = power_hint(self.payload.len());
        let mut msg = Vec::with_capacity(HEADER_LEN + self.payload.len());
        msg.push(self.status as u8);
        msg.push(power / 10);
        msg.push(power % 10);
        msg.extend_from_slice(self.payload.as_bytes());
        msg
    }

    /// Parse a full response. The power digits are skipped.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated(bytes.len()));
        }
        Ok(Self {
            status: Status::try_from(bytes[0])?,
            payload: String::from_utf8_lossy(&bytes[HEADER_LEN..]).into_owned(),
        })
    }
}

/// Exponent written into the header for a payload of `len` bytes.
///
/// Starts at 1 and counts the doublings of 2 needed to reach `len`, so
/// payloads shorter than 2 bytes still report 1.
pub fn power_hint(len: usize) -> u8 {
    let mut power = 1;
    let mut size: usize = 2;
    while size < len {
        size = size.saturating_mul(2);
        power += 1;
    }
    power
}
