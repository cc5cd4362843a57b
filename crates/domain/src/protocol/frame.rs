//! Command framing: length marker, XOR checksum, header and terminator.
//!
//! | Offset | Bytes | Field |
//! |--------|-------|-------|
//! | 0–2 | `FE EF 0A` | Magic |
//! | 3 | u8 | Total length (`payload + 4`) |
//! | 4–5 | `AB AA` | Magic |
//! | 6 | u8 | Length marker (`payload - 1`) |
//! | 7.. | … | Command body |
//! | len−4 | u8 | XOR checksum |
//! | len−3 | `55` | Payload end |
//! | len−2.. | `0D 0A` | Terminator |

/// First three header bytes.
pub const HEADER_PREFIX: [u8; 3] = [0xFE, 0xEF, 0x0A];

/// Last two header bytes, following the total-length byte.
pub const HEADER_SUFFIX: [u8; 2] = [0xAB, 0xAA];

/// Frame terminator.
pub const TERMINATOR: [u8; 2] = [0x0D, 0x0A];

/// Header (6 bytes) plus terminator (2 bytes).
pub const FRAME_OVERHEAD: usize = 8;

/// Smallest payload `encode` accepts: length marker, checksum, end byte.
pub const MIN_PAYLOAD_LEN: usize = 3;

const HEADER_LEN: usize = 6;

/// XOR-fold used by the fixture firmware.
///
/// Folds `bytes[start + i]` for `i` in `start..finish - start`. For
/// `start == 0` this is the XOR of `bytes[..finish]`; for other starts the
/// window is shifted twice, which is what the firmware expects and is kept
/// as is.
///
/// # Panics
///
/// Panics if `finish > bytes.len()`.
#[must_use]
pub fn checksum(bytes: &[u8], start: usize, finish: usize) -> u8 {
    (start..finish.saturating_sub(start)).fold(0, |acc, i| acc ^ bytes[start + i])
}

/// Frame a command payload for transmission.
///
/// The payload's first byte is overwritten with the length marker and its
/// second-to-last byte with the checksum; the caller's slice is untouched.
///
/// # Panics
///
/// Panics if `payload` is shorter than [`MIN_PAYLOAD_LEN`]. Payloads are
/// produced by [`Command`](super::Command) and always satisfy this.
#[must_use]
pub fn encode(payload: &[u8]) -> Vec<u8> {
    assert!(
        payload.len() >= MIN_PAYLOAD_LEN,
        "payload must be at least {MIN_PAYLOAD_LEN} bytes"
    );

    let len = payload.len();
    let mut body = payload.to_vec();
    body[0] = len_byte(len - 1);
    body[len - 2] = checksum(&body, 0, len - 2);

    let mut frame = Vec::with_capacity(len + FRAME_OVERHEAD);
    frame.extend_from_slice(&HEADER_PREFIX);
    frame.push(len_byte(len + 4));
    frame.extend_from_slice(&HEADER_SUFFIX);
    frame.extend_from_slice(&body);
    frame.extend_from_slice(&TERMINATOR);
    frame
}

/// Validate a complete frame and return its payload.
///
/// Used on the fixture side (and in tests) to check what the bridge sends.
///
/// # Errors
///
/// Returns a [`FrameError`] describing the first check that failed.
pub fn parse(frame: &[u8]) -> Result<&[u8], FrameError> {
    if frame.len() < FRAME_OVERHEAD + MIN_PAYLOAD_LEN {
        return Err(FrameError::TooShort {
            actual: frame.len(),
        });
    }

    if frame[..3] != HEADER_PREFIX || frame[4..HEADER_LEN] != HEADER_SUFFIX {
        return Err(FrameError::BadHeader);
    }

    if frame[frame.len() - 2..] != TERMINATOR {
        return Err(FrameError::BadTerminator);
    }

    let declared = usize::from(frame[3]);
    if declared != frame.len() - 4 {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: frame.len() - 4,
        });
    }

    let payload = &frame[HEADER_LEN..frame.len() - 2];
    let marker = usize::from(payload[0]);
    if marker != payload.len() - 1 {
        return Err(FrameError::LengthMismatch {
            declared: marker + 1,
            actual: payload.len(),
        });
    }

    let expected = checksum(payload, 0, payload.len() - 2);
    let actual = payload[payload.len() - 2];
    if expected != actual {
        return Err(FrameError::BadChecksum { expected, actual });
    }

    Ok(payload)
}

#[allow(clippy::cast_possible_truncation)]
fn len_byte(len: usize) -> u8 {
    len as u8
}

/// Reasons a frame fails validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short ({actual} bytes)")]
    TooShort { actual: usize },

    #[error("frame header mismatch")]
    BadHeader,

    #[error("frame terminator mismatch")]
    BadTerminator,

    #[error("declared length {declared} does not match actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    BadChecksum { expected: u8, actual: u8 },
}
