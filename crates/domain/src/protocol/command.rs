//! Outbound commands and their payload layouts.

use super::Channel;
use super::frame::{self, FrameError};
use crate::color::Rgb;

const OP_STATUS: u8 = 48;
const OP_BRIGHTNESS: u8 = 49;
const OP_RGB: u8 = 50;
const OP_POWER_OFF: u8 = 53;
const OP_POWER_ON: u8 = 55;

/// Last payload byte of every command.
const PAYLOAD_END: u8 = 85;

/// A command understood by the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Ask the fixture to report the state of one channel.
    StatusRequest { channel: Channel },
    /// Switch one channel on or off.
    Power { channel: Channel, on: bool },
    /// Set the brightness of one channel (percent).
    Brightness { channel: Channel, level: u8 },
    /// Explicit color-channel enable sent before the first RGB push.
    EnableColor,
    /// Set the color channel's RGB value.
    Rgb(Rgb),
}

impl Command {
    /// Unframed payload, with zeroed length-marker and checksum slots.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        match *self {
            Self::StatusRequest { channel } => {
                vec![0, OP_STATUS, channel.selector(), 0, PAYLOAD_END]
            }
            Self::Power { channel, on } => {
                let op = if on { OP_POWER_ON } else { OP_POWER_OFF };
                vec![0, op, channel.selector(), 0, PAYLOAD_END]
            }
            Self::Brightness { channel, level } => {
                vec![0, OP_BRIGHTNESS, channel.selector(), level, 0, PAYLOAD_END]
            }
            Self::EnableColor => vec![4, OP_POWER_ON, Channel::Color.selector(), 0, PAYLOAD_END],
            Self::Rgb(Rgb { r, g, b }) => vec![0, OP_RGB, r, g, b, 0, PAYLOAD_END],
        }
    }

    /// Fully framed bytes ready for the control characteristic.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        frame::encode(&self.payload())
    }

    /// Validate a frame and recover the command it carries.
    ///
    /// [`Command::EnableColor`] and `Power { channel: Color, on: true }`
    /// share a payload; the latter is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Frame`] for framing problems and
    /// [`CommandError::Unsupported`] for unknown opcodes or layouts.
    pub fn decode(bytes: &[u8]) -> Result<Self, CommandError> {
        let payload = frame::parse(bytes)?;
        let unsupported = || CommandError::Unsupported {
            opcode: payload[1],
            len: payload.len(),
        };

        let selector = |byte: u8| match byte {
            1 => Some(Channel::White),
            2 => Some(Channel::Color),
            _ => None,
        };

        match (payload[1], payload.len()) {
            (OP_STATUS, 5) => selector(payload[2])
                .map(|channel| Self::StatusRequest { channel })
                .ok_or_else(unsupported),
            (OP_POWER_ON | OP_POWER_OFF, 5) => selector(payload[2])
                .map(|channel| Self::Power {
                    channel,
                    on: payload[1] == OP_POWER_ON,
                })
                .ok_or_else(unsupported),
            (OP_BRIGHTNESS, 6) => selector(payload[2])
                .map(|channel| Self::Brightness {
                    channel,
                    level: payload[3],
                })
                .ok_or_else(unsupported),
            (OP_RGB, 7) => Ok(Self::Rgb(Rgb::new(payload[2], payload[3], payload[4]))),
            _ => Err(unsupported()),
        }
    }
}

/// Reasons a received frame is not a command.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("malformed frame")]
    Frame(#[from] FrameError),

    #[error("unsupported command opcode {opcode} with payload length {len}")]
    Unsupported { opcode: u8, len: usize },
}
