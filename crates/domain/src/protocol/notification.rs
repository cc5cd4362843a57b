//! Inbound status notifications.
//!
//! | Offset | Field |
//! |--------|-------|
//! | 8 | Channel discriminator (`2` = color, anything else = white) |
//! | 9 | On flag (`1` = on) |
//! | 10 | Brightness (percent, capped at 100) |
//! | 13–15 | RGB (color frames only) |
//!
//! Frames too short for the fields their channel needs are rejected rather
//! than partially read.

use super::Channel;
use super::frame;
use crate::attribute::PERCENT_MAX;
use crate::color::{self, Rgb};

const DISCRIMINATOR_OFFSET: usize = 8;
const ON_OFFSET: usize = 9;
const BRIGHTNESS_OFFSET: usize = 10;
const RGB_OFFSET: usize = 13;

/// Minimum frame length carrying the discriminator.
const DISCRIMINATOR_MIN_LEN: usize = DISCRIMINATOR_OFFSET + 1;
/// Minimum frame length of a white-channel status.
const WHITE_MIN_LEN: usize = BRIGHTNESS_OFFSET + 1;
/// Minimum frame length of a color-channel status.
const COLOR_MIN_LEN: usize = RGB_OFFSET + 3;

/// State of one channel as reported by the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelUpdate {
    White {
        on: bool,
        brightness: u8,
    },
    Color {
        on: bool,
        brightness: u8,
        hue: u16,
        saturation: u8,
    },
}

impl ChannelUpdate {
    /// The channel this update addresses.
    #[must_use]
    pub fn channel(&self) -> Channel {
        match self {
            Self::White { .. } => Channel::White,
            Self::Color { .. } => Channel::Color,
        }
    }
}

/// Decode a status notification.
///
/// # Errors
///
/// Returns [`DecodeError::TooShort`] when the frame does not reach the
/// offsets required by its channel.
pub fn decode(frame: &[u8]) -> Result<ChannelUpdate, DecodeError> {
    require(frame, DISCRIMINATOR_MIN_LEN)?;

    match Channel::from_discriminator(frame[DISCRIMINATOR_OFFSET]) {
        Channel::Color => {
            require(frame, COLOR_MIN_LEN)?;
            let rgb = Rgb::new(
                frame[RGB_OFFSET],
                frame[RGB_OFFSET + 1],
                frame[RGB_OFFSET + 2],
            );
            let hsl = color::rgb_to_hsl(rgb);
            Ok(ChannelUpdate::Color {
                on: frame[ON_OFFSET] == 1,
                brightness: brightness(frame),
                hue: hsl.hue,
                saturation: hsl.saturation,
            })
        }
        Channel::White => {
            require(frame, WHITE_MIN_LEN)?;
            Ok(ChannelUpdate::White {
                on: frame[ON_OFFSET] == 1,
                brightness: brightness(frame),
            })
        }
    }
}

fn brightness(frame: &[u8]) -> u8 {
    frame[BRIGHTNESS_OFFSET].min(PERCENT_MAX)
}

fn require(frame: &[u8], expected: usize) -> Result<(), DecodeError> {
    if frame.len() < expected {
        return Err(DecodeError::TooShort {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

/// Reasons a notification cannot be decoded.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("status frame must be at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
}

/// A status notification as the fixture emits it.
///
/// Uses the command framing so the fields land on the offsets [`decode`]
/// reads. White frames carry a zero RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    pub channel: Channel,
    pub on: bool,
    pub brightness: u8,
    pub rgb: Rgb,
}

impl StatusFrame {
    /// Encode the notification bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let Rgb { r, g, b } = self.rgb;
        frame::encode(&[
            0,
            48,
            self.channel.selector(),
            u8::from(self.on),
            self.brightness,
            0,
            0,
            r,
            g,
            b,
            0,
            85,
        ])
    }
}
