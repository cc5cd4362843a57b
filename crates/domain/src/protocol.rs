//! Wire protocol of the dual-channel lamp fixture.
//!
//! | Piece | Module |
//! |-------|--------|
//! | Frame header, checksum, terminator | [`frame`] |
//! | Outbound command payloads | [`command`] |
//! | Inbound status notifications | [`notification`] |
//!
//! The fixture exposes one GATT service with a write-only control
//! characteristic and a notify characteristic carrying status frames.

pub mod command;
pub mod frame;
pub mod notification;

use serde::{Deserialize, Serialize};

pub use command::{Command, CommandError};
pub use frame::{FrameError, encode};
pub use notification::{ChannelUpdate, DecodeError, StatusFrame, decode};

/// 16-bit service UUID `0x7087` advertised by the fixture.
pub const SERVICE_UUID: uuid::Uuid =
    uuid::Uuid::from_u128(0x0000_7087_0000_1000_8000_0080_5f9b_34fb);

/// Control characteristic: commands are written here.
pub const CONTROL_CHAR: uuid::Uuid =
    uuid::Uuid::from_u128(0x8b00_ace7_eb0b_49b0_bbe9_9aee_0a26_e1a3);

/// Notify characteristic: status frames arrive here.
pub const NOTIFY_CHAR: uuid::Uuid =
    uuid::Uuid::from_u128(0x0734_594a_a8e7_4b1a_a6b1_cd52_4305_9a57);

/// One of the two sub-lamps sharing the fixture.
///
/// The discriminant is the selector byte used both in commands and in
/// status notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Channel {
    White = 1,
    Color = 2,
}

impl Channel {
    /// Selector byte on the wire.
    #[must_use]
    pub fn selector(self) -> u8 {
        self as u8
    }

    /// Map a notification discriminator to a channel: `2` is color,
    /// anything else is white.
    #[must_use]
    pub fn from_discriminator(byte: u8) -> Self {
        if byte == Self::Color.selector() {
            Self::Color
        } else {
            Self::White
        }
    }
}
