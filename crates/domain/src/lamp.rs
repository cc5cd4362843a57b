//! Lamp state — the reconciled model of one dual-channel fixture.
//!
//! The fixture has a white sub-lamp and a color sub-lamp that are never lit
//! together. The host sees a single lightbulb; this module maps its four
//! attributes onto the two channels and back.
//!
//! Set-requests update the model immediately and return the commands that
//! carry the change to the fixture. The touched channels are marked
//! provisional until a status notification for that channel arrives.

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeValue, AttributeWrite};
use crate::color::{self, Hsl, OUTBOUND_LIGHTNESS};
use crate::protocol::{Channel, ChannelUpdate, Command};

const DEFAULT_BRIGHTNESS: u8 = 50;

/// The reconciled device model of one accessory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LampState {
    white_on: bool,
    color_on: bool,
    white_brightness: u8,
    color_brightness: u8,
    hue: u16,
    saturation: u8,
    active_channel: Channel,
    white_provisional: bool,
    color_provisional: bool,
}

impl Default for LampState {
    fn default() -> Self {
        Self {
            white_on: false,
            color_on: false,
            white_brightness: DEFAULT_BRIGHTNESS,
            color_brightness: DEFAULT_BRIGHTNESS,
            hue: 0,
            saturation: 0,
            active_channel: Channel::White,
            white_provisional: true,
            color_provisional: true,
        }
    }
}

impl LampState {
    /// Commands asking the fixture for the state of both channels.
    #[must_use]
    pub fn status_requests() -> [Command; 2] {
        [
            Command::StatusRequest {
                channel: Channel::White,
            },
            Command::StatusRequest {
                channel: Channel::Color,
            },
        ]
    }

    /// Exposed on-state: either channel lit.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.white_on || self.color_on
    }

    /// Exposed brightness: the lit channel's, white's when neither is lit.
    #[must_use]
    pub fn brightness(&self) -> u8 {
        if self.color_on {
            self.color_brightness
        } else {
            self.white_brightness
        }
    }

    #[must_use]
    pub fn hue(&self) -> u16 {
        self.hue
    }

    #[must_use]
    pub fn saturation(&self) -> u8 {
        self.saturation
    }

    #[must_use]
    pub fn white_on(&self) -> bool {
        self.white_on
    }

    #[must_use]
    pub fn color_on(&self) -> bool {
        self.color_on
    }

    #[must_use]
    pub fn white_brightness(&self) -> u8 {
        self.white_brightness
    }

    #[must_use]
    pub fn color_brightness(&self) -> u8 {
        self.color_brightness
    }

    /// Channel addressed by the most recent command.
    #[must_use]
    pub fn active_channel(&self) -> Channel {
        self.active_channel
    }

    /// Whether the channel's fields hold values not yet confirmed by the
    /// fixture.
    #[must_use]
    pub fn is_provisional(&self, channel: Channel) -> bool {
        match channel {
            Channel::White => self.white_provisional,
            Channel::Color => self.color_provisional,
        }
    }

    /// Current value of one exposed attribute.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> AttributeValue {
        match attribute {
            Attribute::On => AttributeValue::Bool(self.is_on()),
            Attribute::Brightness => AttributeValue::Int(self.brightness().into()),
            Attribute::Hue => AttributeValue::Int(self.hue.into()),
            Attribute::Saturation => AttributeValue::Int(self.saturation.into()),
        }
    }

    /// The four exposed attributes at once.
    #[must_use]
    pub fn snapshot(&self) -> LampSnapshot {
        LampSnapshot {
            on: self.is_on(),
            brightness: self.brightness(),
            hue: self.hue,
            saturation: self.saturation,
        }
    }

    /// Apply a validated set-request.
    pub fn write(&mut self, write: AttributeWrite) -> Vec<Command> {
        match write {
            AttributeWrite::On(on) => self.set_on(on),
            AttributeWrite::Brightness(level) => self.set_brightness(level),
            AttributeWrite::Hue(hue) => self.set_hue(hue),
            AttributeWrite::Saturation(saturation) => self.set_saturation(saturation),
        }
    }

    /// Switch the lamp on or off.
    ///
    /// Turning on while the color channel is lit changes nothing. Turning on
    /// otherwise lights the white channel; turning off addresses whichever
    /// channel is lit and clears both.
    pub fn set_on(&mut self, on: bool) -> Vec<Command> {
        if on && self.color_on {
            return Vec::new();
        }

        let channel = if !on && self.color_on {
            Channel::Color
        } else {
            Channel::White
        };

        self.white_on = on;
        self.color_on = false;
        self.select(channel);
        self.mark_provisional(Channel::White);
        self.mark_provisional(Channel::Color);

        vec![Command::Power { channel, on }]
    }

    /// Set the brightness of whichever channel is lit.
    pub fn set_brightness(&mut self, level: u8) -> Vec<Command> {
        let channel = if self.color_on {
            self.color_brightness = level;
            Channel::Color
        } else {
            self.white_brightness = level;
            Channel::White
        };

        self.select(channel);
        self.mark_provisional(channel);

        vec![Command::Brightness { channel, level }]
    }

    pub fn set_hue(&mut self, hue: u16) -> Vec<Command> {
        self.hue = hue;
        self.push_rgb()
    }

    pub fn set_saturation(&mut self, saturation: u8) -> Vec<Command> {
        self.saturation = saturation;
        self.push_rgb()
    }

    /// Switch to the color channel if needed and send the stored hue and
    /// saturation as RGB.
    fn push_rgb(&mut self) -> Vec<Command> {
        let mut commands = Vec::with_capacity(2);
        if !self.color_on {
            commands.push(Command::EnableColor);
            self.mark_provisional(Channel::White);
        }

        self.color_on = true;
        self.white_on = false;
        self.select(Channel::Color);
        self.mark_provisional(Channel::Color);

        let rgb = color::hsl_to_rgb(Hsl::new(self.hue, self.saturation, OUTBOUND_LIGHTNESS));
        commands.push(Command::Rgb(rgb));
        commands
    }

    /// Overwrite the addressed channel with what the fixture reported.
    ///
    /// The other channel is left untouched, so reports may arrive in any
    /// order.
    pub fn apply(&mut self, update: ChannelUpdate) {
        match update {
            ChannelUpdate::White { on, brightness } => {
                self.white_on = on;
                self.white_brightness = brightness;
                self.white_provisional = false;
            }
            ChannelUpdate::Color {
                on,
                brightness,
                hue,
                saturation,
            } => {
                self.color_on = on;
                self.color_brightness = brightness;
                self.hue = hue;
                self.saturation = saturation;
                self.color_provisional = false;
            }
        }
    }

    fn select(&mut self, channel: Channel) {
        self.active_channel = channel;
    }

    fn mark_provisional(&mut self, channel: Channel) {
        match channel {
            Channel::White => self.white_provisional = true,
            Channel::Color => self.color_provisional = true,
        }
    }
}

/// The exposed attributes of a lamp at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LampSnapshot {
    pub on: bool,
    pub brightness: u8,
    pub hue: u16,
    pub saturation: u8,
}

impl LampSnapshot {
    /// Value of one attribute.
    #[must_use]
    pub fn value(&self, attribute: Attribute) -> AttributeValue {
        match attribute {
            Attribute::On => AttributeValue::Bool(self.on),
            Attribute::Brightness => AttributeValue::Int(self.brightness.into()),
            Attribute::Hue => AttributeValue::Int(self.hue.into()),
            Attribute::Saturation => AttributeValue::Int(self.saturation.into()),
        }
    }

    /// Attributes whose value differs in `next`, with their new value.
    #[must_use]
    pub fn changes(&self, next: &Self) -> Vec<(Attribute, AttributeValue)> {
        Attribute::ALL
            .into_iter()
            .filter_map(|attribute| {
                let value = next.value(attribute);
                (self.value(attribute) != value).then_some((attribute, value))
            })
            .collect()
    }
}
