//! Simulated fixture firmware.
//!
//! Applies decoded commands to the two sub-lamps and answers with the status
//! frames a real fixture would notify. Switching one channel on switches the
//! other off.

use duolight_domain::color::Rgb;
use duolight_domain::protocol::{Channel, Command, StatusFrame};

/// Power and brightness of one sub-lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    pub on: bool,
    pub brightness: u8,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            on: false,
            brightness: 50,
        }
    }
}

/// State held by the simulated fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firmware {
    pub white: ChannelState,
    pub color: ChannelState,
    pub rgb: Rgb,
}

impl Default for Firmware {
    fn default() -> Self {
        Self {
            white: ChannelState::default(),
            color: ChannelState::default(),
            rgb: Rgb::new(0, 0, 0),
        }
    }
}

impl Firmware {
    /// Current status frame of one channel.
    #[must_use]
    pub fn status(&self, channel: Channel) -> StatusFrame {
        let (state, rgb) = match channel {
            Channel::White => (self.white, Rgb::new(0, 0, 0)),
            Channel::Color => (self.color, self.rgb),
        };
        StatusFrame {
            channel,
            on: state.on,
            brightness: state.brightness,
            rgb,
        }
    }

    /// Apply one command and return the frames to notify.
    pub fn handle(&mut self, command: Command) -> Vec<StatusFrame> {
        match command {
            Command::StatusRequest { channel } => vec![self.status(channel)],
            Command::Power { channel, on } => self.power(channel, on),
            Command::EnableColor => self.power(Channel::Color, true),
            Command::Brightness { channel, level } => {
                self.channel_mut(channel).brightness = level;
                vec![self.status(channel)]
            }
            Command::Rgb(rgb) => {
                self.rgb = rgb;
                vec![self.status(Channel::Color)]
            }
        }
    }

    fn power(&mut self, channel: Channel, on: bool) -> Vec<StatusFrame> {
        self.channel_mut(channel).on = on;
        if !on {
            return vec![self.status(channel)];
        }

        let other = match channel {
            Channel::White => Channel::Color,
            Channel::Color => Channel::White,
        };
        self.channel_mut(other).on = false;
        vec![self.status(other), self.status(channel)]
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut ChannelState {
        match channel {
            Channel::White => &mut self.white,
            Channel::Color => &mut self.color,
        }
    }
}
