//! Attributes exposed to the host — the lightbulb surface of an accessory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound of the brightness and saturation percentages.
pub const PERCENT_MAX: u8 = 100;

/// Upper bound of the hue angle in degrees.
pub const HUE_MAX: u16 = 360;

/// One of the four attributes of the exposed lightbulb service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    On,
    Brightness,
    Hue,
    Saturation,
}

impl Attribute {
    /// Every attribute, in the order they are reported to the host.
    pub const ALL: [Self; 4] = [Self::On, Self::Brightness, Self::Hue, Self::Saturation];

    /// Lowercase attribute name as used on the wire.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Brightness => "brightness",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|attr| attr.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownAttribute(s.to_string()))
    }
}

/// Untyped attribute value as exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
}

/// A validated set-request for a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeWrite {
    On(bool),
    Brightness(u8),
    Hue(u16),
    Saturation(u8),
}

impl AttributeWrite {
    /// Validate an untyped host value against the attribute's type and range.
    ///
    /// `On` also accepts the integers `0` and `1`, which some hosts send for
    /// boolean characteristics.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::WrongType`] or [`ValidationError::OutOfRange`].
    pub fn new(attribute: Attribute, value: AttributeValue) -> Result<Self, ValidationError> {
        match (attribute, value) {
            (Attribute::On, AttributeValue::Bool(on)) => Ok(Self::On(on)),
            (Attribute::On, AttributeValue::Int(raw @ (0 | 1))) => Ok(Self::On(raw == 1)),
            (Attribute::On, AttributeValue::Int(_)) => Err(ValidationError::WrongType {
                attribute: "on",
                expected: "boolean",
            }),
            (Attribute::Brightness, AttributeValue::Int(raw)) => {
                percent("brightness", raw).map(Self::Brightness)
            }
            (Attribute::Saturation, AttributeValue::Int(raw)) => {
                percent("saturation", raw).map(Self::Saturation)
            }
            (Attribute::Hue, AttributeValue::Int(raw)) => u16::try_from(raw)
                .ok()
                .filter(|hue| *hue <= HUE_MAX)
                .map(Self::Hue)
                .ok_or(ValidationError::OutOfRange {
                    attribute: "hue",
                    max: HUE_MAX,
                    value: raw,
                }),
            (attr, AttributeValue::Bool(_)) => Err(ValidationError::WrongType {
                attribute: attr.name(),
                expected: "integer",
            }),
        }
    }

    /// The attribute this write targets.
    #[must_use]
    pub fn attribute(self) -> Attribute {
        match self {
            Self::On(_) => Attribute::On,
            Self::Brightness(_) => Attribute::Brightness,
            Self::Hue(_) => Attribute::Hue,
            Self::Saturation(_) => Attribute::Saturation,
        }
    }

    /// The written value in its untyped form.
    #[must_use]
    pub fn value(self) -> AttributeValue {
        match self {
            Self::On(on) => AttributeValue::Bool(on),
            Self::Brightness(level) | Self::Saturation(level) => {
                AttributeValue::Int(i64::from(level))
            }
            Self::Hue(hue) => AttributeValue::Int(i64::from(hue)),
        }
    }
}

fn percent(attribute: &'static str, raw: i64) -> Result<u8, ValidationError> {
    u8::try_from(raw)
        .ok()
        .filter(|level| *level <= PERCENT_MAX)
        .ok_or(ValidationError::OutOfRange {
            attribute,
            max: u16::from(PERCENT_MAX),
            value: raw,
        })
}
