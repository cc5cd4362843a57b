//! Event — an immutable record of something the host should learn about.
//!
//! Attribute changes are pushed whenever a status notification (or an
//! optimistic set-request) moves an exposed value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, AttributeValue};
use crate::id::AccessoryId;

/// When the bridge observed the change, in UTC.
pub type Timestamp = DateTime<Utc>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A fixture was discovered and bridged.
    AccessoryAdded {
        accessory_id: AccessoryId,
        name: String,
        address: String,
        at: Timestamp,
    },
    /// An exposed attribute took a new value.
    AttributeChanged {
        accessory_id: AccessoryId,
        attribute: Attribute,
        value: AttributeValue,
        at: Timestamp,
    },
}

impl Event {
    #[must_use]
    pub fn accessory_added(
        accessory_id: AccessoryId,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self::AccessoryAdded {
            accessory_id,
            name: name.into(),
            address: address.into(),
            at: Utc::now(),
        }
    }

    #[must_use]
    pub fn attribute_changed(
        accessory_id: AccessoryId,
        attribute: Attribute,
        value: AttributeValue,
    ) -> Self {
        Self::AttributeChanged {
            accessory_id,
            attribute,
            value,
            at: Utc::now(),
        }
    }

    /// The accessory the event is about.
    #[must_use]
    pub fn accessory_id(&self) -> AccessoryId {
        match self {
            Self::AccessoryAdded { accessory_id, .. }
            | Self::AttributeChanged { accessory_id, .. } => *accessory_id,
        }
    }

    /// When the event was recorded.
    #[must_use]
    pub fn at(&self) -> Timestamp {
        match self {
            Self::AccessoryAdded { at, .. } | Self::AttributeChanged { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_stamp_events_when_built() {
        let before = Utc::now();
        let event = Event::attribute_changed(
            AccessoryId::new(),
            Attribute::Brightness,
            AttributeValue::Int(40),
        );
        let after = Utc::now();

        assert!(event.at() >= before);
        assert!(event.at() <= after);
    }

    #[test]
    fn should_serialize_attribute_change_with_type_tag() {
        let id = AccessoryId::new();
        let event = Event::attribute_changed(id, Attribute::Hue, AttributeValue::Int(120));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "attribute_changed");
        assert_eq!(json["attribute"], "hue");
        assert_eq!(json["value"], 120);
        assert_eq!(json["accessory_id"], id.to_string());
    }

    #[test]
    fn should_round_trip_through_json() {
        let event = Event::accessory_added(AccessoryId::new(), "Desk", "AA:BB:CC:DD:EE:FF");
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn should_expose_accessory_id() {
        let id = AccessoryId::new();
        let event = Event::attribute_changed(id, Attribute::On, AttributeValue::Bool(true));
        assert_eq!(event.accessory_id(), id);
    }
}
