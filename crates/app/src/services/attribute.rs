//! Attribute hooks — the get/set capability the host binds to each attribute.
//!
//! Each attribute of the lightbulb service gets a typed hook over the
//! accessory handle. [`Lightbulb`] groups the four hooks and offers an
//! untyped entry point for hosts that exchange JSON values.

use std::future::Future;

use duolight_domain::attribute::{Attribute, AttributeValue, AttributeWrite};
use duolight_domain::error::{DuolightError, ValidationError};

use crate::services::accessory::AccessoryHandle;

/// Get/set capability for one attribute.
pub trait AttributeHook: Send + Sync {
    type Value: Send;

    fn attribute(&self) -> Attribute;

    /// Last known value.
    fn get(&self) -> impl Future<Output = Result<Self::Value, DuolightError>> + Send;

    /// Request a new value.
    fn set(&self, value: Self::Value) -> impl Future<Output = Result<(), DuolightError>> + Send;
}

macro_rules! hook {
    ($name:ident, $attribute:ident, $value:ty, $convert:path) => {
        #[derive(Clone)]
        pub struct $name(AccessoryHandle);

        impl AttributeHook for $name {
            type Value = $value;

            fn attribute(&self) -> Attribute {
                Attribute::$attribute
            }

            async fn get(&self) -> Result<$value, DuolightError> {
                let value = self.0.get(Attribute::$attribute).await?;
                $convert(Attribute::$attribute, value)
            }

            async fn set(&self, value: $value) -> Result<(), DuolightError> {
                self.0.set(AttributeWrite::$attribute(value)).await?;
                Ok(())
            }
        }
    };
}

hook!(OnHook, On, bool, as_bool);
hook!(BrightnessHook, Brightness, u8, narrow);
hook!(HueHook, Hue, u16, narrow);
hook!(SaturationHook, Saturation, u8, narrow);

fn wrong_type(attribute: Attribute, expected: &'static str) -> DuolightError {
    ValidationError::WrongType {
        attribute: attribute.name(),
        expected,
    }
    .into()
}

fn as_bool(attribute: Attribute, value: AttributeValue) -> Result<bool, DuolightError> {
    match value {
        AttributeValue::Bool(on) => Ok(on),
        AttributeValue::Int(_) => Err(wrong_type(attribute, "boolean")),
    }
}

fn narrow<T: TryFrom<i64>>(attribute: Attribute, value: AttributeValue) -> Result<T, DuolightError> {
    match value {
        AttributeValue::Int(raw) => T::try_from(raw).map_err(|_| wrong_type(attribute, "integer")),
        AttributeValue::Bool(_) => Err(wrong_type(attribute, "integer")),
    }
}

/// The lightbulb service of one accessory: four hooks over one handle.
#[derive(Clone)]
pub struct Lightbulb {
    pub on: OnHook,
    pub brightness: BrightnessHook,
    pub hue: HueHook,
    pub saturation: SaturationHook,
}

impl Lightbulb {
    #[must_use]
    pub fn new(handle: &AccessoryHandle) -> Self {
        Self {
            on: OnHook(handle.clone()),
            brightness: BrightnessHook(handle.clone()),
            hue: HueHook(handle.clone()),
            saturation: SaturationHook(handle.clone()),
        }
    }

    /// Read one attribute as an untyped value.
    ///
    /// # Errors
    ///
    /// Returns [`DuolightError::Unavailable`] if the accessory task stopped.
    pub async fn read(&self, attribute: Attribute) -> Result<AttributeValue, DuolightError> {
        Ok(match attribute {
            Attribute::On => AttributeValue::Bool(self.on.get().await?),
            Attribute::Brightness => AttributeValue::Int(self.brightness.get().await?.into()),
            Attribute::Hue => AttributeValue::Int(self.hue.get().await?.into()),
            Attribute::Saturation => AttributeValue::Int(self.saturation.get().await?.into()),
        })
    }

    /// Validate an untyped value and route it to the attribute's hook.
    ///
    /// # Errors
    ///
    /// Returns [`DuolightError::Validation`] for a value of the wrong type or
    /// out of range, otherwise whatever the set-request failed with.
    pub async fn write(
        &self,
        attribute: Attribute,
        value: AttributeValue,
    ) -> Result<(), DuolightError> {
        match AttributeWrite::new(attribute, value)? {
            AttributeWrite::On(on) => self.on.set(on).await,
            AttributeWrite::Brightness(level) => self.brightness.set(level).await,
            AttributeWrite::Hue(hue) => self.hue.set(hue).await,
            AttributeWrite::Saturation(saturation) => self.saturation.set(saturation).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::ports::GattLink;
    use crate::ports::link::fake::FakeLink;
    use crate::services::accessory::{self, AccessoryInfo, AccessorySettings};
    use duolight_domain::id::AccessoryId;

    fn lightbulb(link: &FakeLink) -> Lightbulb {
        let info = AccessoryInfo {
            id: AccessoryId::from_address(&link.address()),
            name: "Hall".to_string(),
            address: link.address(),
        };
        let (handle, _task) = accessory::spawn(
            info,
            link.clone(),
            Arc::new(InProcessEventBus::new(8)),
            &AccessorySettings::default(),
        );
        Lightbulb::new(&handle)
    }

    #[tokio::test]
    async fn should_read_defaults_through_typed_hooks() {
        let bulb = lightbulb(&FakeLink::new("11:22:33:44:55:01"));

        assert!(!bulb.on.get().await.unwrap());
        assert_eq!(bulb.brightness.get().await.unwrap(), 50);
        assert_eq!(bulb.hue.get().await.unwrap(), 0);
        assert_eq!(bulb.saturation.get().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_name_their_attribute() {
        let bulb = lightbulb(&FakeLink::new("11:22:33:44:55:02"));

        assert_eq!(bulb.on.attribute(), Attribute::On);
        assert_eq!(bulb.brightness.attribute(), Attribute::Brightness);
        assert_eq!(bulb.hue.attribute(), Attribute::Hue);
        assert_eq!(bulb.saturation.attribute(), Attribute::Saturation);
    }

    #[tokio::test]
    async fn should_route_untyped_write_to_hook() {
        let link = FakeLink::new("11:22:33:44:55:03");
        let bulb = lightbulb(&link);

        bulb.write(Attribute::Saturation, AttributeValue::Int(100))
            .await
            .unwrap();

        assert_eq!(
            bulb.read(Attribute::Saturation).await.unwrap(),
            AttributeValue::Int(100)
        );
        assert_eq!(bulb.read(Attribute::On).await.unwrap(), AttributeValue::Bool(true));
    }

    #[tokio::test]
    async fn should_reject_out_of_range_value_without_writing() {
        let link = FakeLink::new("11:22:33:44:55:04");
        let bulb = lightbulb(&link);
        bulb.read(Attribute::On).await.unwrap();
        link.clear();

        let result = bulb.write(Attribute::Hue, AttributeValue::Int(361)).await;

        assert!(matches!(result, Err(DuolightError::Validation(_))));
        assert!(link.writes().is_empty());
    }
}
