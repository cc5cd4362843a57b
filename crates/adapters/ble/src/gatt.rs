//! GATT link over a btleplug peripheral.
//!
//! [`BlePeripheral`] implements the [`GattLink`] port. It is a thin wrapper:
//! the connection manager in `duolight-app` decides when to connect,
//! subscribe and disconnect.

use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use tokio_stream::StreamExt as _;

use duolight_app::ports::{GattLink, NotificationStream};
use duolight_domain::error::TransportError;

use crate::error::BleError;

/// A lamp fixture reachable over BLE.
#[derive(Debug, Clone)]
pub struct BlePeripheral {
    peripheral: Peripheral,
}

impl BlePeripheral {
    #[must_use]
    pub fn new(peripheral: Peripheral) -> Self {
        Self { peripheral }
    }
}

/// Find a GATT characteristic by UUID on a peripheral that has already
/// discovered its services.
///
/// # Errors
///
/// Returns [`BleError::CharacteristicNotFound`] if no characteristic with
/// the given UUID is present.
fn find_characteristic(
    peripheral: &Peripheral,
    uuid: uuid::Uuid,
) -> Result<Characteristic, BleError> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == uuid)
        .ok_or(BleError::CharacteristicNotFound { uuid })
}

/// Acknowledged writes when the characteristic supports them.
fn write_type(properties: CharPropFlags) -> WriteType {
    if properties.contains(CharPropFlags::WRITE) {
        WriteType::WithResponse
    } else {
        WriteType::WithoutResponse
    }
}

impl GattLink for BlePeripheral {
    fn address(&self) -> String {
        self.peripheral.address().to_string()
    }

    async fn connect(&self) -> Result<(), TransportError> {
        self.peripheral.connect().await.map_err(BleError::Gatt)?;
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<uuid::Uuid>, TransportError> {
        self.peripheral
            .discover_services()
            .await
            .map_err(BleError::Gatt)?;
        Ok(self
            .peripheral
            .characteristics()
            .into_iter()
            .map(|c| c.uuid)
            .collect())
    }

    async fn subscribe(&self, characteristic: uuid::Uuid) -> Result<NotificationStream, TransportError> {
        let target = find_characteristic(&self.peripheral, characteristic)?;
        self.peripheral
            .subscribe(&target)
            .await
            .map_err(BleError::Gatt)?;

        let notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(BleError::Gatt)?;
        Ok(Box::pin(notifications.filter_map(move |notification| {
            (notification.uuid == characteristic).then_some(notification.value)
        })))
    }

    async fn write(&self, characteristic: uuid::Uuid, bytes: &[u8]) -> Result<(), TransportError> {
        let target = find_characteristic(&self.peripheral, characteristic)?;
        self.peripheral
            .write(&target, bytes, write_type(target.properties))
            .await
            .map_err(BleError::Gatt)?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.peripheral.disconnect().await.map_err(BleError::Gatt)?;
        Ok(())
    }
}
