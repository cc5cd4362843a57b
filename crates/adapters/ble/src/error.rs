//! BLE adapter error types.

/// Errors specific to the BLE adapter.
///
/// Crosses the port boundary boxed as a
/// [`TransportError`](duolight_domain::error::TransportError).
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// Scan or adapter operation failed.
    #[error("BLE scan error")]
    Scan(#[from] btleplug::Error),

    /// A GATT operation on a connected peripheral failed.
    #[error("GATT operation failed")]
    Gatt(#[source] btleplug::Error),

    /// The peripheral does not expose the characteristic.
    #[error("characteristic {uuid} not found")]
    CharacteristicNotFound { uuid: uuid::Uuid },
}
