//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`DuolightError`] via `#[from]` at the port boundary.

/// Boxed error produced by a transport implementation (BLE stack, simulator).
///
/// The core never inspects it beyond `Display`; adapters box their own error
/// types into it.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Root error type shared by the application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum DuolightError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("connection error")]
    Connection(#[from] ConnectionError),

    /// The accessory task that owns the lamp is no longer running.
    #[error("accessory {0} is unavailable")]
    Unavailable(String),
}

/// A value or identifier failed a domain invariant.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{attribute} must be within 0..={max}, got {value}")]
    OutOfRange {
        attribute: &'static str,
        max: u16,
        value: i64,
    },

    #[error("{attribute} expects a {expected} value")]
    WrongType {
        attribute: &'static str,
        expected: &'static str,
    },

    #[error("unknown attribute {0:?}")]
    UnknownAttribute(String),

    #[error("invalid accessory id {0:?}")]
    InvalidId(String),
}

/// A lookup by identifier found nothing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Failures of the peripheral connection lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// A write or connect was attempted before any peripheral was attached.
    #[error("no peripheral attached")]
    NoPeripheral,

    /// The transport refused or dropped the connection attempt.
    #[error("failed to connect to peripheral")]
    Connect(#[source] TransportError),

    /// Service/characteristic enumeration failed.
    #[error("characteristic discovery failed")]
    Discovery(#[source] TransportError),

    /// Discovery completed but a required characteristic is absent; `true`
    /// marks each missing one.
    #[error("required characteristics missing (control: {control}, notify: {notify})")]
    MissingCharacteristics { control: bool, notify: bool },

    /// Subscribing to the notify characteristic failed.
    #[error("failed to subscribe to notifications")]
    Subscribe(#[source] TransportError),

    /// The transport write failed.
    #[error("failed to write command")]
    Write(#[source] TransportError),
}
