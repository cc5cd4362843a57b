/// Failures of the simulated GATT link.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VirtualLinkError {
    #[error("fixture refused the connection")]
    Refused,

    #[error("fixture is not connected")]
    NotConnected,

    #[error("fixture rejected the write")]
    Rejected,

    #[error("unknown characteristic {0}")]
    UnknownCharacteristic(uuid::Uuid),
}
