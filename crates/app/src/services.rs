//! Application services — use-case implementations.
//!
//! Services are generic over port traits (constructor injection), keeping
//! this layer decoupled from concrete transports.

pub mod accessory;
pub mod attribute;
pub mod bridge;
pub mod connection;
