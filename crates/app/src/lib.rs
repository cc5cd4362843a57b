//! # duolight-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `GattLink` — byte-oriented GATT connection to one fixture
//!   - `EventPublisher` — push attribute updates to the host
//! - Define **driving/inbound ports**:
//!   - `DiscoveryHandler` — called once per matched peripheral
//!   - `Integration` — lifecycle of a peripheral source (BLE, virtual)
//! - Run one **accessory actor** per fixture that serialises set-requests,
//!   notifications and the idle timer over a single queue
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `duolight-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod services;
