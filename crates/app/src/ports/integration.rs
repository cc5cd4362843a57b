//! Integration port — lifecycle of a peripheral source and the discovery
//! callback it reports matches through.
//!
//! An integration finds fixtures (over BLE, or simulated ones) and hands each
//! matched peripheral to the bridge as a [`GattLink`]. The bridge owns
//! everything after that.

use std::future::Future;

use duolight_domain::error::DuolightError;
use duolight_domain::id::AccessoryId;

use super::link::GattLink;

/// Platform-level discovery callback.
///
/// Called once per matched peripheral. The binary crate passes the
/// [`Bridge`](crate::services::bridge::Bridge) as the implementation.
pub trait DiscoveryHandler: Send + Sync {
    /// Register a discovered peripheral and return the accessory bridging it.
    ///
    /// A peripheral already bridged under the same address returns the
    /// existing accessory.
    fn peripheral_discovered<L: GattLink>(
        &self,
        link: L,
    ) -> impl Future<Output = Result<AccessoryId, DuolightError>> + Send;
}

/// A pluggable source of fixtures.
///
/// The binary crate calls the lifecycle methods in order:
///
/// 1. [`setup`](Self::setup) — initialise and report instant discoveries
/// 2. [`start_background`](Self::start_background) — spawn long-running scans
/// 3. [`teardown`](Self::teardown) — stop background work
pub trait Integration {
    /// Unique name identifying this integration (e.g. `"virtual"`).
    fn name(&self) -> &'static str;

    /// Fast, non-blocking initialisation.
    ///
    /// Integrations whose peripherals are known up front (virtual) report
    /// them through `ctx` here. Scanning integrations should not block.
    fn setup(
        &mut self,
        ctx: &impl DiscoveryHandler,
    ) -> impl Future<Output = Result<(), DuolightError>> + Send;

    /// Start long-running background discovery.
    ///
    /// The default implementation is a no-op.
    fn start_background(
        &mut self,
        _ctx: impl DiscoveryHandler + Clone + 'static,
    ) -> impl Future<Output = Result<(), DuolightError>> + Send {
        async { Ok(()) }
    }

    /// Called on graceful shutdown.
    fn teardown(&mut self) -> impl Future<Output = Result<(), DuolightError>> + Send;
}
