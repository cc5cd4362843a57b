//! # duolight-adapter-virtual
//!
//! Virtual integration that bridges simulated lamp fixtures, for demos and
//! end-to-end testing without a Bluetooth radio.
//!
//! ## Simulated firmware
//!
//! | Command | Behaviour |
//! |---------|-----------|
//! | Status request | Notifies the channel's status frame |
//! | Power on | Switches the channel on and the other one off, notifies both |
//! | Power off | Switches the channel off |
//! | Brightness | Stores the channel brightness |
//! | RGB | Stores the color channel's RGB value |
//!
//! Connection refusal, write rejection, a missing notify characteristic and
//! link loss can be injected on each [`VirtualLamp`].
//!
//! ## Dependency rule
//!
//! Depends on `duolight-app` (port traits) and `duolight-domain` only.

mod error;
mod firmware;
mod lamp;

pub use error::VirtualLinkError;
pub use firmware::{ChannelState, Firmware};
pub use lamp::VirtualLamp;

use duolight_app::ports::{DiscoveryHandler, Integration};
use duolight_domain::error::DuolightError;

/// Address of the fixture registered when none is configured.
pub const DEFAULT_ADDRESS: &str = "00:00:00:00:D0:01";

/// Virtual integration that registers its fixtures at setup.
pub struct VirtualIntegration {
    fixtures: Vec<VirtualLamp>,
}

impl Default for VirtualIntegration {
    fn default() -> Self {
        Self {
            fixtures: vec![VirtualLamp::new(DEFAULT_ADDRESS)],
        }
    }
}

impl VirtualIntegration {
    /// One fixture per address, or the default fixture when none is given.
    #[must_use]
    pub fn with_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fixtures: Vec<_> = addresses.into_iter().map(VirtualLamp::new).collect();
        if fixtures.is_empty() {
            return Self::default();
        }
        Self { fixtures }
    }

    /// The simulated fixtures, sharing state with the bridged links.
    #[must_use]
    pub fn fixtures(&self) -> &[VirtualLamp] {
        &self.fixtures
    }
}

impl Integration for VirtualIntegration {
    fn name(&self) -> &'static str {
        "virtual"
    }

    async fn setup(&mut self, ctx: &impl DiscoveryHandler) -> Result<(), DuolightError> {
        for fixture in &self.fixtures {
            ctx.peripheral_discovered(fixture.clone()).await?;
        }
        tracing::info!(count = self.fixtures.len(), "virtual fixtures registered");
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), DuolightError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use duolight_app::ports::GattLink;
    use duolight_domain::id::AccessoryId;

    use super::*;

    #[derive(Default)]
    struct RecordingHandler {
        addresses: Mutex<Vec<String>>,
    }

    impl DiscoveryHandler for RecordingHandler {
        async fn peripheral_discovered<L: GattLink>(
            &self,
            link: L,
        ) -> Result<AccessoryId, DuolightError> {
            let address = link.address();
            self.addresses.lock().unwrap().push(address.clone());
            Ok(AccessoryId::from_address(&address))
        }
    }

    #[tokio::test]
    async fn should_register_default_fixture() {
        let mut integration = VirtualIntegration::default();
        let handler = RecordingHandler::default();

        integration.setup(&handler).await.unwrap();

        assert_eq!(*handler.addresses.lock().unwrap(), [DEFAULT_ADDRESS]);
    }

    #[tokio::test]
    async fn should_register_one_fixture_per_address() {
        let mut integration =
            VirtualIntegration::with_addresses(["00:00:00:00:D0:0A", "00:00:00:00:D0:0B"]);
        let handler = RecordingHandler::default();

        integration.setup(&handler).await.unwrap();

        assert_eq!(
            *handler.addresses.lock().unwrap(),
            ["00:00:00:00:D0:0A", "00:00:00:00:D0:0B"]
        );
    }

    #[test]
    fn should_fall_back_to_default_fixture_without_addresses() {
        let integration = VirtualIntegration::with_addresses(Vec::<String>::new());

        assert_eq!(integration.fixtures().len(), 1);
        assert_eq!(integration.fixtures()[0].address(), DEFAULT_ADDRESS);
    }

    #[test]
    fn should_return_virtual_as_name() {
        assert_eq!(VirtualIntegration::default().name(), "virtual");
    }
}
