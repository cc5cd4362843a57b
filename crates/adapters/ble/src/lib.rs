//! # duolight-adapter-ble
//!
//! BLE adapter — finds dual-channel lamp fixtures and drives them over GATT.
//!
//! ## How it works
//!
//! A background scan looks for peripherals advertising the lamp service
//! (`0x7087`). Each match is wrapped in a [`BlePeripheral`] and reported to
//! the bridge, which owns the connection from then on.
//!
//! | Characteristic | UUID | Use |
//! |----------------|------|-----|
//! | Control | `8b00ace7-eb0b-49b0-bbe9-9aee0a26e1a3` | Command frames (write) |
//! | Notify | `0734594a-a8e7-4b1a-a6b1-cd5243059a57` | Status frames (notify) |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `duolight-app` and `duolight-domain`.

mod config;
mod error;
mod gatt;
mod scanner;

pub use config::BleConfig;
pub use error::BleError;
pub use gatt::BlePeripheral;

use tokio::task::JoinHandle;

use duolight_app::ports::{DiscoveryHandler, Integration};
use duolight_domain::error::DuolightError;

use crate::scanner::BleScanner;

/// BLE integration that bridges every matching fixture in range.
pub struct BleIntegration {
    config: BleConfig,
    scan_handle: Option<JoinHandle<()>>,
}

impl BleIntegration {
    #[must_use]
    pub fn new(config: BleConfig) -> Self {
        Self {
            config,
            scan_handle: None,
        }
    }
}

impl Integration for BleIntegration {
    fn name(&self) -> &'static str {
        "ble"
    }

    async fn setup(&mut self, _ctx: &impl DiscoveryHandler) -> Result<(), DuolightError> {
        tracing::info!(
            filter = self.config.device_filter.len(),
            "BLE integration ready"
        );
        Ok(())
    }

    async fn start_background(
        &mut self,
        ctx: impl DiscoveryHandler + Clone + 'static,
    ) -> Result<(), DuolightError> {
        self.scan_handle = Some(BleScanner::start(ctx, &self.config));
        tracing::info!(
            duration_secs = self.config.scan_duration_secs,
            interval_secs = self.config.rescan_interval_secs,
            "BLE background scan loop started"
        );
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), DuolightError> {
        if let Some(handle) = self.scan_handle.take() {
            handle.abort();
            tracing::debug!("BLE scan task aborted");
        }
        tracing::info!("BLE integration stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn should_create_integration_with_config() {
        let integration = BleIntegration::new(BleConfig::default());
        assert_eq!(integration.name(), "ble");
        assert!(integration.scan_handle.is_none());
    }

    #[tokio::test]
    async fn should_teardown_without_error_when_not_scanning() {
        let mut integration = BleIntegration::new(BleConfig::default());
        assert!(integration.teardown().await.is_ok());
    }

    #[tokio::test]
    async fn should_teardown_abort_background_task() {
        let mut integration = BleIntegration::new(BleConfig::default());
        integration.scan_handle = Some(tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }));

        integration.teardown().await.unwrap();
        assert!(integration.scan_handle.is_none());
    }
}
