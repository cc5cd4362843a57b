//! BLE scanner — finds lamp fixtures and hands them to the bridge.
//!
//! [`BleScanner`] scans for the lamp service, applies the MAC allowlist and
//! reports each new peripheral once through the [`DiscoveryHandler`]. Scans
//! repeat so fixtures powered on later are picked up.

use std::collections::HashSet;
use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;

use duolight_app::ports::DiscoveryHandler;
use duolight_domain::protocol::SERVICE_UUID;

use crate::config::BleConfig;
use crate::error::BleError;
use crate::gatt::BlePeripheral;

/// Check whether `mac` passes the allowlist (an empty list accepts all).
fn passes_filter(filter: &[String], mac: &str) -> bool {
    filter.is_empty() || filter.iter().any(|f| f.eq_ignore_ascii_case(mac))
}

pub struct BleScanner<H> {
    handler: H,
    scan_duration: Duration,
    interval: Duration,
    device_filter: Vec<String>,
    seen: HashSet<String>,
}

impl<H: DiscoveryHandler + Clone + 'static> BleScanner<H> {
    /// Spawn the scan loop.
    pub fn start(handler: H, config: &BleConfig) -> JoinHandle<()> {
        let scanner = Self {
            handler,
            scan_duration: Duration::from_secs(u64::from(config.scan_duration_secs)),
            interval: Duration::from_secs(u64::from(config.rescan_interval_secs)),
            device_filter: config.device_filter.clone(),
            seen: HashSet::new(),
        };

        tokio::spawn(scanner.run())
    }

    async fn run(mut self) {
        loop {
            if let Err(err) = self.iterate().await {
                tracing::warn!(%err, "BLE scan failed, retrying next interval");
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Run a single scan for the configured duration.
    ///
    /// # Errors
    ///
    /// Returns [`BleError`] when the BLE adapter is unavailable or the scan
    /// cannot be started.
    async fn iterate(&mut self) -> Result<(), BleError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let central = adapters.into_iter().next().ok_or(BleError::NotAvailable)?;

        let mut events = central.events().await?;

        central
            .start_scan(ScanFilter {
                services: vec![SERVICE_UUID],
            })
            .await?;
        tracing::debug!(duration = ?self.scan_duration, "BLE scan started");

        let deadline = tokio::time::Instant::now() + self.scan_duration;

        while tokio::time::Instant::now() < deadline {
            let remaining = deadline - tokio::time::Instant::now();
            match tokio::time::timeout(remaining, events.next()).await {
                Ok(Some(
                    CentralEvent::DeviceDiscovered(id)
                    | CentralEvent::ServicesAdvertisement { id, .. },
                )) => self.consider(&central, &id).await,
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }

        central.stop_scan().await?;
        Ok(())
    }

    async fn consider(&mut self, central: &Adapter, id: &PeripheralId) {
        let Ok(peripheral) = central.peripheral(id).await else {
            return;
        };
        let Ok(Some(props)) = peripheral.properties().await else {
            return;
        };

        if !props.services.contains(&SERVICE_UUID) {
            return;
        }

        let mac = props.address.to_string();
        if !passes_filter(&self.device_filter, &mac) {
            tracing::debug!(%mac, "filtered out by device_filter");
            return;
        }
        if !self.seen.insert(mac.clone()) {
            return;
        }

        tracing::debug!(%mac, name = ?props.local_name, "lamp fixture detected");
        match self
            .handler
            .peripheral_discovered(BlePeripheral::new(peripheral))
            .await
        {
            Ok(accessory) => tracing::debug!(%mac, %accessory, "fixture bridged"),
            Err(err) => {
                tracing::warn!(%err, %mac, "failed to bridge fixture");
                self.seen.remove(&mac);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_all_when_filter_is_empty() {
        assert!(passes_filter(&[], "C4:7C:8D:6A:12:34"));
        assert!(passes_filter(&[], "AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn should_accept_only_listed_mac() {
        let filter = vec!["C4:7C:8D:6A:12:34".to_owned()];
        assert!(passes_filter(&filter, "C4:7C:8D:6A:12:34"));
        assert!(!passes_filter(&filter, "AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn should_match_filter_case_insensitively() {
        let filter = vec!["c4:7c:8d:6a:12:34".to_owned()];
        assert!(passes_filter(&filter, "C4:7C:8D:6A:12:34"));
    }
}
