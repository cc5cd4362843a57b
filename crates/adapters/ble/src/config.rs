//! BLE integration configuration.

use serde::Deserialize;

/// Configuration for the BLE integration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// How long each scan listens for advertisements, in seconds.
    pub scan_duration_secs: u16,
    /// Pause between scans, in seconds.
    pub rescan_interval_secs: u16,
    /// Optional MAC address allowlist (e.g. `["A4:C1:38:AA:BB:CC"]`).
    ///
    /// When empty, every fixture advertising the lamp service is bridged.
    pub device_filter: Vec<String>,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            scan_duration_secs: 10,
            rescan_interval_secs: 60,
            device_filter: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = BleConfig::default();
        assert_eq!(config.scan_duration_secs, 10);
        assert_eq!(config.rescan_interval_secs, 60);
        assert!(config.device_filter.is_empty());
    }

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let config: BleConfig = toml::from_str("scan_duration_secs = 5").unwrap();
        assert_eq!(config.scan_duration_secs, 5);
        assert_eq!(config.rescan_interval_secs, 60);
    }

    #[test]
    fn should_parse_device_filter() {
        let config: BleConfig =
            toml::from_str(r#"device_filter = ["AA:BB:CC:DD:EE:FF"]"#).unwrap();
        assert_eq!(config.device_filter, ["AA:BB:CC:DD:EE:FF"]);
    }
}
