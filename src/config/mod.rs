//! Configuration management for the mesh MIDI node
//!
//! Loads and validates the YAML configuration file. Every section has
//! defaults, so an empty or missing file yields a working broadcast-only node.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::error::MeshError;
use crate::event::{SynthesisEvent, Wave};
use crate::voice::DEFAULT_VOICES;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Voices per synth
    pub voices: usize,
    pub log_format: LogFormat,
    pub template: TemplateConfig,
    pub mesh: MeshConfig,
    pub uart: UartConfig,
    pub ble: BleConfig,
    pub console: ConsoleConfig,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Defaults every event starts from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub wave: u8,
    pub amplitude: f32,
}

/// Mesh multicast output
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MeshConfig {
    pub enabled: bool,
    pub group: Ipv4Addr,
    pub port: u16,
    pub ttl: u32,
    /// Device id this node booted with, if it plays audio itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<u8>,
}

/// Serial MIDI input
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UartConfig {
    pub enabled: bool,
    pub path: String,
    pub poll_interval_ms: u64,
    pub read_buffer: usize,
}

/// BLE MIDI input, reached through the OS MIDI port it enumerates as
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BleConfig {
    pub enabled: bool,
    /// Case-insensitive substring of the port name
    pub port: String,
}

/// Console event monitor
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            voices: DEFAULT_VOICES,
            log_format: LogFormat::default(),
            template: TemplateConfig::default(),
            mesh: MeshConfig::default(),
            uart: UartConfig::default(),
            ble: BleConfig::default(),
            console: ConsoleConfig::default(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            wave: 0,
            amplitude: 0.0,
        }
    }
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            group: Ipv4Addr::new(232, 10, 11, 12),
            port: 3333,
            ttl: 1,
            local_id: None,
        }
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/dev/ttyAMA0".to_string(),
            poll_interval_ms: 5,
            read_buffer: 128,
        }
    }
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: "BLE".to_string(),
        }
    }
}

impl UartConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl TemplateConfig {
    /// The event every emitted event is built from
    pub fn to_event(&self) -> SynthesisEvent {
        SynthesisEvent {
            wave: Wave::Native(self.wave),
            amplitude: self.amplitude,
            ..SynthesisEvent::default()
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Load the file if it exists; `None` when there is no file at `path`
    pub async fn load_optional(path: &str) -> Result<Option<Self>> {
        if Path::new(path).exists() {
            Self::load(path).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub async fn load_or_default(path: &str) -> Result<Self> {
        match Self::load_optional(path).await? {
            Some(config) => Ok(config),
            None => {
                info!("Config file {} not found, using defaults", path);
                Ok(Self::default())
            }
        }
    }

    /// Parse and validate YAML text. An empty document yields defaults.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.voices == 0 {
            return Err(MeshError::InvalidConfig("voices must be at least 1".into()));
        }

        if self.uart.enabled {
            if self.uart.path.is_empty() {
                return Err(MeshError::InvalidConfig("uart.path cannot be empty".into()));
            }
            if self.uart.poll_interval_ms == 0 {
                return Err(MeshError::InvalidConfig(
                    "uart.poll_interval_ms must be greater than 0".into(),
                ));
            }
            if self.uart.read_buffer < 2 {
                return Err(MeshError::InvalidConfig(
                    "uart.read_buffer must hold at least 2 bytes".into(),
                ));
            }
        }

        if self.ble.enabled && self.ble.port.is_empty() {
            return Err(MeshError::InvalidConfig("ble.port cannot be empty".into()));
        }

        if !(0.0..=1.0).contains(&self.template.amplitude) {
            return Err(MeshError::InvalidConfig(format!(
                "template.amplitude {} must be within 0.0-1.0",
                self.template.amplitude
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config.voices, DEFAULT_VOICES);
        assert!(config.mesh.enabled);
        assert_eq!(config.mesh.group, Ipv4Addr::new(232, 10, 11, 12));
        assert_eq!(config.mesh.port, 3333);
        assert!(!config.uart.enabled);
        assert_eq!(config.uart.poll_interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_yaml(
            r#"
voices: 10
log_format: json
mesh:
  local_id: 2
uart:
  enabled: true
  path: /dev/ttyS1
ble:
  enabled: true
  port: "nRF"
"#,
        )
        .unwrap();

        assert_eq!(config.voices, 10);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.mesh.local_id, Some(2));
        assert_eq!(config.mesh.port, 3333);
        assert_eq!(config.uart.path, "/dev/ttyS1");
        assert_eq!(config.uart.read_buffer, 128);
        assert_eq!(config.ble.port, "nRF");
    }

    #[test]
    fn test_zero_voices_rejected() {
        let err = AppConfig::from_yaml("voices: 0").unwrap_err();
        assert!(format!("{:#}", err).contains("voices"));
    }

    #[test]
    fn test_enabled_uart_needs_interval() {
        let result = AppConfig::from_yaml("uart:\n  enabled: true\n  poll_interval_ms: 0\n");
        assert!(result.is_err());

        let result = AppConfig::from_yaml("uart:\n  enabled: false\n  poll_interval_ms: 0\n");
        assert!(result.is_ok());
    }

    #[test]
    fn test_template_event() {
        let config = AppConfig::from_yaml("template:\n  wave: 3\n  amplitude: 0.5\n").unwrap();
        let event = config.template.to_event();
        assert_eq!(event.wave, Wave::Native(3));
        assert_eq!(event.amplitude, 0.5);
    }

    #[tokio::test]
    async fn test_load_from_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("node.yaml");
        std::fs::write(&config_path, "voices: 6\nconsole:\n  enabled: true\n")?;

        let config = AppConfig::load(&config_path.to_string_lossy()).await?;
        assert_eq!(config.voices, 6);
        assert!(config.console.enabled);

        let optional = AppConfig::load_optional(&config_path.to_string_lossy()).await?;
        assert_eq!(optional.map(|c| c.voices), Some(6));

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let missing = temp_dir.path().join("absent.yaml");

        let config = AppConfig::load_or_default(&missing.to_string_lossy()).await?;
        assert_eq!(config.voices, DEFAULT_VOICES);
        assert!(AppConfig::load_optional(&missing.to_string_lossy()).await?.is_none());
        assert!(AppConfig::load(&missing.to_string_lossy()).await.is_err());

        Ok(())
    }
}
