use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{capability::ProtocolExpectation, codec::HeaderLayout};

/// The firmware reads at most this many payload bytes per frame.
pub const DEVICE_MAX_DATA_SIZE: usize = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {reason}")]
    InvalidConfig { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(with = "port_serde", default)]
    pub port: PortConfig,
    /// Only consulted when detecting the port.
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub protocol: ProtocolExpectation,
    #[serde(default)]
    pub header: HeaderLayout,
    #[serde(default = "default_max_leds_per_frame")]
    pub max_leds_per_frame: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PortConfig {
    #[default]
    Detect,
    Path(PathBuf),
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_max_leds_per_frame() -> u8 {
    ((DEVICE_MAX_DATA_SIZE - 1) / 3) as u8
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: PortConfig::default(),
            manufacturer: None,
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            protocol: ProtocolExpectation::default(),
            header: HeaderLayout::default(),
            max_leds_per_frame: default_max_leds_per_frame(),
        }
    }
}

impl BridgeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

mod port_serde {
    use super::PortConfig;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub(super) fn serialize<S>(value: &PortConfig, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            PortConfig::Detect => serializer.serialize_str("detect"),
            PortConfig::Path(path_buf) => {
                serializer.serialize_str(path_buf.to_string_lossy().as_ref())
            }
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<PortConfig, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        if s == "detect" {
            Ok(PortConfig::Detect)
        } else {
            Ok(PortConfig::Path(PathBuf::from(s)))
        }
    }
}
