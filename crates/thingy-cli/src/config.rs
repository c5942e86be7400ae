//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use thingy_core::{DEFAULT_THROTTLE_WINDOW, Tone};

use crate::cli::ConfigKey;

/// Default scan duration per attempt, in seconds.
pub const DEFAULT_SCAN_TIMEOUT: u64 = 5;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default device name or address
    #[serde(default)]
    pub device: Option<String>,

    /// Scan duration per attempt in seconds
    #[serde(default)]
    pub scan_timeout: Option<u64>,

    /// Accelerometer throttle window for `watch`, in milliseconds
    #[serde(default)]
    pub throttle_ms: Option<u64>,

    /// Light the LED white and beep after connecting
    #[serde(default)]
    pub greet: bool,

    /// Default tone for `beep`
    #[serde(default)]
    pub tone: ToneConfig,
}

/// Tone settings. Unset fields fall back to the firmware-friendly defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToneConfig {
    /// Frequency in Hz
    #[serde(default)]
    pub frequency: Option<u16>,

    /// Duration in milliseconds
    #[serde(default)]
    pub duration: Option<u16>,

    /// Volume (0-100)
    #[serde(default)]
    pub volume: Option<u8>,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("thingy")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, or return default if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Current value of `key`, if set
    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::Device => self.device.clone(),
            ConfigKey::ScanTimeout => self.scan_timeout.map(|v| v.to_string()),
            ConfigKey::ThrottleMs => self.throttle_ms.map(|v| v.to_string()),
            ConfigKey::ToneFrequency => self.tone.frequency.map(|v| v.to_string()),
            ConfigKey::ToneDuration => self.tone.duration.map(|v| v.to_string()),
            ConfigKey::ToneVolume => self.tone.volume.map(|v| v.to_string()),
            ConfigKey::Greet => Some(self.greet.to_string()),
        }
    }

    /// Parse and store `value` under `key`
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        match key {
            ConfigKey::Device => {
                if value.trim().is_empty() {
                    bail!("Device must not be empty");
                }
                self.device = Some(value.trim().to_string());
            }
            ConfigKey::ScanTimeout => {
                let secs: u64 = parse_number(value, "scan-timeout")?;
                if secs == 0 {
                    bail!("scan-timeout must be at least 1 second");
                }
                self.scan_timeout = Some(secs);
            }
            ConfigKey::ThrottleMs => self.throttle_ms = Some(parse_number(value, "throttle-ms")?),
            ConfigKey::ToneFrequency => {
                self.tone.frequency = Some(parse_number(value, "tone-frequency")?)
            }
            ConfigKey::ToneDuration => {
                self.tone.duration = Some(parse_number(value, "tone-duration")?)
            }
            ConfigKey::ToneVolume => {
                let volume: u8 = parse_number(value, "tone-volume")?;
                if volume > 100 {
                    bail!("tone-volume must be between 0 and 100");
                }
                self.tone.volume = Some(volume);
            }
            ConfigKey::Greet => self.greet = parse_bool(value)?,
        }
        Ok(())
    }

    /// Remove the value stored under `key`
    pub fn unset(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::Device => self.device = None,
            ConfigKey::ScanTimeout => self.scan_timeout = None,
            ConfigKey::ThrottleMs => self.throttle_ms = None,
            ConfigKey::ToneFrequency => self.tone.frequency = None,
            ConfigKey::ToneDuration => self.tone.duration = None,
            ConfigKey::ToneVolume => self.tone.volume = None,
            ConfigKey::Greet => self.greet = false,
        }
    }

    /// The configured tone, with defaults for unset fields
    pub fn tone(&self) -> Tone {
        let default = Tone::default();
        Tone::new(
            self.tone.frequency.unwrap_or(default.frequency_hz),
            self.tone.duration.unwrap_or(default.duration_ms),
            self.tone.volume.unwrap_or(default.volume),
        )
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("'{}' is not a valid value for {}", value, key))
}

/// Parse boolean argument with flexible input
fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!(
            "Invalid boolean value '{}'. Use: true/false, yes/no, on/off, 1/0",
            value
        ),
    }
}

/// Resolve device from arg (or env var), then config
pub fn resolve_device(device: Option<String>, config: &Config) -> Option<String> {
    device.or_else(|| config.device.clone())
}

/// Resolve scan timeout: explicit value, then config, then default
pub fn resolve_scan_timeout(timeout: Option<u64>, config: &Config) -> u64 {
    timeout
        .or(config.scan_timeout)
        .unwrap_or(DEFAULT_SCAN_TIMEOUT)
        .max(1)
}

/// Resolve the accelerometer throttle window
pub fn resolve_throttle(throttle_ms: Option<u64>, config: &Config) -> Duration {
    throttle_ms
        .or(config.throttle_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_THROTTLE_WINDOW)
}
