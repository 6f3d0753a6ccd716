// SPDX-License-Identifier: LGPL-3.0-only
use anyhow::Result;
use serde::Deserialize;
use smol::fs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysmetrics_theme::config::{MetricsSettings, PartialSettings, SettingsProvider};
use xdg::BaseDirectories;

/// File name looked up in every configuration directory.
pub const CONFIG_FILE: &str = "sysmetrics.toml";

/// The main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Metric loading switches
    #[serde(default)]
    pub metrics: PartialSettings,
    /// Timing overrides
    #[serde(default)]
    pub timing: TimingSettings,
    /// Locations used by the portable backend
    #[serde(default)]
    pub paths: PathSettings,
    /// Any other sections are captured here
    #[serde(flatten)]
    pub other: HashMap<String, toml::Value>,
}

/// Timing overrides, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TimingSettings {
    pub throttle_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub broadcast_timeout_ms: Option<u64>,
}

impl TimingSettings {
    /// Throttle window, if overridden.
    pub fn throttle(&self) -> Option<Duration> {
        self.throttle_ms.map(Duration::from_millis)
    }

    /// Settle delay, if overridden.
    pub fn settle_delay(&self) -> Option<Duration> {
        self.settle_delay_ms.map(Duration::from_millis)
    }

    /// Broadcast timeout, if overridden.
    pub fn broadcast_timeout(&self) -> Option<Duration> {
        self.broadcast_timeout_ms.map(Duration::from_millis)
    }
}

/// File locations for the portable store and key watch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PathSettings {
    pub store_file: Option<PathBuf>,
    pub watch_file: Option<PathBuf>,
}

/// Registry for managing sysmetrics settings.
pub struct SettingsRegistry {
    config: Config,
}

impl SettingsRegistry {
    /// Create a new SettingsRegistry and load configuration from standard locations.
    pub async fn new() -> Result<Self> {
        let mut registry = Self::empty();
        registry.load().await?;
        Ok(registry)
    }

    /// A registry holding no configuration; every lookup falls back to defaults.
    pub fn empty() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Build a registry from an in-memory TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(Self { config })
    }

    /// Load configuration from standard locations in precedence order.
    ///
    /// Order (later overrides earlier):
    /// 1. System Data: /usr/share/sysmetrics/sysmetrics.toml (and XDG_DATA_DIRS)
    /// 2. System Config: /etc/xdg/sysmetrics/sysmetrics.toml (and XDG_CONFIG_DIRS)
    /// 3. User Config: ~/.config/sysmetrics/sysmetrics.toml (XDG_CONFIG_HOME)
    pub async fn load(&mut self) -> Result<()> {
        let xdg_dirs = BaseDirectories::with_prefix("sysmetrics")?;

        // 1. Load from system data directories
        for path in xdg_dirs.find_data_files(CONFIG_FILE).rev() {
            self.load_file(&path).await;
        }

        // 2. Load from system config directories
        for path in xdg_dirs.find_config_files(CONFIG_FILE).rev() {
            self.load_file(&path).await;
        }

        // 3. Load from user config directory
        let user_config_path = xdg_dirs.get_config_home().join(CONFIG_FILE);
        if user_config_path.exists() {
            self.load_file(&user_config_path).await;
        }

        Ok(())
    }

    async fn load_file(&mut self, path: &Path) {
        log::info!("Loading config from: {:?}", path);
        match fs::read_to_string(path).await {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(loaded_config) => {
                    self.merge(loaded_config);
                },
                Err(e) => {
                    log::error!("Failed to parse config file {:?}: {}", path, e);
                },
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
            },
        }
    }

    /// Merge a loaded config into the current config.
    fn merge(&mut self, other: Config) {
        self.config.metrics.merge(other.metrics);

        let timing = &mut self.config.timing;
        if other.timing.throttle_ms.is_some() {
            timing.throttle_ms = other.timing.throttle_ms;
        }
        if other.timing.settle_delay_ms.is_some() {
            timing.settle_delay_ms = other.timing.settle_delay_ms;
        }
        if other.timing.broadcast_timeout_ms.is_some() {
            timing.broadcast_timeout_ms = other.timing.broadcast_timeout_ms;
        }

        if other.paths.store_file.is_some() {
            self.config.paths.store_file = other.paths.store_file;
        }
        if other.paths.watch_file.is_some() {
            self.config.paths.watch_file = other.paths.watch_file;
        }

        self.config.other.extend(other.other);
    }

    /// Get the current configuration.
    pub fn get(&self) -> &Config {
        &self.config
    }

    /// The resolved metric switches, including environment overrides.
    pub fn metrics_settings(&self) -> MetricsSettings {
        MetricsSettings::load(self).with_env_overrides()
    }

    /// Load configuration from multiple custom paths asynchronously.
    pub async fn load_from_paths_async(&mut self, paths: Vec<PathBuf>) -> Vec<anyhow::Result<()>> {
        let mut results = Vec::new();

        for path in paths {
            let result = async {
                let content = fs::read_to_string(&path)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;

                let loaded_config: Config = toml::from_str(&content)
                    .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", path, e))?;

                self.merge(loaded_config);
                Ok(())
            }
            .await;

            results.push(result);
        }

        results
    }
}

impl SettingsProvider for SettingsRegistry {
    fn get_setting(&self, name: &str) -> Option<bool> {
        self.config.metrics.get(name)
    }
}
