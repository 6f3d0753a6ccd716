use std::time::Duration;

use sysmetrics_services::broadcast::BROADCAST_TIMEOUT;
use sysmetrics_services::settings::{Config, TimingSettings};

/// Name of the primary shell process.
pub const PRIMARY_PROCESS: &str = "explorer.exe";

/// Timing Configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Minimum time between two successful applications.
    pub throttle: Duration,
    /// Wait after a detected change before re-reading metrics, so the
    /// environment can finish switching themes.
    pub settle_delay: Duration,
    /// Per-notification broadcast timeout.
    pub broadcast_timeout: Duration,
}

impl Timing {
    /// Default throttle window.
    pub const THROTTLE: Duration = Duration::from_millis(5000);
    /// Default settle delay.
    pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);

    /// Defaults with any configured overrides applied.
    pub fn with_overrides(overrides: &TimingSettings) -> Self {
        let defaults = Self::default();
        Self {
            throttle: overrides.throttle().unwrap_or(defaults.throttle),
            settle_delay: overrides.settle_delay().unwrap_or(defaults.settle_delay),
            broadcast_timeout: overrides
                .broadcast_timeout()
                .unwrap_or(defaults.broadcast_timeout),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            throttle: Self::THROTTLE,
            settle_delay: Self::SETTLE_DELAY,
            broadcast_timeout: BROADCAST_TIMEOUT,
        }
    }
}

/// Module configuration.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// Timing Configuration.
    pub timing: Timing,
    /// Image name of the process that owns the hook and the watcher.
    pub primary_process: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            primary_process: PRIMARY_PROCESS.to_string(),
        }
    }
}

impl ModuleConfig {
    /// Defaults with the timing overrides of a loaded [Config].
    pub fn from_config(config: &Config) -> Self {
        Self {
            timing: Timing::with_overrides(&config.timing),
            ..Self::default()
        }
    }

    /// Whether `image_name` (a bare name or a full path) is the primary process.
    pub fn is_primary_process(&self, image_name: &str) -> bool {
        let file_name = image_name
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(image_name);
        file_name.eq_ignore_ascii_case(&self.primary_process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing() {
        let timing = Timing::default();
        assert_eq!(timing.throttle, Duration::from_millis(5000));
        assert_eq!(timing.settle_delay, Duration::from_millis(1000));
        assert_eq!(timing.broadcast_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_overrides() {
        let timing = Timing::with_overrides(&TimingSettings {
            settle_delay_ms: Some(0),
            ..Default::default()
        });
        assert_eq!(timing.settle_delay, Duration::ZERO);
        assert_eq!(timing.throttle, Timing::THROTTLE);
    }

    #[test]
    fn test_from_config() {
        let registry =
            sysmetrics_services::settings::SettingsRegistry::from_toml("[timing]\nthrottle_ms = 250\n")
                .unwrap();
        let module = ModuleConfig::from_config(registry.get());
        assert_eq!(module.timing.throttle, Duration::from_millis(250));
        assert_eq!(module.primary_process, PRIMARY_PROCESS);
    }

    #[test]
    fn test_primary_process_match() {
        let config = ModuleConfig::default();
        assert!(config.is_primary_process(r"C:\Windows\Explorer.EXE"));
        assert!(config.is_primary_process("explorer.exe"));
        assert!(!config.is_primary_process(r"C:\Windows\System32\notepad.exe"));
        assert!(!config.is_primary_process(r"C:\explorer.exe\notepad.exe"));
    }
}
