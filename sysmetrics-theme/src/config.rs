//! # Metric Settings
//!
//! The three switches that control metric loading, and the
//! [SettingsProvider] seam through which they are read.
//!
//! ## Sources
//!
//! Settings normally come from the host plugin framework, but can also be
//! read from a TOML document or overridden through environment variables:
//!
//! ```toml
//! [metrics]
//! loadThemeMetrics = true
//! useThemeMetrics = true
//! allowSystemMetrics = false
//! ```
//!
//! ```bash
//! export SYSMETRICS_ALLOW_SYSTEM_METRICS=0
//! ```

use std::env;

use serde::Deserialize;

/// Anything able to answer named boolean setting lookups.
pub trait SettingsProvider {
    /// Value of a boolean setting, `None` when the provider does not know it.
    fn get_setting(&self, name: &str) -> Option<bool>;
}

/// Switches controlling metric loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSettings {
    /// Master enable.
    pub load_theme_metrics: bool,
    /// Query the theme engine before the legacy snapshot.
    pub use_theme_metrics: bool,
    /// Allow the legacy snapshot as a source.
    pub allow_system_metrics: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            load_theme_metrics: true,
            use_theme_metrics: true,
            allow_system_metrics: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MetricsDocument {
    #[serde(default)]
    metrics: PartialSettings,
}

/// Settings where each switch may be absent, used when merging layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSettings {
    /// See [MetricsSettings::load_theme_metrics].
    pub load_theme_metrics: Option<bool>,
    /// See [MetricsSettings::use_theme_metrics].
    pub use_theme_metrics: Option<bool>,
    /// See [MetricsSettings::allow_system_metrics].
    pub allow_system_metrics: Option<bool>,
}

impl PartialSettings {
    /// Parse the `[metrics]` table of a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let document: MetricsDocument = toml::from_str(content)?;
        Ok(document.metrics)
    }

    /// Overlay `other` onto `self`; values present in `other` win.
    pub fn merge(&mut self, other: PartialSettings) {
        if other.load_theme_metrics.is_some() {
            self.load_theme_metrics = other.load_theme_metrics;
        }
        if other.use_theme_metrics.is_some() {
            self.use_theme_metrics = other.use_theme_metrics;
        }
        if other.allow_system_metrics.is_some() {
            self.allow_system_metrics = other.allow_system_metrics;
        }
    }

    /// Look a switch up by its setting name.
    pub fn get(&self, name: &str) -> Option<bool> {
        match name {
            MetricsSettings::LOAD_THEME_METRICS => self.load_theme_metrics,
            MetricsSettings::USE_THEME_METRICS => self.use_theme_metrics,
            MetricsSettings::ALLOW_SYSTEM_METRICS => self.allow_system_metrics,
            _ => None,
        }
    }
}

impl SettingsProvider for PartialSettings {
    fn get_setting(&self, name: &str) -> Option<bool> {
        self.get(name)
    }
}

impl MetricsSettings {
    /// Setting name of the master enable.
    pub const LOAD_THEME_METRICS: &'static str = "loadThemeMetrics";
    /// Setting name of the theme preference.
    pub const USE_THEME_METRICS: &'static str = "useThemeMetrics";
    /// Setting name of the legacy fallback switch.
    pub const ALLOW_SYSTEM_METRICS: &'static str = "allowSystemMetrics";

    /// Read all three switches from a provider; unknown ones default to `true`.
    pub fn load<P: SettingsProvider + ?Sized>(provider: &P) -> Self {
        let defaults = Self::default();
        let settings = Self {
            load_theme_metrics: provider
                .get_setting(Self::LOAD_THEME_METRICS)
                .unwrap_or(defaults.load_theme_metrics),
            use_theme_metrics: provider
                .get_setting(Self::USE_THEME_METRICS)
                .unwrap_or(defaults.use_theme_metrics),
            allow_system_metrics: provider
                .get_setting(Self::ALLOW_SYSTEM_METRICS)
                .unwrap_or(defaults.allow_system_metrics),
        };
        log::info!(
            "Loaded settings: loadThemeMetrics={}, useThemeMetrics={}, allowSystemMetrics={}",
            settings.load_theme_metrics,
            settings.use_theme_metrics,
            settings.allow_system_metrics
        );
        settings
    }

    /// Apply `SYSMETRICS_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        let overrides = [
            ("SYSMETRICS_LOAD_THEME_METRICS", &mut self.load_theme_metrics),
            ("SYSMETRICS_USE_THEME_METRICS", &mut self.use_theme_metrics),
            ("SYSMETRICS_ALLOW_SYSTEM_METRICS", &mut self.allow_system_metrics),
        ];
        for (var, field) in overrides {
            if let Ok(raw) = env::var(var) {
                match parse_flag(&raw) {
                    Some(value) => *field = value,
                    None => log::warn!("Ignoring {}={:?}: expected a boolean", var, raw),
                }
            }
        }
        self
    }

    /// Whether at least one metric source is enabled.
    pub fn any_source_enabled(&self) -> bool {
        self.use_theme_metrics || self.allow_system_metrics
    }

    /// Whether hooks and the watcher should run (and startup should apply).
    pub fn wants_theme_tracking(&self) -> bool {
        self.load_theme_metrics && self.use_theme_metrics
    }
}

impl From<PartialSettings> for MetricsSettings {
    fn from(partial: PartialSettings) -> Self {
        Self::load(&partial)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
