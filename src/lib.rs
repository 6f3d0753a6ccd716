#![warn(missing_docs)]

//! Restore legacy window metrics from the active visual theme.
//!
//! When a visual theme is active, the window manager keeps using the legacy
//! non-client metrics the user had before. sysmetrics reads the theme's own
//! sizes, persists them in native units and pushes them into the live
//! metrics, then tells running applications about the change.

pub use sysmetrics_core as core;
pub use sysmetrics_services as services;
pub use sysmetrics_theme as theme;

/// A "prelude" for users of sysmetrics.
///
/// Importing this module brings into scope the most common types needed to
/// host the module or run a single pass.
///
/// ```rust
/// use sysmetrics::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::config::{ModuleConfig, Timing};
    pub use crate::core::host::{Host, HOOK_TARGET};
    pub use crate::core::{apply_theme_metrics, try_apply_theme_metrics};
    pub use crate::core::{MetricsContext, MetricsModule, Platform};

    pub use crate::services::{
        Broadcaster, LiveMetrics, MetricsStore, SettingsRegistry,
    };

    pub use crate::theme::config::{MetricsSettings, SettingsProvider};
    pub use crate::theme::engine::{LegacyMetricsSource, ThemeEngine};
    pub use crate::theme::{MetricKind, MetricSet, NonClientMetrics};
}
