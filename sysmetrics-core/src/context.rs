//! The shared state every trigger works against.
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use sysmetrics_services::broadcast::Broadcaster;
use sysmetrics_services::error::WatchError;
use sysmetrics_services::live::LiveMetrics;
use sysmetrics_services::store::MetricsStore;
use sysmetrics_services::watcher::{KeyWatch, NotifyKeyWatch};
use sysmetrics_theme::config::MetricsSettings;
use sysmetrics_theme::engine::{LegacyMetricsSource, ThemeEngine};

use crate::clock::{Clock, MonotonicClock};
use crate::config::Timing;
use crate::gate::ApplyGate;

/// Opens a fresh key watch for the change watcher.
pub type KeyWatchFactory = Arc<dyn Fn() -> Result<Box<dyn KeyWatch>, WatchError> + Send + Sync>;

/// The environment collaborators metrics are read from and written to.
#[derive(Clone)]
pub struct Platform {
    /// Visual-styles engine.
    pub engine: Arc<dyn ThemeEngine>,
    /// Legacy metrics snapshot.
    pub legacy: Arc<dyn LegacyMetricsSource>,
    /// Persistent configuration store.
    pub store: Arc<dyn MetricsStore>,
    /// Live metrics structure.
    pub live: Arc<dyn LiveMetrics>,
    /// Change notification delivery.
    pub broadcaster: Arc<dyn Broadcaster>,
    /// Source of theme-change notifications.
    pub key_watch: KeyWatchFactory,
}

impl Platform {
    /// Key watch factory backed by a file, using [NotifyKeyWatch].
    pub fn file_key_watch(file: impl Into<PathBuf>) -> KeyWatchFactory {
        let file = file.into();
        Arc::new(move || Ok(Box::new(NotifyKeyWatch::new(file.clone())) as Box<dyn KeyWatch>))
    }
}

/// Settings, collaborators and gate state for one module instance.
pub struct MetricsContext {
    settings: ArcSwap<MetricsSettings>,
    timing: Timing,
    platform: Platform,
    clock: Arc<dyn Clock>,
    gate: ApplyGate,
}

impl MetricsContext {
    /// Create a context using the monotonic system clock.
    pub fn new(platform: Platform, settings: MetricsSettings, timing: Timing) -> Self {
        Self::with_clock(platform, settings, timing, Arc::new(MonotonicClock::new()))
    }

    /// Create a context with a custom clock.
    pub fn with_clock(
        platform: Platform,
        settings: MetricsSettings,
        timing: Timing,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            timing,
            platform,
            clock,
            gate: ApplyGate::new(timing.throttle),
        }
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> MetricsSettings {
        **self.settings.load()
    }

    /// Replace the settings.
    pub fn set_settings(&self, settings: MetricsSettings) {
        self.settings.store(Arc::new(settings));
    }

    /// Timing configuration.
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Environment collaborators.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Tick source.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The apply gate.
    pub fn gate(&self) -> &ApplyGate {
        &self.gate
    }
}
