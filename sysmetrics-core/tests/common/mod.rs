//! Shared fixture for the core integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sysmetrics_core::clock::ManualClock;
use sysmetrics_core::config::Timing;
use sysmetrics_core::context::{KeyWatchFactory, MetricsContext, Platform};
use sysmetrics_services::broadcast::RecordingBroadcaster;
use sysmetrics_services::error::WatchError;
use sysmetrics_services::live::MemoryLiveMetrics;
use sysmetrics_services::store::MemoryStore;
use sysmetrics_services::watcher::{KeyWatch, ManualKeyTrigger, ManualKeyWatch};
use sysmetrics_theme::config::MetricsSettings;
use sysmetrics_theme::engine::MemoryThemeEngine;
use sysmetrics_theme::metrics::{NonClientMetrics, SystemMetric};

pub const THROTTLE: Duration = Duration::from_millis(5000);

pub fn classic_live() -> NonClientMetrics {
    NonClientMetrics {
        border_width: 4,
        scroll_width: 17,
        scroll_height: 17,
        caption_width: 36,
        caption_height: 22,
        sm_caption_width: 22,
        sm_caption_height: 22,
        menu_width: 19,
        menu_height: 20,
        padded_border_width: 4,
    }
}

pub struct Fixture {
    pub engine: Arc<MemoryThemeEngine>,
    pub live: Arc<MemoryLiveMetrics>,
    pub store: Arc<MemoryStore>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub clock: Arc<ManualClock>,
    pub trigger: ManualKeyTrigger,
    pub platform: Platform,
}

impl Fixture {
    pub fn new() -> Self {
        let engine = Arc::new(MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 19));
        let live = Arc::new(MemoryLiveMetrics::new(classic_live()));
        let store = Arc::new(MemoryStore::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let clock = Arc::new(ManualClock::new(100_000));

        let (watch, trigger) = ManualKeyWatch::new();
        let watch = Mutex::new(Some(watch));
        let key_watch: KeyWatchFactory = Arc::new(move || match watch.lock().unwrap().take() {
            Some(watch) => Ok(Box::new(watch) as Box<dyn KeyWatch>),
            None => Err(WatchError::register("manual", "already opened")),
        });

        let platform = Platform {
            engine: engine.clone(),
            legacy: live.clone(),
            store: store.clone(),
            live: live.clone(),
            broadcaster: broadcaster.clone(),
            key_watch,
        };

        Self {
            engine,
            live,
            store,
            broadcaster,
            clock,
            trigger,
            platform,
        }
    }

    pub fn timing(throttle: Duration) -> Timing {
        Timing {
            throttle,
            settle_delay: Duration::ZERO,
            ..Timing::default()
        }
    }

    pub fn context(&self, settings: MetricsSettings, throttle: Duration) -> Arc<MetricsContext> {
        Arc::new(MetricsContext::with_clock(
            self.platform.clone(),
            settings,
            Self::timing(throttle),
            self.clock.clone(),
        ))
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
