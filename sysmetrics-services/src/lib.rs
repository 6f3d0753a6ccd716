// SPDX-License-Identifier: LGPL-3.0-only
pub mod applier;
pub mod broadcast;
pub mod error;
pub mod live;
pub mod settings;
pub mod store;
pub mod watcher;

// Re-export commonly used types
pub use applier::{ApplyReport, MetricsApplier};
pub use broadcast::{notify_metrics_changed, Broadcaster, Notification, RecordingBroadcaster};
pub use live::{LiveMetrics, MemoryLiveMetrics};
pub use settings::{Config, SettingsRegistry};
pub use store::{MemoryStore, MetricsStore, TomlFileStore, WINDOW_METRICS_PATH, WINDOW_METRICS_SECTION};
pub use watcher::{ChangeSignal, KeyWatch, ManualKeyWatch, NotifyKeyWatch, WaitOutcome, PERSONALIZE_KEY};
