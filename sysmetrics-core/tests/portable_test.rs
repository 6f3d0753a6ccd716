//! End-to-end run on the file-backed platform.
mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use common::{classic_live, wait_until};
use sysmetrics_core::config::ModuleConfig;
use sysmetrics_core::context::MetricsContext;
use sysmetrics_core::platform::file_backed;
use sysmetrics_core::watcher::{ChangeWatcher, WatcherState};
use sysmetrics_services::live::MemoryLiveMetrics;
use sysmetrics_services::settings::SettingsRegistry;
use sysmetrics_services::store::{MetricsStore, TomlFileStore};
use sysmetrics_theme::engine::MemoryThemeEngine;
use sysmetrics_theme::metrics::SystemMetric;
use tempfile::TempDir;

fn registry(dir: &TempDir) -> SettingsRegistry {
    let content = format!(
        "[metrics]\nallowSystemMetrics = false\n\n[timing]\nthrottle_ms = 0\nsettle_delay_ms = 0\n\n[paths]\nstore_file = {:?}\nwatch_file = {:?}\n",
        dir.path().join("store.toml"),
        dir.path().join("personalize.toml"),
    );
    SettingsRegistry::from_toml(&content).unwrap()
}

#[test]
fn test_watch_file_change_updates_store_file() {
    let dir = TempDir::new().unwrap();
    let registry = registry(&dir);
    let config = ModuleConfig::from_config(registry.get());
    assert_eq!(config.timing.throttle, Duration::ZERO);

    let engine = Arc::new(MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 19));
    let live = Arc::new(MemoryLiveMetrics::new(classic_live()));
    let platform = file_backed(&registry.get().paths, engine.clone(), live.clone()).unwrap();

    let ctx = Arc::new(MetricsContext::new(
        platform,
        registry.metrics_settings(),
        config.timing,
    ));
    let mut watcher = ChangeWatcher::start(ctx.clone()).unwrap();
    assert!(wait_until(|| watcher.state() == WatcherState::Waiting));

    fs::write(dir.path().join("personalize.toml"), "CurrentTheme = \"Aero\"\n").unwrap();
    assert!(wait_until(|| live.write_count() >= 1));
    watcher.stop();

    assert_eq!(live.current().caption_height, 19);
    let store = TomlFileStore::new(dir.path().join("store.toml"));
    assert_eq!(store.get_value("CaptionHeight").unwrap().as_deref(), Some("-285"));
    // The legacy snapshot is disabled, so nothing else was persisted.
    assert_eq!(store.get_value("BorderWidth").unwrap(), None);
}
