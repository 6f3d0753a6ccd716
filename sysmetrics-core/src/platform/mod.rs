//! Ready-made [Platform] assemblies.
//!
//! [native](win32::native) wires up the real platform APIs and needs the
//! `windows-backend` feature. [file_backed] keeps the store and the watched
//! key in plain files, for running and testing off Windows.

#[cfg(all(windows, feature = "windows-backend"))]
pub mod win32;

use std::sync::Arc;

use anyhow::{Context, Result};
use sysmetrics_services::broadcast::{Broadcaster, RecordingBroadcaster};
use sysmetrics_services::live::MemoryLiveMetrics;
use sysmetrics_services::settings::PathSettings;
use sysmetrics_services::store::TomlFileStore;
use sysmetrics_theme::engine::ThemeEngine;

use crate::context::Platform;

/// A platform persisting metrics to the configured store file and watching
/// the configured watch file.
///
/// Live metrics are kept in `live`, which also serves the legacy snapshot.
/// Broadcasts are only recorded.
pub fn file_backed(
    paths: &PathSettings,
    engine: Arc<dyn ThemeEngine>,
    live: Arc<MemoryLiveMetrics>,
) -> Result<Platform> {
    let store_file = paths
        .store_file
        .clone()
        .context("paths.store_file is not configured")?;
    let watch_file = paths
        .watch_file
        .clone()
        .context("paths.watch_file is not configured")?;

    let broadcaster: Arc<dyn Broadcaster> = Arc::new(RecordingBroadcaster::new());
    Ok(Platform {
        engine,
        legacy: live.clone(),
        store: Arc::new(TomlFileStore::new(store_file)),
        live,
        broadcaster,
        key_watch: Platform::file_key_watch(watch_file),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysmetrics_theme::engine::MemoryThemeEngine;

    #[test]
    fn test_file_backed_requires_paths() {
        let engine = Arc::new(MemoryThemeEngine::new("Aero"));
        let live = Arc::new(MemoryLiveMetrics::default());
        let result = file_backed(&PathSettings::default(), engine, live);
        assert!(result.is_err());
    }
}
