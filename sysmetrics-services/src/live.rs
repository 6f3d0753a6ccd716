// SPDX-License-Identifier: LGPL-3.0-only
//! Access to the live non-client metrics structure used by the window manager.

use crate::error::LiveMetricsError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use sysmetrics_theme::engine::LegacyMetricsSource;
use sysmetrics_theme::error::SourceError;
use sysmetrics_theme::metrics::NonClientMetrics;

/// The in-memory metrics structure consumed by the windowing subsystem.
pub trait LiveMetrics: Send + Sync {
    /// Read the current structure.
    fn read(&self) -> Result<NonClientMetrics, LiveMetricsError>;

    /// Write the structure back, updating the user profile and broadcasting
    /// the change as part of the write.
    fn write(&self, metrics: &NonClientMetrics) -> Result<(), LiveMetricsError>;
}

/// A live metrics structure held in memory.
///
/// Also serves as the legacy snapshot source, the way the platform reads both
/// from the same system call.
#[derive(Debug, Default)]
pub struct MemoryLiveMetrics {
    inner: Mutex<MemoryLiveState>,
}

#[derive(Debug, Default)]
struct MemoryLiveState {
    metrics: NonClientMetrics,
    writes: usize,
    fail_read: bool,
    fail_write: bool,
}

impl MemoryLiveMetrics {
    /// Create a structure holding `metrics`.
    pub fn new(metrics: NonClientMetrics) -> Self {
        Self {
            inner: Mutex::new(MemoryLiveState {
                metrics,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryLiveState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current contents.
    pub fn current(&self) -> NonClientMetrics {
        self.state().metrics
    }

    /// Replace the contents without counting a write.
    pub fn replace(&self, metrics: NonClientMetrics) {
        self.state().metrics = metrics;
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Make reads fail.
    pub fn fail_read(&self, fail: bool) {
        self.state().fail_read = fail;
    }

    /// Make writes fail.
    pub fn fail_write(&self, fail: bool) {
        self.state().fail_write = fail;
    }
}

impl LiveMetrics for MemoryLiveMetrics {
    fn read(&self) -> Result<NonClientMetrics, LiveMetricsError> {
        let state = self.state();
        if state.fail_read {
            return Err(LiveMetricsError::ReadFailed { code: 1 });
        }
        Ok(state.metrics)
    }

    fn write(&self, metrics: &NonClientMetrics) -> Result<(), LiveMetricsError> {
        let mut state = self.state();
        if state.fail_write {
            return Err(LiveMetricsError::WriteFailed { code: 1 });
        }
        state.metrics = *metrics;
        state.writes += 1;
        Ok(())
    }
}

impl LegacyMetricsSource for MemoryLiveMetrics {
    fn snapshot(&self) -> Result<NonClientMetrics, SourceError> {
        self.read()
            .map_err(|e| match e {
                LiveMetricsError::ReadFailed { code } | LiveMetricsError::WriteFailed { code } => {
                    SourceError::snapshot(code)
                },
            })
    }
}
