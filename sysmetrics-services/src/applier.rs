// SPDX-License-Identifier: LGPL-3.0-only
//! Writes a resolved [MetricSet] into the persistent store and the live
//! metrics structure.
//!
//! The two writes are independent: a failure on one side is logged and does
//! not prevent the other, and nothing is rolled back.

use crate::error::{ApplyError, LiveMetricsError, StoreError};
use crate::live::LiveMetrics;
use crate::store::MetricsStore;
use sysmetrics_theme::metrics::{MetricKind, MetricSet};

/// What an apply pass managed to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Store keys written, in key order.
    pub written_keys: Vec<MetricKind>,
    /// Whether the live structure was written back.
    pub live_updated: bool,
}

/// Applies metrics to a store and a live structure.
pub struct MetricsApplier<'a> {
    store: &'a dyn MetricsStore,
    live: &'a dyn LiveMetrics,
}

impl<'a> MetricsApplier<'a> {
    /// Create an applier over the two targets.
    pub fn new(store: &'a dyn MetricsStore, live: &'a dyn LiveMetrics) -> Self {
        Self { store, live }
    }

    /// Apply every resolved metric of `metrics`.
    ///
    /// Succeeds when at least one store entry or the live structure was
    /// written.
    pub fn apply(&self, metrics: &MetricSet) -> Result<ApplyReport, ApplyError> {
        let store = self.write_store(metrics);
        let live = self.write_live(metrics);

        match (store, live) {
            (Ok(written_keys), Ok(())) => Ok(ApplyReport {
                written_keys,
                live_updated: true,
            }),
            (Ok(written_keys), Err(_)) if !written_keys.is_empty() => Ok(ApplyReport {
                written_keys,
                live_updated: false,
            }),
            (Err(_), Ok(())) => Ok(ApplyReport {
                written_keys: Vec::new(),
                live_updated: true,
            }),
            (Ok(_), Err(live)) => Err(ApplyError::LiveFailed(live)),
            (Err(store), Err(live)) => Err(ApplyError::BothFailed { store, live }),
        }
    }

    fn write_store(&self, metrics: &MetricSet) -> Result<Vec<MetricKind>, StoreError> {
        if let Err(e) = self.store.ensure_path() {
            log::error!("Failed to ensure configuration path {}: {}", self.store.path(), e);
            return Err(e);
        }

        let mut written = Vec::new();
        for (kind, value) in metrics.iter() {
            if value == 0 {
                log::debug!("Skipping {}, value=0", kind);
                continue;
            }
            let value = value.to_string();
            match self.store.set_value(kind.key(), &value) {
                Ok(()) => {
                    log::info!("Set {}={}", kind, value);
                    written.push(kind);
                },
                Err(e) => log::warn!("{}", e),
            }
        }
        Ok(written)
    }

    fn write_live(&self, metrics: &MetricSet) -> Result<(), LiveMetricsError> {
        let mut live = self.live.read().inspect_err(|e| log::error!("{}", e))?;

        live.overlay(metrics);

        self.live.write(&live).inspect_err(|e| log::error!("{}", e))?;
        log::info!("Applied non-client metrics");
        Ok(())
    }
}
