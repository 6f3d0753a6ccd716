//! # Metric Sources
//!
//! The two places metrics can come from: the visual-styles theme engine and
//! the legacy non-client metrics snapshot. Platform backends implement these
//! traits; [MemoryThemeEngine] and [FixedSnapshot] are in-process sources used
//! by tests and by hosts without a theme engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::error::SourceError;
use crate::metrics::{NonClientMetrics, SystemMetric};

/// Theme class queried for window metrics.
pub const WINDOW_CLASS: &str = "WINDOW";

/// An open handle to theme data for one class.
///
/// The handle is closed when dropped.
pub trait ThemeData {
    /// Themed size in pixels, `0` when the theme does not define it.
    fn sys_size(&self, metric: SystemMetric) -> i32;
}

/// The visual-styles engine of the desktop environment.
pub trait ThemeEngine: Send + Sync {
    /// Name of the active theme.
    fn current_theme_name(&self) -> Result<String, SourceError>;

    /// Open theme data for a class list such as [WINDOW_CLASS].
    fn open_theme_data<'a>(&'a self, class: &str) -> Result<Box<dyn ThemeData + 'a>, SourceError>;
}

/// Provides the classic, pre-skinning metrics block.
pub trait LegacyMetricsSource: Send + Sync {
    /// Read the full snapshot in one call.
    fn snapshot(&self) -> Result<NonClientMetrics, SourceError>;
}

/// A theme engine backed by in-memory values.
#[derive(Debug, Default)]
pub struct MemoryThemeEngine {
    theme_name: RwLock<Option<String>>,
    sizes: RwLock<HashMap<SystemMetric, i32>>,
    open_fails: RwLock<bool>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl MemoryThemeEngine {
    /// Create an engine reporting the given theme with no sizes defined.
    pub fn new(theme_name: impl Into<String>) -> Self {
        Self {
            theme_name: RwLock::new(Some(theme_name.into())),
            ..Default::default()
        }
    }

    /// Builder-style size definition.
    pub fn with_size(self, metric: SystemMetric, pixels: i32) -> Self {
        self.set_size(metric, pixels);
        self
    }

    /// Switch the active theme; `None` makes the name unavailable.
    pub fn set_theme_name(&self, name: Option<&str>) {
        *self.theme_name.write().unwrap_or_else(PoisonError::into_inner) = name.map(str::to_owned);
    }

    /// Define the pixel size returned for a query.
    pub fn set_size(&self, metric: SystemMetric, pixels: i32) {
        self.sizes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(metric, pixels);
    }

    /// Remove every defined size.
    pub fn clear_sizes(&self) {
        self.sizes.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Make [ThemeEngine::open_theme_data] fail.
    pub fn set_open_fails(&self, fails: bool) {
        *self.open_fails.write().unwrap_or_else(PoisonError::into_inner) = fails;
    }

    /// Number of handles opened so far.
    pub fn opened_handles(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of handles closed so far.
    pub fn closed_handles(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ThemeEngine for MemoryThemeEngine {
    fn current_theme_name(&self) -> Result<String, SourceError> {
        self.theme_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SourceError::theme_name(-1))
    }

    fn open_theme_data<'a>(&'a self, class: &str) -> Result<Box<dyn ThemeData + 'a>, SourceError> {
        if *self.open_fails.read().unwrap_or_else(PoisonError::into_inner) {
            return Err(SourceError::theme_data(class, -1));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let sizes = self.sizes.read().unwrap_or_else(PoisonError::into_inner).clone();
        Ok(Box::new(MemoryThemeData {
            sizes,
            closed: &self.closed,
        }))
    }
}

struct MemoryThemeData<'a> {
    sizes: HashMap<SystemMetric, i32>,
    closed: &'a AtomicUsize,
}

impl ThemeData for MemoryThemeData<'_> {
    fn sys_size(&self, metric: SystemMetric) -> i32 {
        self.sizes.get(&metric).copied().unwrap_or(0)
    }
}

impl Drop for MemoryThemeData<'_> {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// A legacy source returning a fixed snapshot, or failing when empty.
#[derive(Debug, Clone, Default)]
pub struct FixedSnapshot(pub Option<NonClientMetrics>);

impl LegacyMetricsSource for FixedSnapshot {
    fn snapshot(&self) -> Result<NonClientMetrics, SourceError> {
        self.0.ok_or(SourceError::snapshot(-1))
    }
}
