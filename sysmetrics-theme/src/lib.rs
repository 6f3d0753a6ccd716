#![warn(missing_docs)]

//! # sysmetrics Theme Layer
//!
//! The metric model and resolution logic of sysmetrics.
//!
//! ## Overview
//!
//! - **[MetricSet](metrics::MetricSet)**: ten window metrics in native units
//! - **[units]**: pixel to native-unit conversion
//! - **[ThemeEngine](engine::ThemeEngine)** / **[LegacyMetricsSource](engine::LegacyMetricsSource)**:
//!   the two metric sources
//! - **[MetricsResolver](resolver::MetricsResolver)**: theme-first, per-metric
//!   fallback resolution
//! - **[MetricsSettings](config::MetricsSettings)**: the switches that drive it
//!
//! ## Quick Start
//!
//! ```rust
//! use sysmetrics_theme::config::MetricsSettings;
//! use sysmetrics_theme::engine::{FixedSnapshot, MemoryThemeEngine};
//! use sysmetrics_theme::metrics::{MetricKind, SystemMetric};
//! use sysmetrics_theme::resolver::MetricsResolver;
//!
//! let engine = MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 19);
//! let legacy = FixedSnapshot(None);
//!
//! let metrics = MetricsResolver::new(&engine, &legacy)
//!     .resolve(&MetricsSettings::default())
//!     .unwrap();
//! assert_eq!(metrics.get(MetricKind::CaptionHeight), -285);
//! ```

/// Contains the [config::MetricsSettings] struct and the settings provider seam.
pub mod config;
/// Contains the metric source traits.
pub mod engine;
/// Contains resolution error types.
pub mod error;
/// Contains the [metrics::MetricSet] data model.
pub mod metrics;
/// Contains the [resolver::MetricsResolver].
pub mod resolver;
/// Contains pixel/native unit conversion.
pub mod units;

pub use error::{ResolveError, SourceError};
pub use metrics::{MetricKind, MetricSet, NonClientMetrics, SystemMetric};
