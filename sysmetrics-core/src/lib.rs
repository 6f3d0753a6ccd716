#![warn(missing_docs)]

//! Core library for sysmetrics => See `sysmetrics` crate.
//!
//! Contains the apply gate, the orchestration pass, its triggers and the
//! module lifecycle.

/// Contains monotonic tick sources.
pub mod clock;

/// Contains the [Timing](config::Timing) and [ModuleConfig](config::ModuleConfig) structs.
pub mod config;

/// Contains the [MetricsContext](context::MetricsContext) shared by all triggers.
pub mod context;

/// Contains error types.
pub mod error;

/// Contains the throttle and duplicate-theme gate.
pub mod gate;

/// Contains the host framework seam and its logger.
pub mod host;

/// Contains the module lifecycle.
pub mod lifecycle;

/// Contains the gated resolve-apply-broadcast pass.
pub mod orchestrator;

/// Contains platform assemblies.
pub mod platform;

/// Contains trigger handling and the intercepted call.
pub mod trigger;

/// Contains the background theme change watcher.
pub mod watcher;

pub use context::{MetricsContext, Platform};
pub use lifecycle::MetricsModule;
pub use orchestrator::{apply_theme_metrics, try_apply_theme_metrics};
