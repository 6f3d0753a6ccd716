//! Error types for orchestration and host integration.

use sysmetrics_services::error::ApplyError;
use sysmetrics_theme::error::{ResolveError, SourceError};
use thiserror::Error;

use crate::gate::Rejection;

/// Why an orchestration pass ended without applying metrics.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The active theme name was not obtainable.
    #[error(transparent)]
    ThemeName(#[from] SourceError),

    /// The gate refused the pass.
    #[error("{0}")]
    Rejected(Rejection),

    /// Metric loading is switched off.
    #[error("Metric loading is disabled")]
    Disabled,

    /// No metric could be resolved.
    #[error("No metrics applied: {0}")]
    Resolve(#[from] ResolveError),

    /// Nothing could be written.
    #[error("Failed to apply metrics: {0}")]
    Apply(#[from] ApplyError),
}

/// Errors reported by the host framework.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The hook target could not be found.
    #[error("Hook target {0} not found")]
    TargetNotFound(String),

    /// Installing the hook failed.
    #[error("Failed to hook {target}, error={code}")]
    HookFailed {
        /// The hooked symbol.
        target: String,
        /// Host error code.
        code: i32,
    },
}
