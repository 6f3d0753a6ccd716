//! # Resolution Error Types
//!
//! Errors raised while querying metric sources and resolving a [MetricSet](crate::metrics::MetricSet).

use thiserror::Error;

/// A metric source could not be queried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The active theme name could not be read.
    #[error("Failed to get theme name, error=0x{code:X}")]
    ThemeNameUnavailable {
        /// Platform error code.
        code: i32,
    },

    /// Theme data for a class could not be opened.
    #[error("Failed to open theme for {class}, error={code}")]
    ThemeDataUnavailable {
        /// The class list that was requested.
        class: String,
        /// Platform error code.
        code: i32,
    },

    /// The legacy metrics snapshot could not be read.
    #[error("Failed to get non-client metrics, error={code}")]
    SnapshotUnavailable {
        /// Platform error code.
        code: i32,
    },
}

impl SourceError {
    /// Create a theme name error.
    pub fn theme_name(code: i32) -> Self {
        Self::ThemeNameUnavailable { code }
    }

    /// Create a theme data error.
    pub fn theme_data(class: impl Into<String>, code: i32) -> Self {
        Self::ThemeDataUnavailable {
            class: class.into(),
            code,
        }
    }

    /// Create a snapshot error.
    pub fn snapshot(code: i32) -> Self {
        Self::SnapshotUnavailable { code }
    }
}

/// Resolution produced no usable metrics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Both the theme engine and the legacy snapshot are disabled.
    #[error("Both theme metrics and system metrics are disabled")]
    SourcesDisabled,

    /// The active theme name is not obtainable.
    #[error(transparent)]
    ThemeNameUnavailable(#[from] SourceError),

    /// Every metric is still unresolved after consulting all enabled sources.
    #[error("Failed to load metrics from {theme} or the legacy snapshot")]
    NothingResolved {
        /// The active theme name.
        theme: String,
    },
}

/// Result type alias for resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_data_error_carries_code() {
        let err = SourceError::theme_data("WINDOW", 1168);
        assert_eq!(
            err,
            SourceError::ThemeDataUnavailable {
                class: "WINDOW".to_string(),
                code: 1168
            }
        );
        assert_eq!(err.to_string(), "Failed to open theme for WINDOW, error=1168");
    }
}
