// SPDX-License-Identifier: LGPL-3.0-only
//! Error types for the persistence, broadcast and watch services.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a [MetricsStore](crate::store::MetricsStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The configuration path could not be opened or created.
    #[error("Failed to create configuration path {path}, error={code}")]
    PathUnavailable {
        /// The configuration path.
        path: String,
        /// Platform error code.
        code: i32,
    },

    /// A single value could not be written.
    #[error("Failed to set {name}={value}, error={code}")]
    WriteFailed {
        /// Key name.
        name: String,
        /// Value that was being written.
        value: String,
        /// Platform error code.
        code: i32,
    },

    /// A single value could not be read.
    #[error("Failed to read {name}, error={code}")]
    ReadFailed {
        /// Key name.
        name: String,
        /// Platform error code.
        code: i32,
    },

    /// The backing file could not be read or parsed.
    #[error("Failed to read store file {path:?}: {details}")]
    Corrupt {
        /// The backing file.
        path: PathBuf,
        /// Parser message.
        details: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Raw platform error code, when one exists.
    pub fn code(&self) -> Option<i32> {
        match self {
            StoreError::PathUnavailable { code, .. }
            | StoreError::WriteFailed { code, .. }
            | StoreError::ReadFailed { code, .. } => Some(*code),
            StoreError::Io(e) => e.raw_os_error(),
            StoreError::Corrupt { .. } => None,
        }
    }
}

/// Errors raised while reading or writing the live metrics structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiveMetricsError {
    /// Reading the live structure failed.
    #[error("Failed to get non-client metrics, error={code}")]
    ReadFailed {
        /// Platform error code.
        code: i32,
    },
    /// Writing the live structure failed.
    #[error("Failed to set non-client metrics, error={code}")]
    WriteFailed {
        /// Platform error code.
        code: i32,
    },
}

/// A change notification could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to broadcast {message}, error={code}")]
pub struct BroadcastError {
    /// Message description.
    pub message: String,
    /// Platform error code.
    pub code: i32,
}

impl LiveMetricsError {
    /// Raw platform error code.
    pub fn code(&self) -> i32 {
        match self {
            LiveMetricsError::ReadFailed { code } | LiveMetricsError::WriteFailed { code } => *code,
        }
    }
}

/// Neither the persistent store nor the live structure was updated.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// The configuration path was unavailable and the live write failed.
    #[error("No metric was applied (store: {store}, live: {live})")]
    BothFailed {
        /// Why the store path failed.
        store: StoreError,
        /// Why the live path failed.
        #[source]
        live: LiveMetricsError,
    },

    /// The configuration path opened but no entry was written, and the live
    /// write failed.
    #[error("No metric was applied (store: no entry written, live: {0})")]
    LiveFailed(#[source] LiveMetricsError),
}

impl ApplyError {
    /// The store failure, when the configuration path itself was unavailable.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ApplyError::BothFailed { store, .. } => Some(store),
            ApplyError::LiveFailed(_) => None,
        }
    }

    /// The live structure failure.
    pub fn live_error(&self) -> &LiveMetricsError {
        match self {
            ApplyError::BothFailed { live, .. } | ApplyError::LiveFailed(live) => live,
        }
    }
}

/// Errors raised by change watching.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Registering for change notifications failed.
    #[error("Failed to register for changes on {target}: {details}")]
    Register {
        /// Watched key or file.
        target: String,
        /// Failure details.
        details: String,
    },

    /// Waiting for a change failed.
    #[error("Theme watcher wait failed: {0}")]
    Wait(String),

    /// Error from the notify crate.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}

impl WatchError {
    /// Create a registration error.
    pub fn register(target: impl Into<String>, details: impl ToString) -> Self {
        Self::Register {
            target: target.into(),
            details: details.to_string(),
        }
    }
}
