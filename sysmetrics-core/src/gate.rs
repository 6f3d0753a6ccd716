//! Throttle and duplicate-theme gate.
//!
//! Every application of metrics runs through [ApplyGate::run], which checks,
//! applies and records under one lock. Two triggers racing for the same theme
//! therefore apply it once.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// The last successful application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyState {
    /// Tick of the last successful application, `None` before the first.
    pub last_applied_ms: Option<u64>,
    /// Theme applied last.
    pub theme: Option<String>,
}

/// Why the gate refused to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The previous application is too recent.
    Throttled {
        /// Milliseconds since the previous application.
        elapsed_ms: u64,
    },
    /// The theme is the one applied last.
    Unchanged {
        /// The theme name.
        theme: String,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Throttled { elapsed_ms } => {
                write!(f, "Skipping action, last executed {} ms ago", elapsed_ms)
            },
            Rejection::Unchanged { theme } => write!(f, "Theme unchanged: {}, skipping", theme),
        }
    }
}

/// Outcome of a gated run that did not complete.
#[derive(Debug)]
pub enum GateError<E> {
    /// The gate refused to run.
    Rejected(Rejection),
    /// The gated closure failed; the gate state is unchanged.
    Failed(E),
}

/// Rate limiter and no-op detector shared by all triggers.
#[derive(Debug)]
pub struct ApplyGate {
    throttle: Duration,
    state: Mutex<ApplyState>,
}

impl ApplyGate {
    /// Create a gate with the given throttle window.
    pub fn new(throttle: Duration) -> Self {
        Self {
            throttle,
            state: Mutex::new(ApplyState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ApplyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Evaluate the rules without applying anything.
    pub fn check(&self, now_ms: u64, theme: &str) -> Result<(), Rejection> {
        self.evaluate(&self.lock(), now_ms, theme)
    }

    /// Run `apply` if the rules allow it, recording `now_ms` and `theme` when
    /// it succeeds.
    ///
    /// The lock is held for the whole run, so concurrent callers are
    /// serialized and observe each other's updates.
    pub fn run<T, E>(
        &self,
        now_ms: u64,
        theme: &str,
        apply: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, GateError<E>> {
        let mut state = self.lock();
        self.evaluate(&state, now_ms, theme)
            .map_err(GateError::Rejected)?;

        let value = apply().map_err(GateError::Failed)?;

        state.last_applied_ms = Some(now_ms);
        state.theme = Some(theme.to_string());
        Ok(value)
    }

    /// Current state.
    pub fn state(&self) -> ApplyState {
        self.lock().clone()
    }

    fn evaluate(&self, state: &ApplyState, now_ms: u64, theme: &str) -> Result<(), Rejection> {
        if let Some(last) = state.last_applied_ms {
            let elapsed_ms = now_ms.saturating_sub(last);
            if u128::from(elapsed_ms) < self.throttle.as_millis() {
                return Err(Rejection::Throttled { elapsed_ms });
            }
        }
        if state.theme.as_deref() == Some(theme) {
            return Err(Rejection::Unchanged {
                theme: theme.to_string(),
            });
        }
        Ok(())
    }
}
