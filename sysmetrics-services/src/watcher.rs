// SPDX-License-Identifier: LGPL-3.0-only
//! Configuration-key change watching.
//!
//! A [KeyWatch] registers for last-write notifications on a configuration key
//! and reports them through a [ChangeSignal]. The signal is a cancellable
//! wait: a stop request wakes the waiter just like a real change does.

use crate::error::WatchError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Configuration key the theme-personalization settings live under.
pub const PERSONALIZE_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Themes\Personalize";

/// Result of waiting on a [ChangeSignal].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A change was observed.
    Changed,
    /// The signal was cancelled.
    Cancelled,
    /// The timeout elapsed without cancellation.
    TimedOut,
}

#[derive(Debug, Default)]
struct SignalState {
    changed: bool,
    cancelled: bool,
    failure: Option<String>,
}

/// A resettable, cancellable change event.
#[derive(Debug, Default)]
pub struct ChangeSignal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

impl ChangeSignal {
    /// Create an unsignalled event.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report a change.
    pub fn notify(&self) {
        self.lock().changed = true;
        self.cond.notify_all();
    }

    /// Report that the underlying notification source broke.
    pub fn fail(&self, reason: impl Into<String>) {
        self.lock().failure = Some(reason.into());
        self.cond.notify_all();
    }

    /// Request the waiter to stop.
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.cond.notify_all();
    }

    /// Whether a stop was requested.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Clear a pending change so the next [ChangeSignal::wait] blocks again.
    pub fn reset(&self) {
        self.lock().changed = false;
    }

    /// Block until a change, a cancellation or a failure.
    ///
    /// Cancellation wins over a pending change.
    pub fn wait(&self) -> Result<WaitOutcome, WatchError> {
        let mut state = self.lock();
        loop {
            if state.cancelled {
                return Ok(WaitOutcome::Cancelled);
            }
            if let Some(reason) = state.failure.take() {
                return Err(WatchError::Wait(reason));
            }
            if state.changed {
                return Ok(WaitOutcome::Changed);
            }
            state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Changes arriving meanwhile stay pending.
    pub fn sleep(&self, duration: Duration) -> WaitOutcome {
        let deadline = Instant::now() + duration;
        let mut state = self.lock();
        loop {
            if state.cancelled {
                return WaitOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::TimedOut;
            }
            state = self
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// A source of last-write notifications for one configuration key.
pub trait KeyWatch: Send {
    /// Human-readable name of the watched key.
    fn target(&self) -> &str;

    /// Register for the next change, reported through `signal`.
    ///
    /// Called once before every wait; sources that stay registered may treat
    /// repeated calls as no-ops.
    fn register(&mut self, signal: &Arc<ChangeSignal>) -> Result<(), WatchError>;
}

/// Watches a file standing in for the configuration key, using `notify`.
///
/// The parent directory is watched so that atomic replacements of the file
/// are seen too.
pub struct NotifyKeyWatch {
    file: PathBuf,
    target: String,
    watcher: Option<RecommendedWatcher>,
}

impl NotifyKeyWatch {
    /// Create a watch on `file`.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let target = file.display().to_string();
        Self {
            file,
            target,
            watcher: None,
        }
    }

    fn is_relevant(file: &Path, event: &Event) -> bool {
        matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
        ) && event.paths.iter().any(|p| p.file_name() == file.file_name())
    }
}

impl KeyWatch for NotifyKeyWatch {
    fn target(&self) -> &str {
        &self.target
    }

    fn register(&mut self, signal: &Arc<ChangeSignal>) -> Result<(), WatchError> {
        if self.watcher.is_some() {
            return Ok(());
        }

        let dir = match self.file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let file = self.file.clone();
        let signal = Arc::clone(signal);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if Self::is_relevant(&file, &event) {
                    signal.notify();
                }
            },
            Err(e) => signal.fail(e.to_string()),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::register(&self.target, e))?;
        log::debug!("Watching {:?} for changes to {}", dir, self.target);
        self.watcher = Some(watcher);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ManualShared {
    signal: Option<Arc<ChangeSignal>>,
    registrations: usize,
    fail_register: bool,
}

/// A key watch fired by hand, for hosts that deliver change notifications
/// themselves and for tests.
pub struct ManualKeyWatch {
    shared: Arc<Mutex<ManualShared>>,
}

/// Fires the [ManualKeyWatch] it was created with.
#[derive(Clone)]
pub struct ManualKeyTrigger {
    shared: Arc<Mutex<ManualShared>>,
}

impl ManualKeyWatch {
    /// Create a watch and its trigger.
    pub fn new() -> (Self, ManualKeyTrigger) {
        let shared = Arc::new(Mutex::new(ManualShared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ManualKeyTrigger { shared },
        )
    }
}

impl KeyWatch for ManualKeyWatch {
    fn target(&self) -> &str {
        PERSONALIZE_KEY
    }

    fn register(&mut self, signal: &Arc<ChangeSignal>) -> Result<(), WatchError> {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.fail_register {
            return Err(WatchError::register(PERSONALIZE_KEY, "access denied"));
        }
        shared.signal = Some(Arc::clone(signal));
        shared.registrations += 1;
        Ok(())
    }
}

impl ManualKeyTrigger {
    fn lock(&self) -> MutexGuard<'_, ManualShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report a change; returns `false` when nothing is registered yet.
    pub fn fire(&self) -> bool {
        match &self.lock().signal {
            Some(signal) => {
                signal.notify();
                true
            },
            None => false,
        }
    }

    /// Break the pending wait with an error.
    pub fn fail(&self, reason: &str) -> bool {
        match &self.lock().signal {
            Some(signal) => {
                signal.fail(reason);
                true
            },
            None => false,
        }
    }

    /// Make every following registration fail.
    pub fn fail_register(&self) {
        self.lock().fail_register = true;
    }

    /// Number of successful registrations so far.
    pub fn registrations(&self) -> usize {
        self.lock().registrations
    }
}
