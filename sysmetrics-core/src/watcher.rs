//! Background watcher re-applying metrics when the theme key changes.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use sysmetrics_services::error::WatchError;
use sysmetrics_services::watcher::{ChangeSignal, KeyWatch, WaitOutcome};

use crate::context::MetricsContext;
use crate::trigger::{dispatch, TriggerSource};

/// Name of the watcher thread.
pub const WATCHER_THREAD: &str = "sysmetrics-watcher";

/// Lifecycle of the watcher thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WatcherState {
    /// Started, not registered yet.
    Idle = 0,
    /// Blocked until a change or a stop request.
    Waiting = 1,
    /// Handling a change.
    Triggered = 2,
    /// The thread has exited.
    Stopped = 3,
}

impl WatcherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WatcherState::Idle,
            1 => WatcherState::Waiting,
            2 => WatcherState::Triggered,
            _ => WatcherState::Stopped,
        }
    }
}

/// Handle to the running watcher thread.
///
/// Stopping is graceful: the pending wait is cancelled and the thread joined.
/// Dropping the handle stops the watcher.
pub struct ChangeWatcher {
    signal: Arc<ChangeSignal>,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl ChangeWatcher {
    /// Open a key watch through the context's platform and start watching.
    pub fn start(ctx: Arc<MetricsContext>) -> Result<Self, WatchError> {
        let watch = (ctx.platform().key_watch)()?;
        Self::start_with(ctx, watch)
    }

    /// Start watching with an already opened key watch.
    pub fn start_with(ctx: Arc<MetricsContext>, watch: Box<dyn KeyWatch>) -> Result<Self, WatchError> {
        let signal = Arc::new(ChangeSignal::new());
        let state = Arc::new(AtomicU8::new(WatcherState::Idle as u8));
        let target = watch.target().to_string();

        let handle = {
            let signal = Arc::clone(&signal);
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name(WATCHER_THREAD.to_string())
                .spawn(move || run(&ctx, watch, &signal, &state))
                .map_err(|e| WatchError::register(&target, e))?
        };
        log::info!("Watching {} for theme changes", target);

        Ok(Self {
            signal,
            state,
            handle: Some(handle),
        })
    }

    /// Current state of the thread.
    pub fn state(&self) -> WatcherState {
        WatcherState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the watcher and wait for its thread. Calling it again does nothing.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.signal.cancel();
        if handle.join().is_err() {
            log::error!("Theme change watcher panicked");
        }
        self.state.store(WatcherState::Stopped as u8, Ordering::SeqCst);
        log::info!("Stopped theme change watcher");
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(ctx: &MetricsContext, mut watch: Box<dyn KeyWatch>, signal: &Arc<ChangeSignal>, state: &AtomicU8) {
    let set = |s: WatcherState| state.store(s as u8, Ordering::SeqCst);

    loop {
        if let Err(e) = watch.register(signal) {
            log::error!("{}", e);
            break;
        }
        set(WatcherState::Waiting);

        match signal.wait() {
            Ok(WaitOutcome::Changed) => {
                set(WatcherState::Triggered);
                log::debug!("{} changed", watch.target());
                dispatch(ctx, TriggerSource::ConfigKeyWatch, |delay| {
                    signal.sleep(delay) != WaitOutcome::Cancelled
                });
                if signal.is_cancelled() {
                    break;
                }
                signal.reset();
            },
            Ok(_) => break,
            Err(e) => {
                log::error!("{}", e);
                break;
            },
        }
    }

    set(WatcherState::Stopped);
}
