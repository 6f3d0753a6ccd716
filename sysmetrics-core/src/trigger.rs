//! Events that may lead to metrics being re-applied.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use crate::context::MetricsContext;
use crate::orchestrator::apply_theme_metrics;

/// Theme-application flag: non-client areas are themed.
pub const STAP_ALLOW_NONCLIENT: u32 = 0x1;
/// Theme-application flag: controls are themed.
pub const STAP_ALLOW_CONTROLS: u32 = 0x2;
/// Theme-application flag: web content is themed.
pub const STAP_ALLOW_WEBCONTENT: u32 = 0x4;

/// The theme-application-properties call being intercepted.
pub type ThemePropertiesFn = Arc<dyn Fn(u32) + Send + Sync>;

/// What caused a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// The watched configuration key changed.
    ConfigKeyWatch,
    /// The process set its theme-application properties.
    InterceptedCall {
        /// Flags the call was made with.
        flags: u32,
    },
}

impl TriggerSource {
    /// Whether this event should lead to a pass at all.
    pub fn wants_apply(&self) -> bool {
        match self {
            TriggerSource::ConfigKeyWatch => true,
            TriggerSource::InterceptedCall { flags } => flags & STAP_ALLOW_CONTROLS != 0,
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::ConfigKeyWatch => write!(f, "theme key change"),
            TriggerSource::InterceptedCall { flags } => {
                write!(f, "SetThemeAppProperties(0x{:X})", flags)
            },
        }
    }
}

/// Handle a trigger: check the master enable, wait for the environment to
/// settle, then run a pass.
///
/// `settle` sleeps for the given delay and returns `false` when the wait was
/// cancelled, in which case no pass runs.
pub fn dispatch(
    ctx: &MetricsContext,
    source: TriggerSource,
    settle: impl FnOnce(Duration) -> bool,
) -> bool {
    if !source.wants_apply() {
        log::trace!("Ignoring {}", source);
        return false;
    }
    if !ctx.settings().load_theme_metrics {
        log::debug!("Ignoring {}: metric loading is disabled", source);
        return false;
    }

    log::info!("Handling {}", source);
    if !settle(ctx.timing().settle_delay) {
        log::debug!("Cancelled while waiting for the theme to settle");
        return false;
    }
    apply_theme_metrics(ctx)
}

/// Replacement for the intercepted theme-application-properties call.
///
/// The original call is always forwarded first; a pass follows when the
/// flags include [STAP_ALLOW_CONTROLS].
pub struct InterceptedCall {
    ctx: Arc<MetricsContext>,
    original: OnceLock<ThemePropertiesFn>,
}

impl InterceptedCall {
    /// Create an interceptor without an original to forward to yet.
    pub fn new(ctx: Arc<MetricsContext>) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            original: OnceLock::new(),
        })
    }

    /// Record the original call; returns `false` if one was already set.
    pub fn set_original(&self, original: ThemePropertiesFn) -> bool {
        self.original.set(original).is_ok()
    }

    /// Forward the call, then handle it as a trigger. Returns whether a pass
    /// applied metrics.
    pub fn invoke(&self, flags: u32) -> bool {
        match self.original.get() {
            Some(original) => original(flags),
            None => log::warn!("SetThemeAppProperties intercepted before the hook completed"),
        }

        dispatch(&self.ctx, TriggerSource::InterceptedCall { flags }, |delay| {
            thread::sleep(delay);
            true
        })
    }

    /// The function handed to the host as the hook replacement.
    pub fn replacement(self: &Arc<Self>) -> ThemePropertiesFn {
        let this = Arc::clone(self);
        Arc::new(move |flags| {
            this.invoke(flags);
        })
    }
}
