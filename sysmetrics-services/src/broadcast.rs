// SPDX-License-Identifier: LGPL-3.0-only
//! System-wide change notifications.

use crate::error::BroadcastError;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Default per-message timeout; hung receivers are skipped.
pub const BROADCAST_TIMEOUT: Duration = Duration::from_millis(2000);

/// A notification sent to every top-level window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A setting changed; tagged with the configuration section name.
    SettingChange(String),
    /// Legacy ini-file change notification for the same section.
    WinIniChange(String),
    /// The visual theme changed.
    ThemeChanged,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::SettingChange(section) => write!(f, "WM_SETTINGCHANGE({})", section),
            Notification::WinIniChange(section) => write!(f, "WM_WININICHANGE({})", section),
            Notification::ThemeChanged => f.write_str("WM_THEMECHANGED"),
        }
    }
}

/// Delivers notifications to running consumers.
pub trait Broadcaster: Send + Sync {
    /// Send one notification, giving up on receivers that do not answer
    /// within `timeout`.
    fn broadcast(&self, notification: &Notification, timeout: Duration) -> Result<(), BroadcastError>;
}

/// Send the three metric-change notifications for `section`.
///
/// Best effort: failures are logged and otherwise ignored.
pub fn notify_metrics_changed(broadcaster: &dyn Broadcaster, section: &str, timeout: Duration) {
    let notifications = [
        Notification::SettingChange(section.to_string()),
        Notification::WinIniChange(section.to_string()),
        Notification::ThemeChanged,
    ];
    for notification in &notifications {
        if let Err(e) = broadcaster.broadcast(notification, timeout) {
            log::warn!("{}", e);
        }
    }
    log::info!("Broadcast metric change notifications");
}

/// A broadcaster that records what it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<(Notification, Duration)>>,
}

impl RecordingBroadcaster {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification sent so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Timeouts used so far, in send order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, t)| *t)
            .collect()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, notification: &Notification, timeout: Duration) -> Result<(), BroadcastError> {
        log::debug!("Broadcast {}", notification);
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((notification.clone(), timeout));
        Ok(())
    }
}
