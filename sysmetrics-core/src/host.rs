// SPDX-License-Identifier: LGPL-3.0-only
//! The seam to the plugin framework hosting the module.

use std::fmt;
use std::sync::Arc;

use log::{LevelFilter, Log, Metadata, Record};
use sysmetrics_theme::config::SettingsProvider;

use crate::error::HostError;
use crate::trigger::ThemePropertiesFn;

/// A function the host can intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookTarget {
    /// Library exporting the function.
    pub module: &'static str,
    /// Exported symbol.
    pub symbol: &'static str,
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.module, self.symbol)
    }
}

/// The theme-application-properties call intercepted in the primary process.
pub const HOOK_TARGET: HookTarget = HookTarget {
    module: "uxtheme.dll",
    symbol: "SetThemeAppProperties",
};

/// Services provided by the hosting framework.
pub trait Host: SettingsProvider + Send + Sync {
    /// Replace `target` with `replacement`, returning the original function.
    fn install_hook(
        &self,
        target: &HookTarget,
        replacement: ThemePropertiesFn,
    ) -> Result<ThemePropertiesFn, HostError>;

    /// Undo a hook installed by [Host::install_hook], identified by the
    /// original it returned.
    fn remove_hook(&self, original: &ThemePropertiesFn) -> bool;

    /// Write a line to the host's log.
    fn log(&self, message: &str);

    /// Image name (or full path) of the current process.
    fn process_image_name(&self) -> String;
}

/// A [log] backend forwarding records to [Host::log].
pub struct HostLogger {
    host: Arc<dyn Host>,
    level: LevelFilter,
}

impl HostLogger {
    /// Create a logger passing records up to `level`.
    pub fn new(host: Arc<dyn Host>, level: LevelFilter) -> Self {
        Self { host, level }
    }
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.host
                .log(&format!("[{}] {}: {}", record.level(), record.target(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Install a [HostLogger] as the global logger.
///
/// Returns `false` when another logger was installed first, in which case
/// that one stays in place.
pub fn install_host_logger(host: Arc<dyn Host>, level: LevelFilter) -> bool {
    let logger: &'static HostLogger = Box::leak(Box::new(HostLogger::new(host, level)));
    match log::set_logger(logger) {
        Ok(()) => {
            log::set_max_level(level);
            true
        },
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct LineHost {
        lines: Mutex<Vec<String>>,
    }

    impl SettingsProvider for LineHost {
        fn get_setting(&self, _name: &str) -> Option<bool> {
            None
        }
    }

    impl Host for LineHost {
        fn install_hook(
            &self,
            target: &HookTarget,
            _replacement: ThemePropertiesFn,
        ) -> Result<ThemePropertiesFn, HostError> {
            Err(HostError::TargetNotFound(target.to_string()))
        }

        fn remove_hook(&self, _original: &ThemePropertiesFn) -> bool {
            false
        }

        fn log(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }

        fn process_image_name(&self) -> String {
            "test.exe".into()
        }
    }

    #[test]
    fn test_logger_filters_by_level() {
        let host = Arc::new(LineHost::default());
        let logger = HostLogger::new(host.clone(), LevelFilter::Info);

        logger.log(
            &Record::builder()
                .level(log::Level::Info)
                .target("sysmetrics")
                .args(format_args!("Applied"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(log::Level::Debug)
                .target("sysmetrics")
                .args(format_args!("hidden"))
                .build(),
        );

        assert_eq!(*host.lines.lock().unwrap(), vec!["[INFO] sysmetrics: Applied".to_string()]);
    }

    #[test]
    fn test_hook_target_display() {
        assert_eq!(HOOK_TARGET.to_string(), "uxtheme.dll!SetThemeAppProperties");
    }
}
