//! Module startup, shutdown and settings reloads.

use std::sync::Arc;

use anyhow::Result;
use log::LevelFilter;
use sysmetrics_services::settings::SettingsRegistry;
use sysmetrics_theme::config::MetricsSettings;

use crate::config::ModuleConfig;
use crate::context::{MetricsContext, Platform};
use crate::host::{install_host_logger, Host, HOOK_TARGET};
use crate::orchestrator::apply_theme_metrics;
use crate::trigger::{InterceptedCall, ThemePropertiesFn};
use crate::watcher::ChangeWatcher;

struct InstalledHook {
    // Keeps the interceptor alive for as long as the host may call it.
    _call: Arc<InterceptedCall>,
    original: ThemePropertiesFn,
}

/// One module instance living inside a host process.
///
/// In the primary process the module intercepts the theme-application call
/// and watches the theme key; elsewhere it only applies metrics at startup.
pub struct MetricsModule {
    host: Arc<dyn Host>,
    config: ModuleConfig,
    context: Arc<MetricsContext>,
    watcher: Option<ChangeWatcher>,
    hook: Option<InstalledHook>,
}

impl MetricsModule {
    /// Create a module reading its settings from `host`.
    pub fn new(host: Arc<dyn Host>, platform: Platform, config: ModuleConfig) -> Self {
        let settings = MetricsSettings::load(host.as_ref());
        let context = Arc::new(MetricsContext::new(platform, settings, config.timing));
        Self::with_context(host, context, config)
    }

    /// Create a module with timing taken from the standard configuration
    /// files. The switches still come from `host`.
    ///
    /// Also routes this crate's log output to [Host::log], unless a global
    /// logger is already installed.
    pub fn from_registry(host: Arc<dyn Host>, platform: Platform) -> Result<Self> {
        if !install_host_logger(Arc::clone(&host), LevelFilter::Info) {
            log::debug!("A logger is already installed, keeping it");
        }
        let registry = smol::block_on(SettingsRegistry::new())?;
        let config = ModuleConfig::from_config(registry.get());
        log::debug!("Loaded timing configuration: {:?}", config.timing);
        Ok(Self::new(host, platform, config))
    }

    /// Create a module around an existing context.
    pub fn with_context(host: Arc<dyn Host>, context: Arc<MetricsContext>, config: ModuleConfig) -> Self {
        Self {
            host,
            config,
            context,
            watcher: None,
            hook: None,
        }
    }

    /// The shared context.
    pub fn context(&self) -> &Arc<MetricsContext> {
        &self.context
    }

    /// The running watcher, if any.
    pub fn watcher(&self) -> Option<&ChangeWatcher> {
        self.watcher.as_ref()
    }

    /// Whether the theme-application call is intercepted.
    pub fn is_hooked(&self) -> bool {
        self.hook.is_some()
    }

    /// Start the module.
    ///
    /// Returns `false` only when the hook could not be installed in the
    /// primary process. A watcher that fails to start is logged and ignored.
    pub fn init(&mut self) -> bool {
        log::info!("Initializing System Metrics Loader");
        self.reload_settings();
        let settings = self.context.settings();

        let image_name = self.host.process_image_name();
        if !self.config.is_primary_process(&image_name) {
            log::info!("Running in {}, applying metrics once", image_name);
            if settings.wants_theme_tracking() {
                apply_theme_metrics(&self.context);
            }
            return true;
        }

        if !settings.wants_theme_tracking() {
            log::info!("Theme metrics disabled, not hooking");
            return true;
        }

        let call = InterceptedCall::new(Arc::clone(&self.context));
        match self.host.install_hook(&HOOK_TARGET, call.replacement()) {
            Ok(original) => {
                call.set_original(Arc::clone(&original));
                self.hook = Some(InstalledHook {
                    _call: call,
                    original,
                });
                log::info!("Hooked {}", HOOK_TARGET);
            },
            Err(e) => {
                log::error!("{}", e);
                return false;
            },
        }

        match ChangeWatcher::start(Arc::clone(&self.context)) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => log::error!("Failed to start theme change watcher: {}", e),
        }

        apply_theme_metrics(&self.context);
        true
    }

    /// Stop the watcher and remove the hook. Safe to call more than once.
    pub fn uninit(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        if let Some(hook) = self.hook.take() {
            if self.host.remove_hook(&hook.original) {
                log::info!("Removed hook on {}", HOOK_TARGET);
            } else {
                log::warn!("Failed to remove hook on {}", HOOK_TARGET);
            }
        }
    }

    /// Re-read the settings and, when loading is enabled, run a pass.
    pub fn on_settings_changed(&self) -> bool {
        log::info!("Settings changed, reloading");
        self.reload_settings();
        if self.context.settings().load_theme_metrics {
            apply_theme_metrics(&self.context)
        } else {
            false
        }
    }

    fn reload_settings(&self) {
        self.context
            .set_settings(MetricsSettings::load(self.host.as_ref()));
    }
}

impl Drop for MetricsModule {
    fn drop(&mut self) {
        self.uninit();
    }
}
