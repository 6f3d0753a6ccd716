mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{wait_until, Fixture, THROTTLE};
use sysmetrics_core::config::ModuleConfig;
use sysmetrics_core::error::HostError;
use sysmetrics_core::host::{Host, HookTarget, HOOK_TARGET};
use sysmetrics_core::trigger::{ThemePropertiesFn, STAP_ALLOW_CONTROLS, STAP_ALLOW_NONCLIENT};
use sysmetrics_core::watcher::WatcherState;
use sysmetrics_core::MetricsModule;
use sysmetrics_theme::config::{MetricsSettings, SettingsProvider};

#[derive(Default)]
struct FakeHost {
    image_name: String,
    settings: Mutex<HashMap<String, bool>>,
    fail_hook: bool,
    replacement: Mutex<Option<ThemePropertiesFn>>,
    hooked: Mutex<Vec<String>>,
    removed: AtomicUsize,
    original_calls: Arc<Mutex<Vec<u32>>>,
}

impl FakeHost {
    fn new(image_name: &str) -> Self {
        Self {
            image_name: image_name.to_string(),
            ..Default::default()
        }
    }

    fn set(&self, name: &str, value: bool) {
        self.settings.lock().unwrap().insert(name.to_string(), value);
    }

    /// Simulate the process calling the hooked function.
    fn call_hooked(&self, flags: u32) {
        let replacement = self.replacement.lock().unwrap().clone();
        replacement.expect("hook installed")(flags);
    }
}

impl SettingsProvider for FakeHost {
    fn get_setting(&self, name: &str) -> Option<bool> {
        self.settings.lock().unwrap().get(name).copied()
    }
}

impl Host for FakeHost {
    fn install_hook(
        &self,
        target: &HookTarget,
        replacement: ThemePropertiesFn,
    ) -> Result<ThemePropertiesFn, HostError> {
        if self.fail_hook {
            return Err(HostError::HookFailed {
                target: target.to_string(),
                code: 5,
            });
        }
        self.hooked.lock().unwrap().push(target.to_string());
        *self.replacement.lock().unwrap() = Some(replacement);
        let calls = Arc::clone(&self.original_calls);
        Ok(Arc::new(move |flags| calls.lock().unwrap().push(flags)))
    }

    fn remove_hook(&self, _original: &ThemePropertiesFn) -> bool {
        self.replacement.lock().unwrap().take();
        self.removed.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn log(&self, _message: &str) {}

    fn process_image_name(&self) -> String {
        self.image_name.clone()
    }
}

fn module(fixture: &Fixture, host: &Arc<FakeHost>) -> MetricsModule {
    let host: Arc<dyn Host> = host.clone();
    let config = ModuleConfig {
        timing: Fixture::timing(THROTTLE),
        ..ModuleConfig::default()
    };
    // Settings are re-read from the host by init.
    let context = fixture.context(MetricsSettings::default(), THROTTLE);
    MetricsModule::with_context(host, context, config)
}

#[test]
fn test_primary_process_hooks_watches_and_applies() {
    let fixture = Fixture::new();
    let host = Arc::new(FakeHost::new(r"C:\Windows\explorer.exe"));
    let mut module = module(&fixture, &host);

    assert!(module.init());
    assert!(module.is_hooked());
    assert_eq!(*host.hooked.lock().unwrap(), vec![HOOK_TARGET.to_string()]);
    assert_eq!(fixture.live.write_count(), 1);
    let watcher = module.watcher().expect("watcher running");
    assert!(wait_until(|| watcher.state() == WatcherState::Waiting));

    module.uninit();
    assert!(!module.is_hooked());
    assert!(module.watcher().is_none());
    assert_eq!(host.removed.load(Ordering::SeqCst), 1);

    module.uninit();
    assert_eq!(host.removed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_master_off_installs_nothing() {
    let fixture = Fixture::new();
    let host = Arc::new(FakeHost::new("explorer.exe"));
    host.set("loadThemeMetrics", false);
    let mut module = module(&fixture, &host);

    assert!(module.init());
    assert!(!module.is_hooked());
    assert!(module.watcher().is_none());
    assert_eq!(fixture.live.write_count(), 0);
    assert_eq!(fixture.store.write_count(), 0);
}

#[test]
fn test_theme_preference_off_installs_nothing() {
    let fixture = Fixture::new();
    let host = Arc::new(FakeHost::new("explorer.exe"));
    host.set("useThemeMetrics", false);
    let mut module = module(&fixture, &host);

    assert!(module.init());
    assert!(!module.is_hooked());
    assert_eq!(fixture.live.write_count(), 0);
}

#[test]
fn test_other_process_applies_once_without_hooks() {
    let fixture = Fixture::new();
    let host = Arc::new(FakeHost::new(r"C:\Windows\System32\notepad.exe"));
    let mut module = module(&fixture, &host);

    assert!(module.init());
    assert!(!module.is_hooked());
    assert!(module.watcher().is_none());
    assert_eq!(fixture.live.write_count(), 1);
    assert_eq!(fixture.trigger.registrations(), 0);
}

#[test]
fn test_hook_failure_fails_init() {
    let fixture = Fixture::new();
    let host = Arc::new(FakeHost {
        fail_hook: true,
        ..FakeHost::new("explorer.exe")
    });
    let mut module = module(&fixture, &host);

    assert!(!module.init());
    assert!(module.watcher().is_none());
    assert_eq!(fixture.live.write_count(), 0);
}

#[test]
fn test_intercepted_call_forwards_then_applies() {
    let fixture = Fixture::new();
    let host = Arc::new(FakeHost::new("explorer.exe"));
    let mut module = module(&fixture, &host);
    assert!(module.init());
    assert_eq!(fixture.live.write_count(), 1);

    fixture.engine.set_theme_name(Some("Basic"));
    fixture.clock.advance(Duration::from_secs(10));
    host.call_hooked(STAP_ALLOW_NONCLIENT | STAP_ALLOW_CONTROLS);

    assert_eq!(*host.original_calls.lock().unwrap(), vec![0x3]);
    assert_eq!(fixture.live.write_count(), 2);
    assert_eq!(module.context().gate().state().theme.as_deref(), Some("Basic"));
}

#[test]
fn test_intercepted_call_without_controls_flag_only_forwards() {
    let fixture = Fixture::new();
    let host = Arc::new(FakeHost::new("explorer.exe"));
    let mut module = module(&fixture, &host);
    assert!(module.init());

    fixture.engine.set_theme_name(Some("Basic"));
    fixture.clock.advance(Duration::from_secs(10));
    host.call_hooked(STAP_ALLOW_NONCLIENT);

    assert_eq!(*host.original_calls.lock().unwrap(), vec![STAP_ALLOW_NONCLIENT]);
    assert_eq!(fixture.live.write_count(), 1);
}

#[test]
fn test_settings_change_reloads_and_applies() {
    let fixture = Fixture::new();
    let host = Arc::new(FakeHost::new("notepad.exe"));
    host.set("loadThemeMetrics", false);
    let mut module = module(&fixture, &host);
    assert!(module.init());
    assert_eq!(fixture.live.write_count(), 0);

    host.set("loadThemeMetrics", true);
    assert!(module.on_settings_changed());
    assert!(module.context().settings().load_theme_metrics);
    assert_eq!(fixture.live.write_count(), 1);

    host.set("loadThemeMetrics", false);
    assert!(!module.on_settings_changed());
    assert_eq!(fixture.live.write_count(), 1);
}
