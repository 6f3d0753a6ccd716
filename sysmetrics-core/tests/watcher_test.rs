mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{wait_until, Fixture};
use sysmetrics_core::config::Timing;
use sysmetrics_core::context::MetricsContext;
use sysmetrics_core::watcher::{ChangeWatcher, WatcherState};
use sysmetrics_services::watcher::ManualKeyWatch;
use sysmetrics_theme::config::MetricsSettings;

#[test]
fn test_key_change_applies_metrics() {
    let fixture = Fixture::new();
    let ctx = fixture.context(MetricsSettings::default(), Duration::ZERO);
    let mut watcher = ChangeWatcher::start(ctx.clone()).unwrap();

    assert!(wait_until(|| watcher.state() == WatcherState::Waiting));
    assert!(fixture.trigger.fire());
    assert!(wait_until(|| fixture.live.write_count() == 1));
    assert_eq!(ctx.gate().state().theme.as_deref(), Some("Aero"));

    // Registered again after handling the change.
    assert!(wait_until(|| fixture.trigger.registrations() >= 2));

    watcher.stop();
    assert_eq!(watcher.state(), WatcherState::Stopped);
    assert!(!watcher.is_running());
}

#[test]
fn test_second_change_with_new_theme_applies_again() {
    let fixture = Fixture::new();
    let ctx = fixture.context(MetricsSettings::default(), Duration::ZERO);
    let _watcher = ChangeWatcher::start(ctx.clone()).unwrap();

    assert!(wait_until(|| fixture.trigger.registrations() == 1));
    fixture.trigger.fire();
    assert!(wait_until(|| fixture.live.write_count() == 1));

    assert!(wait_until(|| fixture.trigger.registrations() == 2));
    fixture.engine.set_theme_name(Some("Basic"));
    fixture.clock.advance(Duration::from_secs(10));
    fixture.trigger.fire();
    assert!(wait_until(|| fixture.live.write_count() == 2));
}

#[test]
fn test_change_ignored_when_loading_disabled() {
    let fixture = Fixture::new();
    let settings = MetricsSettings {
        load_theme_metrics: false,
        ..Default::default()
    };
    let ctx = fixture.context(settings, Duration::ZERO);
    let mut watcher = ChangeWatcher::start(ctx).unwrap();

    assert!(wait_until(|| fixture.trigger.registrations() == 1));
    fixture.trigger.fire();
    assert!(wait_until(|| fixture.trigger.registrations() == 2));
    assert_eq!(fixture.live.write_count(), 0);

    watcher.stop();
}

#[test]
fn test_stop_cancels_pending_wait() {
    let fixture = Fixture::new();
    let ctx = fixture.context(MetricsSettings::default(), Duration::ZERO);
    let mut watcher = ChangeWatcher::start(ctx).unwrap();

    assert!(wait_until(|| watcher.state() == WatcherState::Waiting));
    watcher.stop();
    watcher.stop();

    assert_eq!(watcher.state(), WatcherState::Stopped);
    assert_eq!(fixture.live.write_count(), 0);
}

#[test]
fn test_stop_during_settle_skips_apply() {
    let fixture = Fixture::new();
    let timing = Timing {
        throttle: Duration::ZERO,
        settle_delay: Duration::from_secs(30),
        ..Timing::default()
    };
    let ctx = Arc::new(MetricsContext::with_clock(
        fixture.platform.clone(),
        MetricsSettings::default(),
        timing,
        fixture.clock.clone(),
    ));
    let mut watcher = ChangeWatcher::start(ctx).unwrap();

    assert!(wait_until(|| watcher.state() == WatcherState::Waiting));
    fixture.trigger.fire();
    assert!(wait_until(|| watcher.state() == WatcherState::Triggered));
    watcher.stop();

    assert_eq!(watcher.state(), WatcherState::Stopped);
    assert_eq!(fixture.live.write_count(), 0);
}

#[test]
fn test_wait_failure_stops_thread() {
    let fixture = Fixture::new();
    let ctx = fixture.context(MetricsSettings::default(), Duration::ZERO);
    let watcher = ChangeWatcher::start(ctx).unwrap();

    assert!(wait_until(|| watcher.state() == WatcherState::Waiting));
    assert!(fixture.trigger.fail("handle closed"));
    assert!(wait_until(|| watcher.state() == WatcherState::Stopped));
    assert!(wait_until(|| !watcher.is_running()));
}

#[test]
fn test_register_failure_stops_thread() {
    let fixture = Fixture::new();
    let ctx = fixture.context(MetricsSettings::default(), Duration::ZERO);
    let (watch, trigger) = ManualKeyWatch::new();
    trigger.fail_register();

    let watcher = ChangeWatcher::start_with(ctx, Box::new(watch)).unwrap();
    assert!(wait_until(|| watcher.state() == WatcherState::Stopped));
    assert_eq!(trigger.registrations(), 0);
}

#[test]
fn test_key_watch_opened_once() {
    let fixture = Fixture::new();
    let ctx = fixture.context(MetricsSettings::default(), Duration::ZERO);
    let _first = ChangeWatcher::start(ctx.clone()).unwrap();
    assert!(ChangeWatcher::start(ctx).is_err());
}
