use std::fs;
use sysmetrics_services::SettingsRegistry;
use sysmetrics_theme::config::SettingsProvider;

#[tokio::test]
async fn test_load_from_paths_later_overrides_earlier() {
    let dir = tempfile::tempdir().unwrap();
    let system = dir.path().join("system.toml");
    let user = dir.path().join("user.toml");
    fs::write(
        &system,
        "[metrics]\nloadThemeMetrics = true\nuseThemeMetrics = true\nallowSystemMetrics = true\n",
    )
    .unwrap();
    fs::write(&user, "[metrics]\nallowSystemMetrics = false\n[timing]\nsettle_delay_ms = 10\n").unwrap();

    let mut registry = SettingsRegistry::empty();
    let results = registry.load_from_paths_async(vec![system, user]).await;
    assert!(results.iter().all(|r| r.is_ok()));

    assert_eq!(registry.get_setting("loadThemeMetrics"), Some(true));
    assert_eq!(registry.get_setting("allowSystemMetrics"), Some(false));
    assert_eq!(registry.get().timing.settle_delay_ms, Some(10));
}

#[tokio::test]
async fn test_load_from_paths_reports_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "[metrics\n").unwrap();
    let missing = dir.path().join("missing.toml");

    let mut registry = SettingsRegistry::empty();
    let results = registry.load_from_paths_async(vec![broken, missing]).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_err()));
    assert_eq!(registry.get_setting("loadThemeMetrics"), None);
}

#[test]
fn test_empty_registry_defaults_to_enabled() {
    let registry = SettingsRegistry::empty();
    let settings = sysmetrics_theme::config::MetricsSettings::load(&registry);
    assert!(settings.load_theme_metrics);
    assert!(settings.use_theme_metrics);
    assert!(settings.allow_system_metrics);
}
