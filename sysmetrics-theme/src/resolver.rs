//! # Metrics Resolver
//!
//! Builds a [MetricSet] from the active theme, falling back per metric to the
//! legacy snapshot.
//!
//! ## Precedence
//!
//! 1. Theme engine (when `useThemeMetrics` is on): every non-zero themed size
//!    is recorded.
//! 2. Legacy snapshot (when `allowSystemMetrics` is on): fills only the
//!    metrics the theme left at zero.
//!
//! A metric resolved by the theme is never replaced by the snapshot.

use crate::config::MetricsSettings;
use crate::engine::{LegacyMetricsSource, ThemeEngine, WINDOW_CLASS};
use crate::error::{ResolveError, ResolveResult};
use crate::metrics::{MetricKind, MetricSet};
use crate::units::{pixels_to_twips, twips_to_pixels};

/// Resolves metrics from a theme engine and a legacy snapshot.
pub struct MetricsResolver<'a> {
    engine: &'a dyn ThemeEngine,
    legacy: &'a dyn LegacyMetricsSource,
}

impl<'a> MetricsResolver<'a> {
    /// Create a resolver over the two sources.
    pub fn new(engine: &'a dyn ThemeEngine, legacy: &'a dyn LegacyMetricsSource) -> Self {
        Self { engine, legacy }
    }

    /// Resolve a full [MetricSet] according to `settings`.
    ///
    /// Succeeds when at least one metric ends up resolved.
    pub fn resolve(&self, settings: &MetricsSettings) -> ResolveResult<MetricSet> {
        if !settings.any_source_enabled() {
            log::info!("Theme metrics and system metrics are both disabled");
            return Err(ResolveError::SourcesDisabled);
        }

        let theme_name = self.engine.current_theme_name().map_err(|e| {
            log::warn!("{}", e);
            ResolveError::ThemeNameUnavailable(e)
        })?;
        log::info!("Active theme: {}", theme_name);

        let mut metrics = MetricSet::new();

        if settings.use_theme_metrics {
            self.resolve_from_theme(&mut metrics);
        }

        if settings.allow_system_metrics {
            self.fill_from_snapshot(&mut metrics);
        }

        if metrics.is_empty() {
            log::warn!("Failed to load metrics from {} or the legacy snapshot", theme_name);
            return Err(ResolveError::NothingResolved { theme: theme_name });
        }

        log::info!("Loaded metrics: {}", metrics);
        Ok(metrics)
    }

    fn resolve_from_theme(&self, metrics: &mut MetricSet) {
        let theme = match self.engine.open_theme_data(WINDOW_CLASS) {
            Ok(theme) => theme,
            Err(e) => {
                log::warn!("{}", e);
                return;
            },
        };

        for kind in MetricKind::ALL {
            let query = kind.system_metric();
            let pixels = theme.sys_size(query);
            if pixels != 0 {
                let twips = pixels_to_twips(pixels);
                metrics.set(kind, twips);
                log::debug!(
                    "Theme size: {} (SM_{})={} (twips={})",
                    kind,
                    query.index(),
                    twips_to_pixels(twips),
                    twips
                );
            } else {
                log::debug!("Theme size missing: {} (SM_{})=0", kind, query.index());
            }
        }
    }

    fn fill_from_snapshot(&self, metrics: &mut MetricSet) {
        match self.legacy.snapshot() {
            Ok(snapshot) => {
                for kind in MetricKind::ALL {
                    metrics.set_pixels_if_unresolved(kind, snapshot.field(kind));
                }
                log::info!("Legacy snapshot: {}", snapshot);
            },
            Err(e) => log::warn!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FixedSnapshot, MemoryThemeEngine};
    use crate::metrics::{NonClientMetrics, SystemMetric};

    fn all_on() -> MetricsSettings {
        MetricsSettings::default()
    }

    fn aero_snapshot() -> FixedSnapshot {
        FixedSnapshot(Some(NonClientMetrics {
            border_width: 4,
            menu_height: 19,
            ..Default::default()
        }))
    }

    #[test]
    fn test_aero_scenario() {
        let engine = MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 19);
        let legacy = aero_snapshot();
        let metrics = MetricsResolver::new(&engine, &legacy).resolve(&all_on()).unwrap();

        assert_eq!(metrics.get(MetricKind::CaptionHeight), -285);
        assert_eq!(metrics.get(MetricKind::BorderWidth), -60);
        assert_eq!(metrics.get(MetricKind::MenuHeight), -285);
        assert_eq!(metrics.resolved_count(), 3);
    }

    #[test]
    fn test_theme_takes_precedence_per_metric() {
        let engine = MemoryThemeEngine::new("Aero")
            .with_size(SystemMetric::CxFrame, 8)
            .with_size(SystemMetric::CxVScroll, 17);
        let legacy = FixedSnapshot(Some(NonClientMetrics {
            border_width: 1,
            scroll_width: 30,
            scroll_height: 31,
            caption_width: 36,
            ..Default::default()
        }));
        let metrics = MetricsResolver::new(&engine, &legacy).resolve(&all_on()).unwrap();

        assert_eq!(metrics.pixels(MetricKind::BorderWidth), Some(8));
        assert_eq!(metrics.pixels(MetricKind::ScrollWidth), Some(17));
        // Scroll height shares the vertical scroll query.
        assert_eq!(metrics.pixels(MetricKind::ScrollHeight), Some(17));
        assert_eq!(metrics.pixels(MetricKind::CaptionWidth), Some(36));
    }

    #[test]
    fn test_both_sources_disabled() {
        let engine = MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 19);
        let legacy = aero_snapshot();
        let settings = MetricsSettings {
            use_theme_metrics: false,
            allow_system_metrics: false,
            ..Default::default()
        };
        let result = MetricsResolver::new(&engine, &legacy).resolve(&settings);
        assert_eq!(result, Err(ResolveError::SourcesDisabled));
        assert_eq!(engine.opened_handles(), 0);
    }

    #[test]
    fn test_missing_theme_name_fails() {
        let engine = MemoryThemeEngine::new("Aero");
        engine.set_theme_name(None);
        let result = MetricsResolver::new(&engine, &aero_snapshot()).resolve(&all_on());
        assert!(matches!(result, Err(ResolveError::ThemeNameUnavailable(_))));
    }

    #[test]
    fn test_theme_open_failure_falls_back_to_snapshot() {
        let engine = MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 30);
        engine.set_open_fails(true);
        let metrics = MetricsResolver::new(&engine, &aero_snapshot())
            .resolve(&all_on())
            .unwrap();
        assert_eq!(metrics.get(MetricKind::CaptionHeight), 0);
        assert_eq!(metrics.get(MetricKind::BorderWidth), -60);
    }

    #[test]
    fn test_theme_handle_closed_after_resolution() {
        let engine = MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 19);
        MetricsResolver::new(&engine, &FixedSnapshot(None))
            .resolve(&all_on())
            .unwrap();
        assert_eq!(engine.opened_handles(), 1);
        assert_eq!(engine.closed_handles(), 1);
    }

    #[test]
    fn test_theme_only_ignores_snapshot() {
        let engine = MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 19);
        let settings = MetricsSettings {
            allow_system_metrics: false,
            ..Default::default()
        };
        let metrics = MetricsResolver::new(&engine, &aero_snapshot())
            .resolve(&settings)
            .unwrap();
        assert_eq!(metrics.resolved_count(), 1);
    }

    #[test]
    fn test_oversized_sizes_saturate() {
        let engine = MemoryThemeEngine::new("Aero").with_size(SystemMetric::CySize, 200_000_000);
        let legacy = FixedSnapshot(Some(NonClientMetrics {
            border_width: -200_000_000,
            ..Default::default()
        }));
        let metrics = MetricsResolver::new(&engine, &legacy).resolve(&all_on()).unwrap();

        assert_eq!(metrics.get(MetricKind::CaptionHeight), i32::MIN);
        assert_eq!(metrics.get(MetricKind::BorderWidth), i32::MAX);
    }

    #[test]
    fn test_nothing_resolved() {
        let engine = MemoryThemeEngine::new("Basic");
        let legacy = FixedSnapshot(Some(NonClientMetrics::default()));
        let result = MetricsResolver::new(&engine, &legacy).resolve(&all_on());
        assert_eq!(
            result,
            Err(ResolveError::NothingResolved {
                theme: "Basic".to_string()
            })
        );
    }
}
