//! One gated pass of resolve, apply and broadcast.

use sysmetrics_services::applier::{ApplyReport, MetricsApplier};
use sysmetrics_services::broadcast::notify_metrics_changed;
use sysmetrics_services::store::WINDOW_METRICS_SECTION;
use sysmetrics_theme::resolver::MetricsResolver;

use crate::context::MetricsContext;
use crate::error::OrchestratorError;
use crate::gate::GateError;

/// Resolve the current theme's metrics and apply them, unless the gate
/// refuses.
///
/// The gate's state only advances when the apply step reports success. On
/// success the metric change notifications are broadcast.
pub fn try_apply_theme_metrics(ctx: &MetricsContext) -> Result<ApplyReport, OrchestratorError> {
    let now_ms = ctx.clock().now_ms();
    let platform = ctx.platform();
    let theme = platform.engine.current_theme_name()?;
    let settings = ctx.settings();

    let report = ctx
        .gate()
        .run(now_ms, &theme, || {
            if !settings.load_theme_metrics {
                return Err(OrchestratorError::Disabled);
            }

            let metrics =
                MetricsResolver::new(platform.engine.as_ref(), platform.legacy.as_ref())
                    .resolve(&settings)?;
            log::debug!("Resolved metrics for {}: {}", theme, metrics);

            let report = MetricsApplier::new(platform.store.as_ref(), platform.live.as_ref())
                .apply(&metrics)?;
            Ok(report)
        })
        .map_err(|e| match e {
            GateError::Rejected(rejection) => OrchestratorError::Rejected(rejection),
            GateError::Failed(e) => e,
        })?;

    notify_metrics_changed(
        platform.broadcaster.as_ref(),
        WINDOW_METRICS_SECTION,
        ctx.timing().broadcast_timeout,
    );
    log::info!("Applied metrics for theme: {}", theme);
    Ok(report)
}

/// [try_apply_theme_metrics], logging the reason when nothing was applied.
pub fn apply_theme_metrics(ctx: &MetricsContext) -> bool {
    match try_apply_theme_metrics(ctx) {
        Ok(_) => true,
        Err(e @ OrchestratorError::Rejected(_)) | Err(e @ OrchestratorError::Disabled) => {
            log::info!("{}", e);
            false
        },
        Err(e) => {
            log::error!("{}", e);
            false
        },
    }
}
