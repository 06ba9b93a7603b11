use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    filter::LevelFilter,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Dependencies that log every query or connection at `info`.
const QUIET_TARGETS: &[&str] = &["sqlx::query=warn", "hyper_util=warn", "apalis_core=warn"];

/// Install the process subscriber: env filter, span traces for errors, and
/// JSON or compact output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(logging.level)?)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

/// `RUST_LOG` wins over the configured level; noisy targets are capped
/// unless `RUST_LOG` names them.
fn env_filter(level: LevelFilter) -> Result<EnvFilter, InfraError> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let overridden = std::env::var("RUST_LOG").unwrap_or_default();
    for directive in QUIET_TARGETS {
        let target = directive.split('=').next().unwrap_or_default();
        if overridden.contains(target) {
            continue;
        }
        let parsed = directive
            .parse()
            .map_err(|err| InfraError::telemetry(format!("bad directive `{directive}`: {err}")))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "siteline_deploy_total",
            Unit::Count,
            "Deploy pipeline runs, labelled by outcome."
        );
        describe_counter!(
            "siteline_deploy_uploaded_files_total",
            Unit::Count,
            "Files uploaded because the provider did not already store them."
        );
        describe_counter!(
            "siteline_deploy_skipped_files_total",
            Unit::Count,
            "Files skipped because the provider already stored their hash."
        );
        describe_histogram!(
            "siteline_deploy_duration_ms",
            Unit::Milliseconds,
            "Wall-clock duration of a deploy including retries."
        );
        describe_counter!(
            "siteline_reconcile_polls_total",
            Unit::Count,
            "Connection polls, labelled by outcome."
        );
        describe_counter!(
            "siteline_connections_connected_total",
            Unit::Count,
            "Connections that reached the connected state."
        );
    });
}
