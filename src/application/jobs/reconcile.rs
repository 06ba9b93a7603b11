//! Cron job that scans in-flight domain connections and polls the due ones.

use std::str::FromStr;

use apalis::prelude::*;
use apalis_cron::Schedule;

use crate::application::jobs::{ReconcileConnectionsContext, job_failed};

/// Marker struct for the cron-triggered reconciliation scan.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct ReconcileConnectionsJob;

impl From<chrono::DateTime<chrono::Utc>> for ReconcileConnectionsJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

pub async fn process_reconcile_connections_job(
    _job: ReconcileConnectionsJob,
    ctx: Data<ReconcileConnectionsContext>,
) -> Result<(), apalis::prelude::Error> {
    let summary = ctx.reconciler.poll_due().await.map_err(job_failed)?;
    if summary.errors > 0 {
        tracing::warn!(
            errors = summary.errors,
            polled = summary.polled,
            "Reconciliation scan finished with errors"
        );
    }
    Ok(())
}

/// Parse the reconciliation cron expression (seconds field included).
pub fn reconcile_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression).map_err(|err| err.to_string())
}
