mod context;
mod reconcile;

pub use context::{ReconcileConnectionsContext, job_failed};
pub use reconcile::{ReconcileConnectionsJob, process_reconcile_connections_job, reconcile_schedule};
