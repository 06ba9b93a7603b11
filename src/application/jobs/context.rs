use std::sync::Arc;

use apalis::prelude::Error as ApalisError;

use crate::application::reconcile::Reconciler;

/// Services the reconciliation worker needs on every tick.
#[derive(Clone)]
pub struct ReconcileConnectionsContext {
    pub reconciler: Arc<Reconciler>,
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Wrap a scan failure so apalis records the tick as failed.
pub fn job_failed<E>(err: E) -> ApalisError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let boxed: BoxError = Box::new(err);
    ApalisError::Failed(Arc::new(boxed))
}
