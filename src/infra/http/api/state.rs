use std::sync::Arc;

use crate::application::connections::ConnectionOrchestrator;
use crate::application::deploy::ContentDeployer;
use crate::application::reconcile::Reconciler;
use crate::application::registry::SiteRegistry;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<SiteRegistry>,
    pub deployer: Arc<ContentDeployer>,
    pub connections: Arc<ConnectionOrchestrator>,
    pub reconciler: Arc<Reconciler>,
    /// Backs `/healthz`; absent when the services run on other stores.
    pub db: Option<Arc<PostgresRepositories>>,
}
