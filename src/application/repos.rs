//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{ConnectionEventRecord, ConnectionRecord, SiteRecord};
use crate::domain::types::{
    ConnectionEventKind, ConnectionMethod, ConnectionStatus, SiteKind, SiteStatus, TlsStatus,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UpsertSiteParams {
    pub site_id: String,
    pub project_id: String,
    pub agency_id: String,
    pub lead_id: String,
    pub user_id: String,
    pub business_name: String,
    pub site_kind: SiteKind,
    pub default_url: String,
}

#[derive(Debug, Clone)]
pub struct SiteDomainParams {
    pub site_id: String,
    pub custom_domain: Option<String>,
    pub connection_id: Uuid,
    pub tls_status: Option<TlsStatus>,
    pub status: SiteStatus,
}

#[derive(Debug, Clone)]
pub struct CreateConnectionParams {
    pub domain: Option<String>,
    pub site_id: String,
    pub project_id: String,
    pub agency_id: String,
    pub lead_id: String,
    pub user_id: String,
    pub method: ConnectionMethod,
}

#[derive(Debug, Clone)]
pub struct CreateConnectionEventParams {
    pub connection_id: Uuid,
    pub site_id: String,
    pub kind: ConnectionEventKind,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait SitesRepo: Send + Sync {
    async fn find_site(&self, site_id: &str) -> Result<Option<SiteRecord>, RepoError>;

    /// Insert a site in `creating` or refresh the ownership fields of an
    /// existing one, keeping its status and deployment history.
    async fn upsert_site(&self, params: UpsertSiteParams) -> Result<SiteRecord, RepoError>;

    async fn update_site_status(
        &self,
        site_id: &str,
        status: SiteStatus,
        error_message: Option<String>,
    ) -> Result<(), RepoError>;

    async fn record_release(
        &self,
        site_id: &str,
        version_id: &str,
        release_id: &str,
        deployed_at: OffsetDateTime,
    ) -> Result<(), RepoError>;

    async fn attach_domain(&self, params: SiteDomainParams) -> Result<(), RepoError>;

    async fn detach_domain(&self, site_id: &str) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ConnectionsRepo: Send + Sync {
    async fn find_connection(&self, id: Uuid) -> Result<Option<ConnectionRecord>, RepoError>;

    async fn find_active_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<ConnectionRecord>, RepoError>;

    async fn create_connection(
        &self,
        params: CreateConnectionParams,
    ) -> Result<ConnectionRecord, RepoError>;

    async fn update_connection_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
        error_message: Option<String>,
    ) -> Result<(), RepoError>;

    /// Persist the mutable columns of the record. `connected_at` and
    /// `disconnected_at` are owned by [`Self::mark_connected`] and
    /// [`Self::mark_disconnected`].
    async fn save_connection(&self, record: &ConnectionRecord) -> Result<(), RepoError>;

    /// Move the connection to `connected` and stamp `connected_at` unless it
    /// was stamped before. Returns whether this call performed the transition.
    async fn mark_connected(&self, id: Uuid, at: OffsetDateTime) -> Result<bool, RepoError>;

    async fn mark_disconnected(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError>;

    /// Connections in `statuses`, least recently checked first.
    async fn list_by_status(
        &self,
        statuses: &[ConnectionStatus],
        limit: u32,
    ) -> Result<Vec<ConnectionRecord>, RepoError>;
}

#[async_trait]
pub trait EventsRepo: Send + Sync {
    /// Append an event. Returns `false` when an identical completion event
    /// already exists.
    async fn append_event(&self, params: CreateConnectionEventParams) -> Result<bool, RepoError>;

    async fn list_events(
        &self,
        connection_id: Uuid,
    ) -> Result<Vec<ConnectionEventRecord>, RepoError>;
}
