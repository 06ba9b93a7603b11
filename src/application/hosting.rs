//! Port to the hosting provider's REST API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::dns::DesiredRecord;
use crate::domain::status::RemoteStates;

#[derive(Debug, Error)]
pub enum HostingError {
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("hosting provider answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("hosting provider unreachable: {0}")]
    Transport(String),
    #[error("unexpected hosting provider response: {0}")]
    Decode(String),
    #[error("hosting protocol violation: {0}")]
    Protocol(String),
    #[error("hosting client is not configured")]
    NotConfigured,
}

impl HostingError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            HostingError::Status { status, .. } => *status == 429 || *status >= 500,
            HostingError::Transport(_) => true,
            _ => false,
        }
    }
}

/// Addresses one hosted site inside a provider project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRef {
    pub project_id: String,
    pub site_id: String,
}

impl SiteRef {
    pub fn new(project_id: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            site_id: site_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedSite {
    pub site_id: String,
    pub default_url: Option<String>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pub glob: String,
    pub headers: BTreeMap<String, String>,
}

/// Serving configuration attached to a version when it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConfig {
    pub clean_urls: bool,
    pub headers: Vec<HeaderRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PopulateOutcome {
    pub upload_required_hashes: Vec<String>,
    pub upload_url: Option<String>,
}

/// Provider view of a custom domain registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomDomain {
    pub domain: String,
    pub states: RemoteStates,
    pub desired_records: Vec<DesiredRecord>,
    pub issues: Vec<String>,
}

#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn get_site(&self, site: &SiteRef) -> Result<Option<HostedSite>, HostingError>;

    async fn create_site(
        &self,
        site: &SiteRef,
        labels: &BTreeMap<String, String>,
    ) -> Result<HostedSite, HostingError>;

    /// Open a new version and return its id.
    async fn create_version(
        &self,
        site: &SiteRef,
        config: &VersionConfig,
    ) -> Result<String, HostingError>;

    async fn populate_files(
        &self,
        site: &SiteRef,
        version_id: &str,
        manifest: &BTreeMap<String, String>,
    ) -> Result<PopulateOutcome, HostingError>;

    async fn upload_blob(
        &self,
        upload_url: &str,
        hash: &str,
        gzipped: Bytes,
    ) -> Result<(), HostingError>;

    async fn finalize_version(&self, site: &SiteRef, version_id: &str)
    -> Result<(), HostingError>;

    /// Release a finalized version and return the release id.
    async fn create_release(
        &self,
        site: &SiteRef,
        version_id: &str,
        message: Option<&str>,
    ) -> Result<String, HostingError>;

    async fn create_custom_domain(
        &self,
        site: &SiteRef,
        domain: &str,
    ) -> Result<CustomDomain, HostingError>;

    async fn get_custom_domain(
        &self,
        site: &SiteRef,
        domain: &str,
    ) -> Result<Option<CustomDomain>, HostingError>;

    async fn delete_custom_domain(&self, site: &SiteRef, domain: &str)
    -> Result<(), HostingError>;
}
