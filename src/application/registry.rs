//! Idempotent creation and lookup of hosted sites.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::hosting::{HostingApi, HostingError, SiteRef};
use crate::application::repos::{RepoError, SitesRepo, UpsertSiteParams};
use crate::application::retry::{RetryPolicy, retry_with_backoff};
use crate::domain::site_id::{default_site_url, derive_site_id};
use crate::domain::types::SiteKind;

const MANAGED_BY_LABEL: &str = "siteline";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid site request: {0}")]
    Validation(String),
    #[error(transparent)]
    Hosting(#[from] HostingError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub default_project_id: String,
    pub namespace: String,
    pub default_domain_suffix: String,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct EnsureSiteCommand {
    pub project_id: Option<String>,
    pub business_name: String,
    pub lead_id: String,
    pub agency_id: String,
    pub user_id: String,
    pub site_kind: SiteKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredSite {
    pub site_id: String,
    pub project_id: String,
    pub is_new: bool,
    pub default_url: String,
}

#[derive(Clone)]
pub struct SiteRegistry {
    sites: Arc<dyn SitesRepo>,
    hosting: Arc<dyn HostingApi>,
    config: RegistryConfig,
}

impl SiteRegistry {
    pub fn new(
        sites: Arc<dyn SitesRepo>,
        hosting: Arc<dyn HostingApi>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            sites,
            hosting,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn project_for(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(&self.config.default_project_id)
            .to_string()
    }

    pub fn default_url(&self, site_id: &str) -> String {
        default_site_url(site_id, &self.config.default_domain_suffix)
    }

    pub async fn ensure_site(&self, cmd: EnsureSiteCommand) -> Result<EnsuredSite, RegistryError> {
        for (field, value) in [
            ("business_name", &cmd.business_name),
            ("lead_id", &cmd.lead_id),
            ("agency_id", &cmd.agency_id),
            ("user_id", &cmd.user_id),
        ] {
            if value.trim().is_empty() {
                return Err(RegistryError::Validation(format!("`{field}` is required")));
            }
        }

        let project_id = self.project_for(cmd.project_id.as_deref());
        let site_id = derive_site_id(&self.config.namespace, &cmd.business_name, &cmd.lead_id);
        let site = SiteRef::new(project_id.clone(), site_id.clone());

        let (is_new, remote_url) = if let Some(existing) = self.sites.find_site(&site_id).await? {
            (false, Some(existing.default_url))
        } else if let Some(remote) = self.hosting.get_site(&site).await? {
            (false, remote.default_url)
        } else {
            self.create_remote_site(&site, &cmd).await?
        };

        let default_url = remote_url.unwrap_or_else(|| self.default_url(&site_id));

        self.sites
            .upsert_site(UpsertSiteParams {
                site_id: site_id.clone(),
                project_id: project_id.clone(),
                agency_id: cmd.agency_id.trim().to_string(),
                lead_id: cmd.lead_id.trim().to_string(),
                user_id: cmd.user_id.trim().to_string(),
                business_name: cmd.business_name.trim().to_string(),
                site_kind: cmd.site_kind,
                default_url: default_url.clone(),
            })
            .await?;

        info!(
            target = "application::registry",
            site_id = %site_id,
            project_id = %project_id,
            is_new,
            "Site ensured"
        );

        Ok(EnsuredSite {
            site_id,
            project_id,
            is_new,
            default_url,
        })
    }

    async fn create_remote_site(
        &self,
        site: &SiteRef,
        cmd: &EnsureSiteCommand,
    ) -> Result<(bool, Option<String>), RegistryError> {
        let labels = BTreeMap::from([
            ("agency_id".to_string(), cmd.agency_id.trim().to_string()),
            ("lead_id".to_string(), cmd.lead_id.trim().to_string()),
            ("user_id".to_string(), cmd.user_id.trim().to_string()),
            ("managed_by".to_string(), MANAGED_BY_LABEL.to_string()),
        ]);

        let created = retry_with_backoff(
            &self.config.retry,
            "create_site",
            HostingError::is_retryable,
            |_| self.hosting.create_site(site, &labels),
        )
        .await;

        match created {
            Ok(remote) => Ok((true, remote.default_url)),
            Err(HostingError::AlreadyExists { .. }) => Ok((false, None)),
            Err(err) => Err(err.into()),
        }
    }
}
