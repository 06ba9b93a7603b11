//! Content release pipeline.
//!
//! A deploy opens a version, submits the content-addressed manifest, uploads
//! the blobs the provider lacks, then finalizes and releases the version. A
//! failure at any step abandons the version; retries re-run the whole
//! sequence against a fresh version.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::application::hosting::{HeaderRule, HostingApi, HostingError, SiteRef, VersionConfig};
use crate::application::repos::{RepoError, SitesRepo};
use crate::application::retry::{RetryPolicy, retry_with_backoff};
use crate::domain::error::DomainError;
use crate::domain::manifest::ReleaseFiles;
use crate::domain::types::SiteStatus;

const METRIC_DEPLOY_TOTAL: &str = "siteline_deploy_total";
const METRIC_DEPLOY_UPLOADED: &str = "siteline_deploy_uploaded_files_total";
const METRIC_DEPLOY_SKIPPED: &str = "siteline_deploy_skipped_files_total";
const METRIC_DEPLOY_DURATION_MS: &str = "siteline_deploy_duration_ms";

const STATIC_ASSET_GLOB: &str =
    "**/*.@(js|css|png|jpg|jpeg|gif|svg|webp|avif|ico|woff|woff2|ttf|otf)";
const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid deploy request: {0}")]
    Validation(String),
    #[error("site `{0}` is not registered")]
    SiteNotFound(String),
    #[error("deploy failed: {0}")]
    Hosting(#[from] HostingError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl DeployError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeployError::Hosting(err) if err.is_retryable())
    }
}

impl From<DomainError> for DeployError {
    fn from(err: DomainError) -> Self {
        DeployError::Validation(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DeployCommand {
    pub project_id: Option<String>,
    pub site_id: String,
    pub html_content: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedRelease {
    pub site_id: String,
    pub site_url: String,
    pub version_id: String,
    pub release_id: String,
    pub uploaded_files: usize,
    pub skipped_files: usize,
}

#[derive(Debug)]
struct PipelineOutcome {
    version_id: String,
    release_id: String,
    uploaded_files: usize,
    skipped_files: usize,
}

/// Serving configuration applied to every version.
pub fn release_config() -> VersionConfig {
    VersionConfig {
        clean_urls: true,
        headers: vec![
            HeaderRule {
                glob: STATIC_ASSET_GLOB.to_string(),
                headers: BTreeMap::from([(
                    "Cache-Control".to_string(),
                    IMMUTABLE_CACHE_CONTROL.to_string(),
                )]),
            },
            HeaderRule {
                glob: "**".to_string(),
                headers: BTreeMap::from([
                    ("X-Content-Type-Options".to_string(), "nosniff".to_string()),
                    ("X-Frame-Options".to_string(), "SAMEORIGIN".to_string()),
                    (
                        "Referrer-Policy".to_string(),
                        "strict-origin-when-cross-origin".to_string(),
                    ),
                ]),
            },
        ],
    }
}

#[derive(Clone)]
pub struct ContentDeployer {
    sites: Arc<dyn SitesRepo>,
    hosting: Arc<dyn HostingApi>,
    retry: RetryPolicy,
}

impl ContentDeployer {
    pub fn new(sites: Arc<dyn SitesRepo>, hosting: Arc<dyn HostingApi>, retry: RetryPolicy) -> Self {
        Self {
            sites,
            hosting,
            retry,
        }
    }

    #[instrument(skip_all, fields(site_id = %cmd.site_id))]
    pub async fn deploy(&self, cmd: DeployCommand) -> Result<DeployedRelease, DeployError> {
        let files = ReleaseFiles::for_page(&cmd.html_content)?;

        let site_record = self
            .sites
            .find_site(&cmd.site_id)
            .await?
            .ok_or_else(|| DeployError::SiteNotFound(cmd.site_id.clone()))?;

        let project_id = cmd
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(&site_record.project_id)
            .to_string();
        let site = SiteRef::new(project_id, site_record.site_id.clone());

        self.sites
            .update_site_status(&site.site_id, SiteStatus::Deploying, None)
            .await?;

        let started_at = Instant::now();
        let message = cmd.message.as_deref();
        let result = retry_with_backoff(
            &self.retry,
            "deploy",
            DeployError::is_retryable,
            |_| self.run_pipeline(&site, &files, message),
        )
        .await;
        histogram!(METRIC_DEPLOY_DURATION_MS)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(outcome) => {
                self.sites
                    .record_release(
                        &site.site_id,
                        &outcome.version_id,
                        &outcome.release_id,
                        OffsetDateTime::now_utc(),
                    )
                    .await?;
                counter!(METRIC_DEPLOY_TOTAL, "outcome" => "success").increment(1);

                info!(
                    target = "application::deploy",
                    site_id = %site.site_id,
                    version_id = %outcome.version_id,
                    release_id = %outcome.release_id,
                    uploaded = outcome.uploaded_files,
                    skipped = outcome.skipped_files,
                    "Release published"
                );

                Ok(DeployedRelease {
                    site_id: site.site_id,
                    site_url: site_record.default_url,
                    version_id: outcome.version_id,
                    release_id: outcome.release_id,
                    uploaded_files: outcome.uploaded_files,
                    skipped_files: outcome.skipped_files,
                })
            }
            Err(err) => {
                counter!(METRIC_DEPLOY_TOTAL, "outcome" => "failure").increment(1);
                warn!(
                    target = "application::deploy",
                    site_id = %site.site_id,
                    error = %err,
                    "Deploy failed"
                );
                self.sites
                    .update_site_status(&site.site_id, SiteStatus::Error, Some(err.to_string()))
                    .await?;
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        site: &SiteRef,
        files: &ReleaseFiles,
        message: Option<&str>,
    ) -> Result<PipelineOutcome, DeployError> {
        let version_id = self.hosting.create_version(site, &release_config()).await?;

        let manifest = files.manifest();
        let populated = self
            .hosting
            .populate_files(site, &version_id, &manifest)
            .await?;

        let required = &populated.upload_required_hashes;
        if !required.is_empty() {
            let upload_url = populated.upload_url.as_deref().ok_or_else(|| {
                HostingError::protocol("provider requested uploads without an upload url")
            })?;

            for hash in required {
                let file = files.by_hash(hash).ok_or_else(|| {
                    HostingError::protocol(format!("provider requested unknown hash `{hash}`"))
                })?;
                self.hosting
                    .upload_blob(upload_url, hash, file.gzipped.clone())
                    .await?;
            }
        }

        let uploaded_files = required.len();
        let skipped_files = files.len().saturating_sub(uploaded_files);
        counter!(METRIC_DEPLOY_UPLOADED).increment(uploaded_files as u64);
        counter!(METRIC_DEPLOY_SKIPPED).increment(skipped_files as u64);

        self.hosting.finalize_version(site, &version_id).await?;
        let release_id = self
            .hosting
            .create_release(site, &version_id, message)
            .await?;

        Ok(PipelineOutcome {
            version_id,
            release_id,
            uploaded_files,
            skipped_files,
        })
    }
}
