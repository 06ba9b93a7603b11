//! Hosting provider REST client and its process-wide handle.

mod wire;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::OnceCell;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::application::hosting::{
    CustomDomain, HostedSite, HostingApi, HostingError, PopulateOutcome, SiteRef, VersionConfig,
};
use crate::config::HostingSettings;

use wire::{
    CreateSiteBody, CreateVersionBody, CustomDomainBody, ErrorEnvelope, FinalizeBody, NamedBody,
    OperationBody, PopulateFilesBody, PopulateFilesResponse, ReleaseBody, SiteBody, last_segment,
};

const API_VERSION: &str = "v1beta1";

#[derive(Debug, Clone)]
pub struct HostingClientConfig {
    pub api_base_url: Url,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl From<&HostingSettings> for HostingClientConfig {
    fn from(settings: &HostingSettings) -> Self {
        Self {
            api_base_url: settings.api_base_url.clone(),
            access_token: settings.access_token.clone(),
            request_timeout: settings.request_timeout,
        }
    }
}

#[derive(Debug, Error)]
pub enum HostingClientError {
    #[error("hosting client already configured")]
    AlreadyConfigured,
    #[error("failed to build hosting client: {0}")]
    Build(#[from] reqwest::Error),
}

static HOSTING_CLIENT: OnceCell<Arc<RestHostingClient>> = OnceCell::new();

/// Install the process-wide hosting client. Only the first call succeeds.
pub fn configure_hosting_client(
    config: HostingClientConfig,
) -> Result<Arc<RestHostingClient>, HostingClientError> {
    let client = Arc::new(RestHostingClient::new(config)?);
    HOSTING_CLIENT
        .set(client.clone())
        .map_err(|_| HostingClientError::AlreadyConfigured)?;
    Ok(client)
}

pub fn hosting_client() -> Result<Arc<RestHostingClient>, HostingError> {
    HOSTING_CLIENT.get().cloned().ok_or(HostingError::NotConfigured)
}

#[derive(Debug, Clone)]
pub struct RestHostingClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl RestHostingClient {
    pub fn new(config: HostingClientConfig) -> Result<Self, HostingClientError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base: config.api_base_url,
            token: config.access_token,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("siteline/", env!("CARGO_PKG_VERSION"))
    }

    fn site_path(site: &SiteRef) -> String {
        format!(
            "{API_VERSION}/projects/{}/sites/{}",
            site.project_id, site.site_id
        )
    }

    fn url(&self, path: &str) -> Result<Url, HostingError> {
        let base = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|err| HostingError::protocol(format!("invalid request url: {err}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        resource: &str,
    ) -> Result<Response, HostingError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        debug!(
            target = "infra::hosting",
            status = status.as_u16(),
            resource,
            message = %message,
            "Hosting request rejected"
        );

        Err(match status {
            StatusCode::CONFLICT => HostingError::AlreadyExists {
                resource: resource.to_string(),
            },
            StatusCode::NOT_FOUND => HostingError::NotFound {
                resource: resource.to_string(),
            },
            other => HostingError::Status {
                status: other.as_u16(),
                message,
            },
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, HostingError> {
        let bytes = response.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&bytes).map_err(|err| HostingError::Decode(err.to_string()))
    }

    fn absent<T>(result: Result<T, HostingError>) -> Result<Option<T>, HostingError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(HostingError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn transport_error(err: reqwest::Error) -> HostingError {
    if err.is_decode() {
        HostingError::Decode(err.to_string())
    } else {
        HostingError::Transport(err.to_string())
    }
}

fn resource_id(name: &str, kind: &str) -> Result<String, HostingError> {
    last_segment(name)
        .map(str::to_string)
        .ok_or_else(|| HostingError::protocol(format!("{kind} response carried no name")))
}

#[async_trait]
impl HostingApi for RestHostingClient {
    async fn get_site(&self, site: &SiteRef) -> Result<Option<HostedSite>, HostingError> {
        let url = self.url(&Self::site_path(site))?;
        let result = async {
            let response = self.send(self.request(Method::GET, url), "site").await?;
            Self::json::<SiteBody>(response).await
        }
        .await;

        Ok(Self::absent(result)?.map(|body| body.into_hosted(&site.site_id)))
    }

    async fn create_site(
        &self,
        site: &SiteRef,
        labels: &BTreeMap<String, String>,
    ) -> Result<HostedSite, HostingError> {
        let mut url = self.url(&format!("{API_VERSION}/projects/{}/sites", site.project_id))?;
        url.query_pairs_mut().append_pair("siteId", &site.site_id);

        let response = self
            .send(
                self.request(Method::POST, url)
                    .json(&CreateSiteBody { labels }),
                "site",
            )
            .await?;
        let body: SiteBody = Self::json(response).await?;
        Ok(body.into_hosted(&site.site_id))
    }

    async fn create_version(
        &self,
        site: &SiteRef,
        config: &VersionConfig,
    ) -> Result<String, HostingError> {
        let url = self.url(&format!("{}/versions", Self::site_path(site)))?;
        let response = self
            .send(
                self.request(Method::POST, url)
                    .json(&CreateVersionBody::from(config)),
                "version",
            )
            .await?;
        let body: NamedBody = Self::json(response).await?;
        resource_id(&body.name, "version")
    }

    async fn populate_files(
        &self,
        site: &SiteRef,
        version_id: &str,
        manifest: &BTreeMap<String, String>,
    ) -> Result<PopulateOutcome, HostingError> {
        let url = self.url(&format!(
            "{}/versions/{version_id}:populateFiles",
            Self::site_path(site)
        ))?;
        let response = self
            .send(
                self.request(Method::POST, url)
                    .json(&PopulateFilesBody { files: manifest }),
                "version files",
            )
            .await?;
        let body: PopulateFilesResponse = Self::json(response).await?;
        Ok(PopulateOutcome {
            upload_required_hashes: body.upload_required_hashes,
            upload_url: body.upload_url.filter(|url| !url.is_empty()),
        })
    }

    async fn upload_blob(
        &self,
        upload_url: &str,
        hash: &str,
        gzipped: Bytes,
    ) -> Result<(), HostingError> {
        let url = Url::parse(&format!("{}/{hash}", upload_url.trim_end_matches('/')))
            .map_err(|err| HostingError::protocol(format!("invalid upload url: {err}")))?;
        self.send(
            self.request(Method::POST, url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(gzipped),
            "file upload",
        )
        .await?;
        Ok(())
    }

    async fn finalize_version(
        &self,
        site: &SiteRef,
        version_id: &str,
    ) -> Result<(), HostingError> {
        let mut url = self.url(&format!("{}/versions/{version_id}", Self::site_path(site)))?;
        url.query_pairs_mut().append_pair("update_mask", "status");
        self.send(
            self.request(Method::PATCH, url).json(&FinalizeBody {
                status: "FINALIZED",
            }),
            "version",
        )
        .await?;
        Ok(())
    }

    async fn create_release(
        &self,
        site: &SiteRef,
        version_id: &str,
        message: Option<&str>,
    ) -> Result<String, HostingError> {
        let mut url = self.url(&format!("{}/releases", Self::site_path(site)))?;
        url.query_pairs_mut().append_pair(
            "versionName",
            &format!("sites/{}/versions/{version_id}", site.site_id),
        );
        let response = self
            .send(
                self.request(Method::POST, url)
                    .json(&ReleaseBody { message }),
                "release",
            )
            .await?;
        let body: NamedBody = Self::json(response).await?;
        resource_id(&body.name, "release")
    }

    async fn create_custom_domain(
        &self,
        site: &SiteRef,
        domain: &str,
    ) -> Result<CustomDomain, HostingError> {
        let mut url = self.url(&format!("{}/customDomains", Self::site_path(site)))?;
        url.query_pairs_mut().append_pair("customDomainId", domain);
        let response = self
            .send(
                self.request(Method::POST, url)
                    .json(&serde_json::json!({})),
                "custom domain",
            )
            .await?;
        let operation: OperationBody = Self::json(response).await?;

        if let Some(error) = operation.error {
            return Err(HostingError::Status {
                status: 400,
                message: error.message,
            });
        }
        match operation.response {
            Some(body) if operation.done => Ok(body.into_domain(domain)),
            _ => self
                .get_custom_domain(site, domain)
                .await?
                .ok_or_else(|| HostingError::protocol("custom domain vanished after creation")),
        }
    }

    async fn get_custom_domain(
        &self,
        site: &SiteRef,
        domain: &str,
    ) -> Result<Option<CustomDomain>, HostingError> {
        let url = self.url(&format!(
            "{}/customDomains/{domain}",
            Self::site_path(site)
        ))?;
        let result = async {
            let response = self
                .send(self.request(Method::GET, url), "custom domain")
                .await?;
            Self::json::<CustomDomainBody>(response).await
        }
        .await;

        Ok(Self::absent(result)?.map(|body| body.into_domain(domain)))
    }

    async fn delete_custom_domain(
        &self,
        site: &SiteRef,
        domain: &str,
    ) -> Result<(), HostingError> {
        let url = self.url(&format!(
            "{}/customDomains/{domain}",
            Self::site_path(site)
        ))?;
        match self
            .send(self.request(Method::DELETE, url), "custom domain")
            .await
        {
            Ok(_) | Err(HostingError::NotFound { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
