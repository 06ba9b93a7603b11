//! Domain connection orchestration: site, content, domain registration, DNS
//! instructions, and the caller-initiated disconnect.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::deploy::{ContentDeployer, DeployCommand, DeployError};
use crate::application::dns::{DnsAutomation, missing_records};
use crate::application::hosting::{CustomDomain, HostingApi, HostingError, SiteRef};
use crate::application::reconcile::PollSchedule;
use crate::application::registry::{EnsureSiteCommand, RegistryError, SiteRegistry};
use crate::application::repos::{
    ConnectionsRepo, CreateConnectionEventParams, CreateConnectionParams, EventsRepo, RepoError,
    SiteDomainParams, SitesRepo,
};
use crate::application::retry::{RetryPolicy, retry_with_backoff};
use crate::domain::dns::{build_dns_records, pending_records, verification_token};
use crate::domain::entities::{ConnectionEventRecord, ConnectionRecord};
use crate::domain::hostname::normalize_domain;
use crate::domain::site_id::derive_site_id;
use crate::domain::status::{status_message, tls_status};
use crate::domain::types::{
    ConnectionEventKind, ConnectionMethod, ConnectionStatus, SiteKind, SiteStatus,
};
use siteline_api_types::DnsRecord;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid connection request: {0}")]
    Validation(String),
    #[error("domain `{domain}` is already connected by connection {connection_id}")]
    DomainClaimed { domain: String, connection_id: Uuid },
    #[error("connection {0} not found")]
    NotFound(Uuid),
    #[error("site registration failed for connection {connection_id}: {source}")]
    Registry {
        connection_id: Uuid,
        source: RegistryError,
    },
    #[error("content deploy failed for connection {connection_id}: {source}")]
    Deploy {
        connection_id: Uuid,
        source: DeployError,
    },
    #[error("hosting provider failed for connection {connection_id}: {source}")]
    Hosting {
        connection_id: Uuid,
        source: HostingError,
    },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl ConnectionError {
    /// Id of the connection record the failure was recorded on, if one exists.
    pub fn connection_id(&self) -> Option<Uuid> {
        match self {
            ConnectionError::Registry { connection_id, .. }
            | ConnectionError::Deploy { connection_id, .. }
            | ConnectionError::Hosting { connection_id, .. } => Some(*connection_id),
            ConnectionError::NotFound(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionsConfig {
    pub fallback_host_addresses: Vec<String>,
    pub schedule: PollSchedule,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct ConnectCommand {
    pub project_id: Option<String>,
    pub domain: String,
    pub lead_id: String,
    pub agency_id: String,
    pub user_id: String,
    pub business_name: String,
    pub html_content: Option<String>,
    pub method: ConnectionMethod,
}

#[derive(Debug, Clone)]
pub struct LaunchCommand {
    pub project_id: Option<String>,
    pub lead_id: String,
    pub agency_id: String,
    pub user_id: String,
    pub business_name: String,
    pub html_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOutcome {
    pub connection_id: Uuid,
    pub site_id: String,
    pub site_url: String,
    pub status: ConnectionStatus,
    pub dns_records: Vec<DnsRecord>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ConnectionOrchestrator {
    sites: Arc<dyn SitesRepo>,
    connections: Arc<dyn ConnectionsRepo>,
    events: Arc<dyn EventsRepo>,
    registry: SiteRegistry,
    deployer: ContentDeployer,
    hosting: Arc<dyn HostingApi>,
    dns: Option<Arc<dyn DnsAutomation>>,
    config: ConnectionsConfig,
}

impl ConnectionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sites: Arc<dyn SitesRepo>,
        connections: Arc<dyn ConnectionsRepo>,
        events: Arc<dyn EventsRepo>,
        registry: SiteRegistry,
        deployer: ContentDeployer,
        hosting: Arc<dyn HostingApi>,
        dns: Option<Arc<dyn DnsAutomation>>,
        config: ConnectionsConfig,
    ) -> Self {
        Self {
            sites,
            connections,
            events,
            registry,
            deployer,
            hosting,
            dns,
            config,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<ConnectionRecord, ConnectionError> {
        self.connections
            .find_connection(id)
            .await?
            .ok_or(ConnectionError::NotFound(id))
    }

    /// Lifecycle events of a connection, oldest first.
    pub async fn history(
        &self,
        id: Uuid,
    ) -> Result<Vec<ConnectionEventRecord>, ConnectionError> {
        let record = self.get(id).await?;
        Ok(self.events.list_events(record.id).await?)
    }

    pub async fn connect(&self, cmd: ConnectCommand) -> Result<ConnectOutcome, ConnectionError> {
        if cmd.method == ConnectionMethod::Launch {
            return Err(ConnectionError::Validation(
                "launch connections are created through the launch flow".to_string(),
            ));
        }
        let domain = normalize_domain(&cmd.domain)
            .map_err(|err| ConnectionError::Validation(err.to_string()))?;
        require_fields(&[
            ("lead_id", &cmd.lead_id),
            ("agency_id", &cmd.agency_id),
            ("user_id", &cmd.user_id),
            ("business_name", &cmd.business_name),
        ])?;
        require_html(cmd.html_content.as_deref())?;

        if let Some(existing) = self.connections.find_active_by_domain(&domain).await? {
            return Err(ConnectionError::DomainClaimed {
                domain,
                connection_id: existing.id,
            });
        }

        let project_id = self.registry.project_for(cmd.project_id.as_deref());
        let site_id = derive_site_id(
            &self.registry.config().namespace,
            &cmd.business_name,
            &cmd.lead_id,
        );

        let created = self
            .connections
            .create_connection(CreateConnectionParams {
                domain: Some(domain.clone()),
                site_id: site_id.clone(),
                project_id: project_id.clone(),
                agency_id: cmd.agency_id.trim().to_string(),
                lead_id: cmd.lead_id.trim().to_string(),
                user_id: cmd.user_id.trim().to_string(),
                method: cmd.method,
            })
            .await;
        let mut record = match created {
            Ok(record) => record,
            Err(RepoError::Duplicate { .. }) => return Err(self.claimed_error(domain).await),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "application::connections",
            connection_id = %record.id,
            site_id = %site_id,
            domain = %domain,
            method = cmd.method.as_str(),
            "Connection started"
        );

        let site_url = self
            .prepare_site(
                &record,
                project_id.clone(),
                &cmd.business_name,
                cmd.html_content,
            )
            .await?;

        self.set_status(&mut record, ConnectionStatus::AddingDomain)
            .await?;
        let site = SiteRef::new(project_id, site_id.clone());
        let remote = match self.register_domain(&site, &domain).await {
            Ok(remote) => remote,
            Err(err) => {
                self.fail(&mut record, err.to_string(), true).await?;
                return Err(ConnectionError::Hosting {
                    connection_id: record.id,
                    source: err,
                });
            }
        };

        let now = OffsetDateTime::now_utc();
        let status = remote.states.status();
        record.status = status;
        record.host_state = Some(remote.states.host.as_str().to_string());
        record.ownership_state = Some(remote.states.ownership.as_str().to_string());
        record.cert_state = Some(remote.states.cert.as_str().to_string());
        record.dns_records = build_dns_records(
            &domain,
            &remote.desired_records,
            &self.config.fallback_host_addresses,
            &default_host(&site_url),
        );
        record.verification_token = verification_token(&record.dns_records);
        record.error_message = status_message(remote.states);
        record.last_checked_at = Some(now);
        record.next_check_at = self.config.schedule.next_check_at(status, now);

        if cmd.method == ConnectionMethod::Automated {
            self.automate_dns(&mut record, &domain).await;
        }

        if status == ConnectionStatus::Error {
            let message = record
                .error_message
                .clone()
                .unwrap_or_else(|| "domain registration reported a conflict".to_string());
            self.fail(&mut record, message, true).await?;
        } else {
            self.connections.save_connection(&record).await?;
            self.sites
                .attach_domain(SiteDomainParams {
                    site_id: site_id.clone(),
                    custom_domain: Some(domain.clone()),
                    connection_id: record.id,
                    tls_status: Some(tls_status(remote.states.cert)),
                    status: if status == ConnectionStatus::Connected {
                        SiteStatus::Active
                    } else {
                        SiteStatus::DomainPending
                    },
                })
                .await?;
            if status == ConnectionStatus::Connected {
                self.complete(&mut record, now).await?;
            }
        }

        info!(
            target = "application::connections",
            connection_id = %record.id,
            domain = %domain,
            status = record.status.as_str(),
            records = record.dns_records.len(),
            "Domain registered"
        );

        Ok(ConnectOutcome {
            connection_id: record.id,
            site_id,
            site_url,
            status: record.status,
            dns_records: record.dns_records,
            error: record.error_message,
        })
    }

    pub async fn launch(&self, cmd: LaunchCommand) -> Result<ConnectOutcome, ConnectionError> {
        require_fields(&[
            ("lead_id", &cmd.lead_id),
            ("agency_id", &cmd.agency_id),
            ("user_id", &cmd.user_id),
            ("business_name", &cmd.business_name),
        ])?;
        require_html(cmd.html_content.as_deref())?;

        let project_id = self.registry.project_for(cmd.project_id.as_deref());
        let site_id = derive_site_id(
            &self.registry.config().namespace,
            &cmd.business_name,
            &cmd.lead_id,
        );

        let mut record = self
            .connections
            .create_connection(CreateConnectionParams {
                domain: None,
                site_id: site_id.clone(),
                project_id: project_id.clone(),
                agency_id: cmd.agency_id.trim().to_string(),
                lead_id: cmd.lead_id.trim().to_string(),
                user_id: cmd.user_id.trim().to_string(),
                method: ConnectionMethod::Launch,
            })
            .await?;

        let site_url = self
            .prepare_site(&record, project_id, &cmd.business_name, cmd.html_content)
            .await?;

        let now = OffsetDateTime::now_utc();
        self.sites
            .attach_domain(SiteDomainParams {
                site_id: site_id.clone(),
                custom_domain: None,
                connection_id: record.id,
                tls_status: None,
                status: SiteStatus::Active,
            })
            .await?;
        self.complete(&mut record, now).await?;

        info!(
            target = "application::connections",
            connection_id = %record.id,
            site_id = %site_id,
            "Site launched"
        );

        Ok(ConnectOutcome {
            connection_id: record.id,
            site_id,
            site_url,
            status: record.status,
            dns_records: Vec::new(),
            error: None,
        })
    }

    pub async fn disconnect(&self, id: Uuid) -> Result<ConnectionRecord, ConnectionError> {
        let record = self.get(id).await?;
        if record.status == ConnectionStatus::Disconnected {
            return Ok(record);
        }

        if let Some(domain) = record.domain.as_deref() {
            let site = SiteRef::new(record.project_id.clone(), record.site_id.clone());
            let deleted = retry_with_backoff(
                &self.config.retry,
                "delete_custom_domain",
                HostingError::is_retryable,
                |_| self.hosting.delete_custom_domain(&site, domain),
            )
            .await;
            match deleted {
                Ok(()) | Err(HostingError::NotFound { .. }) => {}
                Err(err) => {
                    return Err(ConnectionError::Hosting {
                        connection_id: id,
                        source: err,
                    });
                }
            }
        }

        let now = OffsetDateTime::now_utc();
        self.connections.mark_disconnected(id, now).await?;

        if let Some(site) = self.sites.find_site(&record.site_id).await?
            && site.connection_id == Some(id)
        {
            self.sites.detach_domain(&record.site_id).await?;
        }

        self.events
            .append_event(CreateConnectionEventParams {
                connection_id: id,
                site_id: record.site_id.clone(),
                kind: ConnectionEventKind::Disconnected,
                payload: json!({
                    "domain": record.domain,
                    "previous_status": record.status.as_str(),
                }),
            })
            .await?;

        info!(
            target = "application::connections",
            connection_id = %id,
            site_id = %record.site_id,
            "Connection disconnected"
        );

        self.get(id).await
    }

    /// Ensure the site exists and publish content when supplied. Returns the
    /// site's default URL.
    async fn prepare_site(
        &self,
        record: &ConnectionRecord,
        project_id: String,
        business_name: &str,
        html_content: Option<String>,
    ) -> Result<String, ConnectionError> {
        let mut record = record.clone();

        let ensured = self
            .registry
            .ensure_site(EnsureSiteCommand {
                project_id: Some(project_id.clone()),
                business_name: business_name.to_string(),
                lead_id: record.lead_id.clone(),
                agency_id: record.agency_id.clone(),
                user_id: record.user_id.clone(),
                site_kind: SiteKind::Generated,
            })
            .await;
        let ensured = match ensured {
            Ok(ensured) => ensured,
            Err(err) => {
                self.fail(&mut record, err.to_string(), false).await?;
                return Err(ConnectionError::Registry {
                    connection_id: record.id,
                    source: err,
                });
            }
        };

        if let Some(html_content) = html_content {
            self.set_status(&mut record, ConnectionStatus::DeployingContent)
                .await?;
            let deployed = self
                .deployer
                .deploy(DeployCommand {
                    project_id: Some(project_id),
                    site_id: ensured.site_id.clone(),
                    html_content,
                    message: Some(format!("connection {}", record.id)),
                })
                .await;
            if let Err(err) = deployed {
                // The deployer already moved the site to `error`.
                self.fail(&mut record, err.to_string(), false).await?;
                return Err(ConnectionError::Deploy {
                    connection_id: record.id,
                    source: err,
                });
            }
        }

        Ok(ensured.default_url)
    }

    async fn register_domain(
        &self,
        site: &SiteRef,
        domain: &str,
    ) -> Result<CustomDomain, HostingError> {
        let created = retry_with_backoff(
            &self.config.retry,
            "create_custom_domain",
            HostingError::is_retryable,
            |_| self.hosting.create_custom_domain(site, domain),
        )
        .await;

        match created {
            Ok(remote) => Ok(remote),
            Err(HostingError::AlreadyExists { .. }) => self
                .hosting
                .get_custom_domain(site, domain)
                .await?
                .ok_or_else(|| HostingError::NotFound {
                    resource: format!("custom domain `{domain}`"),
                }),
            Err(err) => Err(err),
        }
    }

    /// Write the records the DNS host is missing. Failures are recorded on
    /// the connection without changing its status.
    async fn automate_dns(&self, record: &mut ConnectionRecord, domain: &str) {
        let Some(dns) = self.dns.as_ref() else {
            warn!(
                target = "application::connections",
                connection_id = %record.id,
                "Automated DNS requested but no DNS provider is configured"
            );
            return;
        };

        let wanted = pending_records(&record.dns_records);
        let result = async {
            let existing = dns.list_records(domain).await?;
            let missing = missing_records(&wanted, &existing);
            if !missing.is_empty() {
                dns.add_records(domain, &missing).await?;
            }
            Ok::<usize, crate::application::dns::DnsError>(missing.len())
        }
        .await;

        match result {
            Ok(written) => info!(
                target = "application::connections",
                connection_id = %record.id,
                domain,
                written,
                "DNS records written"
            ),
            Err(err) => {
                warn!(
                    target = "application::connections",
                    connection_id = %record.id,
                    domain,
                    error = %err,
                    "DNS automation failed"
                );
                record.error_message = Some(format!("dns automation failed: {err}"));
            }
        }
    }

    async fn claimed_error(&self, domain: String) -> ConnectionError {
        match self.connections.find_active_by_domain(&domain).await {
            Ok(Some(existing)) => ConnectionError::DomainClaimed {
                domain,
                connection_id: existing.id,
            },
            Ok(None) => ConnectionError::DomainClaimed {
                domain,
                connection_id: Uuid::nil(),
            },
            Err(err) => err.into(),
        }
    }

    async fn set_status(
        &self,
        record: &mut ConnectionRecord,
        status: ConnectionStatus,
    ) -> Result<(), RepoError> {
        record.status = status;
        self.connections
            .update_connection_status(record.id, status, None)
            .await
    }

    async fn fail(
        &self,
        record: &mut ConnectionRecord,
        message: String,
        mark_site: bool,
    ) -> Result<(), RepoError> {
        let previous = record.status;
        record.status = ConnectionStatus::Error;
        record.error_message = Some(message.clone());
        self.connections.save_connection(record).await?;

        if mark_site {
            self.sites
                .update_site_status(&record.site_id, SiteStatus::Error, Some(message.clone()))
                .await?;
        }

        self.events
            .append_event(CreateConnectionEventParams {
                connection_id: record.id,
                site_id: record.site_id.clone(),
                kind: ConnectionEventKind::Failed,
                payload: json!({
                    "domain": record.domain,
                    "failed_during": previous.as_str(),
                    "error": message,
                }),
            })
            .await?;

        warn!(
            target = "application::connections",
            connection_id = %record.id,
            failed_during = previous.as_str(),
            error = %message,
            "Connection failed"
        );
        Ok(())
    }

    async fn complete(
        &self,
        record: &mut ConnectionRecord,
        at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        record_completion(
            self.connections.as_ref(),
            self.events.as_ref(),
            record,
            at,
        )
        .await
    }
}

/// Transition to `connected` and append the completion event, at most once
/// per connection.
pub(crate) async fn record_completion(
    connections: &dyn ConnectionsRepo,
    events: &dyn EventsRepo,
    record: &mut ConnectionRecord,
    at: OffsetDateTime,
) -> Result<(), RepoError> {
    let transitioned = connections.mark_connected(record.id, at).await?;
    record.status = ConnectionStatus::Connected;
    if !transitioned {
        return Ok(());
    }
    record.connected_at = Some(at);

    metrics::counter!("siteline_connections_connected_total").increment(1);
    events
        .append_event(CreateConnectionEventParams {
            connection_id: record.id,
            site_id: record.site_id.clone(),
            kind: ConnectionEventKind::Connected,
            payload: json!({
                "domain": record.domain,
                "method": record.method.as_str(),
                "dns_attempts": record.dns_attempts,
                "ssl_attempts": record.ssl_attempts,
            }),
        })
        .await?;
    Ok(())
}

fn require_fields(fields: &[(&str, &String)]) -> Result<(), ConnectionError> {
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(ConnectionError::Validation(format!("`{field}` is required")));
        }
    }
    Ok(())
}

fn require_html(html_content: Option<&str>) -> Result<(), ConnectionError> {
    match html_content {
        Some(html) if html.trim().is_empty() => Err(ConnectionError::Validation(
            "html content must not be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

fn default_host(site_url: &str) -> String {
    site_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}
