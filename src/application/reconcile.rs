//! Status reconciliation: re-reads provider state for in-flight connections,
//! maps it onto the connection state machine, and decides whether and when to
//! check again.

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, stream};
use metrics::counter;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::connections::record_completion;
use crate::application::hosting::{CustomDomain, HostingApi, SiteRef};
use crate::application::repos::{
    ConnectionsRepo, CreateConnectionEventParams, EventsRepo, RepoError, SiteDomainParams,
    SitesRepo,
};
use crate::domain::dns::{build_dns_records, verification_token};
use crate::domain::entities::ConnectionRecord;
use crate::domain::status::{status_message, tls_status};
use crate::domain::types::{
    CertState, ConnectionEventKind, ConnectionPhase, ConnectionStatus, DnsRecordType, SiteStatus,
};

const METRIC_RECONCILE_POLLS: &str = "siteline_reconcile_polls_total";

/// Statuses the scheduler scan picks up. The two connect-flow statuses are
/// only due once they outlive `max_age`, so an interrupted flow cannot hold
/// its domain forever.
pub const POLLING_STATUSES: [ConnectionStatus; 7] = [
    ConnectionStatus::CreatingSite,
    ConnectionStatus::DeployingContent,
    ConnectionStatus::AddingDomain,
    ConnectionStatus::PendingDns,
    ConnectionStatus::DnsPropagating,
    ConnectionStatus::PendingSsl,
    ConnectionStatus::SslProvisioning,
];

/// Slack allowed between the cron cadence and a connection's poll interval.
const SCAN_TOLERANCE: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("connection {0} not found")]
    NotFound(Uuid),
    #[error("connection {connection_id} does not belong to {field} `{value}`")]
    TargetMismatch {
        connection_id: Uuid,
        field: &'static str,
        value: String,
    },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Minimum spacing between checks, per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub dns_interval: Duration,
    pub ssl_interval: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            dns_interval: Duration::from_secs(5 * 60),
            ssl_interval: Duration::from_secs(15 * 60),
        }
    }
}

impl PollSchedule {
    pub fn interval_for(&self, status: ConnectionStatus) -> Option<Duration> {
        match status.phase()? {
            ConnectionPhase::Dns => Some(self.dns_interval),
            ConnectionPhase::Ssl => Some(self.ssl_interval),
        }
    }

    pub fn next_check_at(
        &self,
        status: ConnectionStatus,
        now: OffsetDateTime,
    ) -> Option<OffsetDateTime> {
        self.interval_for(status).map(|interval| now + interval)
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub schedule: PollSchedule,
    pub dns_max_attempts: i32,
    pub ssl_max_attempts: i32,
    pub max_age: Duration,
    pub batch_size: u32,
    pub concurrency: usize,
    pub fallback_host_addresses: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            schedule: PollSchedule::default(),
            dns_max_attempts: 60,
            ssl_max_attempts: 96,
            max_age: Duration::from_secs(72 * 60 * 60),
            batch_size: 25,
            concurrency: 4,
            fallback_host_addresses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub connection_id: Uuid,
    pub site_id: Option<String>,
    pub domain: Option<String>,
}

impl PollTarget {
    pub fn connection(connection_id: Uuid) -> Self {
        Self {
            connection_id,
            site_id: None,
            domain: None,
        }
    }

    fn for_record(record: &ConnectionRecord) -> Self {
        Self {
            connection_id: record.id,
            site_id: Some(record.site_id.clone()),
            domain: record.domain.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub is_complete: bool,
    pub requires_retry: bool,
    pub next_check_delay: Option<Duration>,
    pub status: ConnectionStatus,
    pub error: Option<String>,
}

impl PollOutcome {
    fn complete() -> Self {
        Self {
            is_complete: true,
            requires_retry: false,
            next_check_delay: None,
            status: ConnectionStatus::Connected,
            error: None,
        }
    }

    fn stopped(status: ConnectionStatus, error: Option<String>) -> Self {
        Self {
            is_complete: false,
            requires_retry: false,
            next_check_delay: None,
            status,
            error,
        }
    }

    fn retry(status: ConnectionStatus, delay: Duration, error: Option<String>) -> Self {
        Self {
            is_complete: false,
            requires_retry: true,
            next_check_delay: Some(delay),
            status,
            error,
        }
    }
}

/// Tally of one scheduler scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned: usize,
    pub polled: usize,
    pub skipped: usize,
    pub completed: usize,
    pub failed: usize,
    pub errors: usize,
}

#[derive(Clone)]
pub struct Reconciler {
    sites: Arc<dyn SitesRepo>,
    connections: Arc<dyn ConnectionsRepo>,
    events: Arc<dyn EventsRepo>,
    hosting: Arc<dyn HostingApi>,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        sites: Arc<dyn SitesRepo>,
        connections: Arc<dyn ConnectionsRepo>,
        events: Arc<dyn EventsRepo>,
        hosting: Arc<dyn HostingApi>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            sites,
            connections,
            events,
            hosting,
            config,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    #[instrument(skip_all, fields(connection_id = %target.connection_id))]
    pub async fn poll_once(&self, target: PollTarget) -> Result<PollOutcome, ReconcileError> {
        let mut record = self
            .connections
            .find_connection(target.connection_id)
            .await?
            .ok_or(ReconcileError::NotFound(target.connection_id))?;
        check_target(&target, &record)?;

        let status = record.status;
        if status == ConnectionStatus::Connected {
            counter!(METRIC_RECONCILE_POLLS, "outcome" => "noop").increment(1);
            return Ok(PollOutcome::complete());
        }
        if status.is_terminal() {
            counter!(METRIC_RECONCILE_POLLS, "outcome" => "noop").increment(1);
            return Ok(PollOutcome::stopped(status, record.error_message));
        }

        let now = OffsetDateTime::now_utc();
        if record.created_at + self.config.max_age < now {
            let message = format!(
                "domain verification did not complete within {} hours",
                self.config.max_age.as_secs() / 3600
            );
            return self.fail_verification(&mut record, message).await;
        }

        let Some(phase) = status.phase() else {
            // Still inside the synchronous connect flow.
            return Ok(PollOutcome::retry(
                status,
                self.config.schedule.dns_interval,
                None,
            ));
        };

        let (attempts, ceiling, label) = match phase {
            ConnectionPhase::Dns => (
                record.dns_attempts,
                self.config.dns_max_attempts,
                "dns verification",
            ),
            ConnectionPhase::Ssl => (
                record.ssl_attempts,
                self.config.ssl_max_attempts,
                "certificate provisioning",
            ),
        };
        if attempts >= ceiling {
            let message = format!("{label} did not complete after {attempts} checks");
            return self.fail_verification(&mut record, message).await;
        }

        let Some(domain) = record.domain.clone() else {
            return Ok(PollOutcome::stopped(
                status,
                Some("connection has no custom domain to verify".to_string()),
            ));
        };

        let site = SiteRef::new(record.project_id.clone(), record.site_id.clone());
        let interval = self.config.schedule.interval_for(status).unwrap_or_default();

        match self.hosting.get_custom_domain(&site, &domain).await {
            Err(err) => {
                warn!(
                    target = "application::reconcile",
                    connection_id = %record.id,
                    domain = %domain,
                    error = %err,
                    "Custom domain status check failed"
                );
                let message = format!("status check failed: {err}");
                record.last_checked_at = Some(now);
                record.next_check_at = Some(now + interval);
                record.error_message = Some(message.clone());
                self.connections.save_connection(&record).await?;
                counter!(METRIC_RECONCILE_POLLS, "outcome" => "fetch_error").increment(1);
                Ok(PollOutcome::retry(status, interval, Some(message)))
            }
            Ok(None) => {
                let message = "custom domain is not registered at the hosting provider".to_string();
                match phase {
                    ConnectionPhase::Dns => record.dns_attempts += 1,
                    ConnectionPhase::Ssl => record.ssl_attempts += 1,
                }
                record.poll_count += 1;
                record.last_checked_at = Some(now);
                record.next_check_at = Some(now + interval);
                record.error_message = Some(message.clone());
                self.connections.save_connection(&record).await?;
                counter!(METRIC_RECONCILE_POLLS, "outcome" => "missing").increment(1);
                Ok(PollOutcome::retry(status, interval, Some(message)))
            }
            Ok(Some(remote)) => self.apply_remote(&mut record, &domain, remote, now).await,
        }
    }

    /// Poll every due connection from one bounded batch.
    pub async fn poll_due(&self) -> Result<ScanSummary, ReconcileError> {
        let candidates = self
            .connections
            .list_by_status(&POLLING_STATUSES, self.config.batch_size)
            .await?;
        let now = OffsetDateTime::now_utc();

        let mut summary = ScanSummary {
            scanned: candidates.len(),
            ..ScanSummary::default()
        };

        let due: Vec<PollTarget> = candidates
            .iter()
            .filter(|record| self.is_due(record, now))
            .map(PollTarget::for_record)
            .collect();
        summary.skipped = summary.scanned - due.len();

        let results: Vec<Result<PollOutcome, ReconcileError>> = stream::iter(due)
            .map(|target| self.poll_once(target))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                Ok(outcome) => {
                    summary.polled += 1;
                    if outcome.is_complete {
                        summary.completed += 1;
                    } else if !outcome.requires_retry {
                        summary.failed += 1;
                    }
                }
                Err(err) => {
                    summary.errors += 1;
                    warn!(
                        target = "application::reconcile",
                        error = %err,
                        "Connection poll failed"
                    );
                }
            }
        }

        info!(
            target = "application::reconcile",
            scanned = summary.scanned,
            polled = summary.polled,
            skipped = summary.skipped,
            completed = summary.completed,
            failed = summary.failed,
            errors = summary.errors,
            "Reconciliation scan finished"
        );

        Ok(summary)
    }

    fn is_due(&self, record: &ConnectionRecord, now: OffsetDateTime) -> bool {
        if record.status.phase().is_none() {
            return record.created_at + self.config.max_age < now;
        }
        let (Some(last_checked_at), Some(interval)) = (
            record.last_checked_at,
            self.config.schedule.interval_for(record.status),
        ) else {
            return true;
        };
        let wait = interval.saturating_sub(SCAN_TOLERANCE);
        last_checked_at + wait <= now
    }

    async fn apply_remote(
        &self,
        record: &mut ConnectionRecord,
        domain: &str,
        remote: CustomDomain,
        now: OffsetDateTime,
    ) -> Result<PollOutcome, ReconcileError> {
        let previous = record.status;
        let status = remote.states.status();

        match status.phase() {
            Some(ConnectionPhase::Dns) => record.dns_attempts += 1,
            Some(ConnectionPhase::Ssl) => record.ssl_attempts += 1,
            None => {}
        }
        record.poll_count += 1;
        record.status = status;
        record.host_state = Some(remote.states.host.as_str().to_string());
        record.ownership_state = Some(remote.states.ownership.as_str().to_string());
        record.cert_state = Some(remote.states.cert.as_str().to_string());
        if !remote.desired_records.is_empty() {
            let default_host = record
                .dns_records
                .iter()
                .find(|dns| dns.record_type == DnsRecordType::Cname)
                .map(|dns| dns.value.clone())
                .unwrap_or_default();
            record.dns_records = build_dns_records(
                domain,
                &remote.desired_records,
                &self.config.fallback_host_addresses,
                &default_host,
            );
            record.verification_token = verification_token(&record.dns_records);
        }
        record.error_message = status_message(remote.states);
        record.last_checked_at = Some(now);
        record.next_check_at = self.config.schedule.next_check_at(status, now);

        debug!(
            target = "application::reconcile",
            connection_id = %record.id,
            from = previous.as_str(),
            to = status.as_str(),
            ownership = remote.states.ownership.as_str(),
            host = remote.states.host.as_str(),
            cert = remote.states.cert.as_str(),
            "Remote state mapped"
        );

        match status {
            ConnectionStatus::Error => {
                let message = record
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "hosting provider reported a conflict".to_string());
                self.fail(record, message.clone()).await?;
                counter!(METRIC_RECONCILE_POLLS, "outcome" => "failed").increment(1);
                Ok(PollOutcome::stopped(status, Some(message)))
            }
            ConnectionStatus::Connected => {
                self.connections.save_connection(record).await?;
                self.mirror_site(record, remote.states.cert, SiteStatus::Active)
                    .await?;
                record_completion(
                    self.connections.as_ref(),
                    self.events.as_ref(),
                    record,
                    now,
                )
                .await?;
                counter!(METRIC_RECONCILE_POLLS, "outcome" => "connected").increment(1);
                info!(
                    target = "application::reconcile",
                    connection_id = %record.id,
                    domain,
                    dns_attempts = record.dns_attempts,
                    ssl_attempts = record.ssl_attempts,
                    "Custom domain connected"
                );
                Ok(PollOutcome::complete())
            }
            _ => {
                self.connections.save_connection(record).await?;
                self.mirror_site(record, remote.states.cert, SiteStatus::DomainPending)
                    .await?;
                counter!(METRIC_RECONCILE_POLLS, "outcome" => "pending").increment(1);
                let delay = self.config.schedule.interval_for(status).unwrap_or_default();
                Ok(PollOutcome::retry(
                    status,
                    delay,
                    record.error_message.clone(),
                ))
            }
        }
    }

    async fn mirror_site(
        &self,
        record: &ConnectionRecord,
        cert: CertState,
        status: SiteStatus,
    ) -> Result<(), RepoError> {
        self.sites
            .attach_domain(SiteDomainParams {
                site_id: record.site_id.clone(),
                custom_domain: record.domain.clone(),
                connection_id: record.id,
                tls_status: Some(tls_status(cert)),
                status,
            })
            .await
    }

    async fn fail_verification(
        &self,
        record: &mut ConnectionRecord,
        message: String,
    ) -> Result<PollOutcome, ReconcileError> {
        record.status = ConnectionStatus::VerificationFailed;
        record.next_check_at = None;
        self.fail(record, message.clone()).await?;
        counter!(METRIC_RECONCILE_POLLS, "outcome" => "verification_failed").increment(1);
        Ok(PollOutcome::stopped(
            ConnectionStatus::VerificationFailed,
            Some(message),
        ))
    }

    async fn fail(&self, record: &mut ConnectionRecord, message: String) -> Result<(), RepoError> {
        record.error_message = Some(message.clone());
        self.connections.save_connection(record).await?;
        self.sites
            .update_site_status(&record.site_id, SiteStatus::Error, Some(message.clone()))
            .await?;
        self.events
            .append_event(CreateConnectionEventParams {
                connection_id: record.id,
                site_id: record.site_id.clone(),
                kind: ConnectionEventKind::Failed,
                payload: json!({
                    "domain": record.domain,
                    "status": record.status.as_str(),
                    "dns_attempts": record.dns_attempts,
                    "ssl_attempts": record.ssl_attempts,
                    "error": message,
                }),
            })
            .await?;

        warn!(
            target = "application::reconcile",
            connection_id = %record.id,
            status = record.status.as_str(),
            error = %message,
            "Connection stopped"
        );
        Ok(())
    }
}

fn check_target(target: &PollTarget, record: &ConnectionRecord) -> Result<(), ReconcileError> {
    if let Some(site_id) = target.site_id.as_deref()
        && site_id != record.site_id
    {
        return Err(ReconcileError::TargetMismatch {
            connection_id: record.id,
            field: "site",
            value: site_id.to_string(),
        });
    }
    if let Some(domain) = target.domain.as_deref()
        && record
            .domain
            .as_deref()
            .is_none_or(|stored| !stored.eq_ignore_ascii_case(domain))
    {
        return Err(ReconcileError::TargetMismatch {
            connection_id: record.id,
            field: "domain",
            value: domain.to_string(),
        });
    }
    Ok(())
}
