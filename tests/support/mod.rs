#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use siteline::application::connections::{ConnectionOrchestrator, ConnectionsConfig};
use siteline::application::deploy::ContentDeployer;
use siteline::application::dns::{DnsAutomation, DnsError};
use siteline::application::hosting::{
    CustomDomain, HostedSite, HostingApi, HostingError, PopulateOutcome, SiteRef, VersionConfig,
};
use siteline::application::reconcile::{PollSchedule, ReconcileConfig, Reconciler};
use siteline::application::registry::{RegistryConfig, SiteRegistry};
use siteline::application::repos::{
    ConnectionsRepo, CreateConnectionEventParams, CreateConnectionParams, EventsRepo, RepoError,
    SiteDomainParams, SitesRepo, UpsertSiteParams,
};
use siteline::application::retry::RetryPolicy;
use siteline::domain::dns::DesiredRecord;
use siteline::domain::entities::{ConnectionEventRecord, ConnectionRecord, SiteRecord};
use siteline::domain::status::RemoteStates;
use siteline::domain::types::{
    CertState, ConnectionEventKind, ConnectionStatus, DnsRecordType, HostState, OwnershipState,
    SiteStatus,
};
use siteline_api_types::DnsRecord;

pub const PROJECT_ID: &str = "demo-project";
pub const NAMESPACE: &str = "site";
pub const DOMAIN_SUFFIX: &str = "web.app";
pub const FALLBACK_ADDRESS: &str = "199.36.158.100";
pub const FALLBACK_ADDRESS_V6: &str = "2620:0:890::100";
pub const OWNERSHIP_TOKEN: &str = "hosting-site=verify-me";

const INACTIVE: [ConnectionStatus; 3] = [
    ConnectionStatus::Error,
    ConnectionStatus::VerificationFailed,
    ConnectionStatus::Disconnected,
];

pub fn states(ownership: OwnershipState, host: HostState, cert: CertState) -> RemoteStates {
    RemoteStates {
        ownership,
        host,
        cert,
    }
}

pub fn awaiting_dns() -> RemoteStates {
    states(
        OwnershipState::Missing,
        HostState::Unhosted,
        CertState::Unspecified,
    )
}

pub fn provisioning_cert() -> RemoteStates {
    states(
        OwnershipState::Active,
        HostState::Active,
        CertState::Propagating,
    )
}

pub fn fully_active() -> RemoteStates {
    states(OwnershipState::Active, HostState::Active, CertState::Active)
}

#[derive(Default)]
pub struct InMemorySites {
    sites: Mutex<HashMap<String, SiteRecord>>,
}

impl InMemorySites {
    pub async fn get(&self, site_id: &str) -> Option<SiteRecord> {
        self.sites.lock().await.get(site_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sites.lock().await.len()
    }
}

#[async_trait]
impl SitesRepo for InMemorySites {
    async fn find_site(&self, site_id: &str) -> Result<Option<SiteRecord>, RepoError> {
        Ok(self.sites.lock().await.get(site_id).cloned())
    }

    async fn upsert_site(&self, params: UpsertSiteParams) -> Result<SiteRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut sites = self.sites.lock().await;
        let record = sites
            .entry(params.site_id.clone())
            .and_modify(|site| {
                site.project_id = params.project_id.clone();
                site.agency_id = params.agency_id.clone();
                site.lead_id = params.lead_id.clone();
                site.user_id = params.user_id.clone();
                site.business_name = params.business_name.clone();
                site.site_kind = params.site_kind;
                site.default_url = params.default_url.clone();
                site.updated_at = now;
            })
            .or_insert_with(|| SiteRecord {
                site_id: params.site_id.clone(),
                project_id: params.project_id.clone(),
                agency_id: params.agency_id.clone(),
                lead_id: params.lead_id.clone(),
                user_id: params.user_id.clone(),
                business_name: params.business_name.clone(),
                site_kind: params.site_kind,
                default_url: params.default_url.clone(),
                status: SiteStatus::Creating,
                last_deployed_at: None,
                current_version_id: None,
                current_release_id: None,
                custom_domain: None,
                connection_id: None,
                tls_status: None,
                error_message: None,
                created_at: now,
                updated_at: now,
            });
        Ok(record.clone())
    }

    async fn update_site_status(
        &self,
        site_id: &str,
        status: SiteStatus,
        error_message: Option<String>,
    ) -> Result<(), RepoError> {
        let mut sites = self.sites.lock().await;
        let site = sites.get_mut(site_id).ok_or(RepoError::NotFound)?;
        site.status = status;
        site.error_message = error_message;
        site.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn record_release(
        &self,
        site_id: &str,
        version_id: &str,
        release_id: &str,
        deployed_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        let mut sites = self.sites.lock().await;
        let site = sites.get_mut(site_id).ok_or(RepoError::NotFound)?;
        site.status = SiteStatus::Active;
        site.current_version_id = Some(version_id.to_string());
        site.current_release_id = Some(release_id.to_string());
        site.last_deployed_at = Some(deployed_at);
        site.error_message = None;
        site.updated_at = deployed_at;
        Ok(())
    }

    async fn attach_domain(&self, params: SiteDomainParams) -> Result<(), RepoError> {
        let mut sites = self.sites.lock().await;
        let site = sites.get_mut(&params.site_id).ok_or(RepoError::NotFound)?;
        site.custom_domain = params.custom_domain;
        site.connection_id = Some(params.connection_id);
        site.tls_status = params.tls_status;
        site.status = params.status;
        site.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn detach_domain(&self, site_id: &str) -> Result<(), RepoError> {
        if let Some(site) = self.sites.lock().await.get_mut(site_id) {
            site.custom_domain = None;
            site.connection_id = None;
            site.tls_status = None;
            site.status = SiteStatus::Active;
            site.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryConnections {
    connections: Mutex<HashMap<Uuid, ConnectionRecord>>,
}

impl InMemoryConnections {
    pub async fn get(&self, id: Uuid) -> Option<ConnectionRecord> {
        self.connections.lock().await.get(&id).cloned()
    }

    /// Overwrite a stored record, including the columns the repo owns.
    pub async fn put(&self, record: ConnectionRecord) {
        self.connections.lock().await.insert(record.id, record);
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }
}

#[async_trait]
impl ConnectionsRepo for InMemoryConnections {
    async fn find_connection(&self, id: Uuid) -> Result<Option<ConnectionRecord>, RepoError> {
        Ok(self.connections.lock().await.get(&id).cloned())
    }

    async fn find_active_by_domain(
        &self,
        domain: &str,
    ) -> Result<Option<ConnectionRecord>, RepoError> {
        Ok(self
            .connections
            .lock()
            .await
            .values()
            .find(|record| {
                record.domain.as_deref() == Some(domain) && !INACTIVE.contains(&record.status)
            })
            .cloned())
    }

    async fn create_connection(
        &self,
        params: CreateConnectionParams,
    ) -> Result<ConnectionRecord, RepoError> {
        let mut connections = self.connections.lock().await;
        if let Some(domain) = params.domain.as_deref()
            && connections.values().any(|record| {
                record.domain.as_deref() == Some(domain) && !INACTIVE.contains(&record.status)
            })
        {
            return Err(RepoError::Duplicate {
                constraint: "domain_connections_active_domain_key".to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let record = ConnectionRecord {
            id: Uuid::new_v4(),
            domain: params.domain,
            site_id: params.site_id,
            project_id: params.project_id,
            agency_id: params.agency_id,
            lead_id: params.lead_id,
            user_id: params.user_id,
            method: params.method,
            status: ConnectionStatus::CreatingSite,
            dns_records: Vec::new(),
            host_state: None,
            ownership_state: None,
            cert_state: None,
            verification_token: None,
            dns_attempts: 0,
            ssl_attempts: 0,
            poll_count: 0,
            error_message: None,
            last_checked_at: None,
            next_check_at: None,
            connected_at: None,
            disconnected_at: None,
            created_at: now,
            updated_at: now,
        };
        connections.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_connection_status(
        &self,
        id: Uuid,
        status: ConnectionStatus,
        error_message: Option<String>,
    ) -> Result<(), RepoError> {
        let mut connections = self.connections.lock().await;
        let record = connections.get_mut(&id).ok_or(RepoError::NotFound)?;
        record.status = status;
        record.error_message = error_message;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn save_connection(&self, record: &ConnectionRecord) -> Result<(), RepoError> {
        let mut connections = self.connections.lock().await;
        let stored = connections.get_mut(&record.id).ok_or(RepoError::NotFound)?;
        let connected_at = stored.connected_at;
        let disconnected_at = stored.disconnected_at;
        let created_at = stored.created_at;
        *stored = record.clone();
        stored.connected_at = connected_at;
        stored.disconnected_at = disconnected_at;
        stored.created_at = created_at;
        stored.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn mark_connected(&self, id: Uuid, at: OffsetDateTime) -> Result<bool, RepoError> {
        let mut connections = self.connections.lock().await;
        let record = connections.get_mut(&id).ok_or(RepoError::NotFound)?;
        if record.connected_at.is_some() {
            return Ok(false);
        }
        record.status = ConnectionStatus::Connected;
        record.connected_at = Some(at);
        record.next_check_at = None;
        record.error_message = None;
        record.updated_at = at;
        Ok(true)
    }

    async fn mark_disconnected(&self, id: Uuid, at: OffsetDateTime) -> Result<(), RepoError> {
        let mut connections = self.connections.lock().await;
        let record = connections.get_mut(&id).ok_or(RepoError::NotFound)?;
        record.status = ConnectionStatus::Disconnected;
        record.disconnected_at = Some(at);
        record.next_check_at = None;
        record.updated_at = at;
        Ok(())
    }

    async fn list_by_status(
        &self,
        statuses: &[ConnectionStatus],
        limit: u32,
    ) -> Result<Vec<ConnectionRecord>, RepoError> {
        let mut matching: Vec<ConnectionRecord> = self
            .connections
            .lock()
            .await
            .values()
            .filter(|record| statuses.contains(&record.status))
            .cloned()
            .collect();
        // `None` sorts first, matching NULLS FIRST.
        matching.sort_by_key(|record| record.last_checked_at);
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryEvents {
    events: Mutex<Vec<ConnectionEventRecord>>,
}

impl InMemoryEvents {
    pub async fn kinds_for(&self, connection_id: Uuid) -> Vec<ConnectionEventKind> {
        self.list_events(connection_id)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|event| event.kind)
            .collect()
    }

    pub async fn count(&self, connection_id: Uuid, kind: ConnectionEventKind) -> usize {
        self.kinds_for(connection_id)
            .await
            .into_iter()
            .filter(|stored| *stored == kind)
            .count()
    }
}

#[async_trait]
impl EventsRepo for InMemoryEvents {
    async fn append_event(&self, params: CreateConnectionEventParams) -> Result<bool, RepoError> {
        let mut events = self.events.lock().await;
        if params.kind == ConnectionEventKind::Connected
            && events.iter().any(|event| {
                event.connection_id == params.connection_id
                    && event.kind == ConnectionEventKind::Connected
            })
        {
            return Ok(false);
        }
        events.push(ConnectionEventRecord {
            id: Uuid::new_v4(),
            connection_id: params.connection_id,
            site_id: params.site_id,
            kind: params.kind,
            payload: params.payload,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(true)
    }

    async fn list_events(
        &self,
        connection_id: Uuid,
    ) -> Result<Vec<ConnectionEventRecord>, RepoError> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|event| event.connection_id == connection_id)
            .cloned()
            .collect())
    }
}

/// Scripted answer for the next custom-domain status read.
pub enum DomainRead {
    States(RemoteStates),
    Missing,
    Fail(HostingError),
}

#[derive(Default)]
struct HostingState {
    sites: HashMap<String, HostedSite>,
    stored_hashes: HashSet<String>,
    uploads: Vec<String>,
    next_version: u32,
    finalized: Vec<String>,
    releases: Vec<(String, String)>,
    domains: HashMap<String, CustomDomain>,
    reads: VecDeque<DomainRead>,
    failures: HashMap<&'static str, VecDeque<HostingError>>,
    calls: Vec<&'static str>,
}

/// In-process hosting provider with content-addressed storage and scripted
/// custom-domain progress.
pub struct FakeHosting {
    state: Mutex<HostingState>,
    initial_domain_states: Mutex<RemoteStates>,
}

impl Default for FakeHosting {
    fn default() -> Self {
        Self {
            state: Mutex::new(HostingState::default()),
            initial_domain_states: Mutex::new(awaiting_dns()),
        }
    }
}

impl FakeHosting {
    pub async fn insert_site(&self, site_id: &str, default_url: &str) {
        self.state.lock().await.sites.insert(
            site_id.to_string(),
            HostedSite {
                site_id: site_id.to_string(),
                default_url: Some(default_url.to_string()),
                labels: BTreeMap::new(),
            },
        );
    }

    pub async fn set_initial_domain_states(&self, states: RemoteStates) {
        *self.initial_domain_states.lock().await = states;
    }

    pub async fn script_reads(&self, reads: impl IntoIterator<Item = DomainRead>) {
        self.state.lock().await.reads.extend(reads);
    }

    /// Make the next call of `operation` fail with `err`.
    pub async fn fail_next(&self, operation: &'static str, err: HostingError) {
        self.state
            .lock()
            .await
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    pub async fn calls(&self, operation: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    pub async fn uploads(&self) -> Vec<String> {
        self.state.lock().await.uploads.clone()
    }

    pub async fn releases(&self) -> Vec<(String, String)> {
        self.state.lock().await.releases.clone()
    }

    pub async fn has_domain(&self, domain: &str) -> bool {
        self.state.lock().await.domains.contains_key(domain)
    }

    async fn enter(&self, operation: &'static str) -> Result<(), HostingError> {
        let mut state = self.state.lock().await;
        state.calls.push(operation);
        match state
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn desired_records(domain: &str) -> Vec<DesiredRecord> {
        vec![
            DesiredRecord {
                domain_name: domain.to_string(),
                record_type: DnsRecordType::Txt,
                rdata: OWNERSHIP_TOKEN.to_string(),
                action_required: true,
            },
            DesiredRecord {
                domain_name: domain.to_string(),
                record_type: DnsRecordType::A,
                rdata: FALLBACK_ADDRESS.to_string(),
                action_required: true,
            },
        ]
    }
}

#[async_trait]
impl HostingApi for FakeHosting {
    async fn get_site(&self, site: &SiteRef) -> Result<Option<HostedSite>, HostingError> {
        self.enter("get_site").await?;
        Ok(self.state.lock().await.sites.get(&site.site_id).cloned())
    }

    async fn create_site(
        &self,
        site: &SiteRef,
        labels: &BTreeMap<String, String>,
    ) -> Result<HostedSite, HostingError> {
        self.enter("create_site").await?;
        let mut state = self.state.lock().await;
        if state.sites.contains_key(&site.site_id) {
            return Err(HostingError::AlreadyExists {
                resource: format!("site `{}`", site.site_id),
            });
        }
        let hosted = HostedSite {
            site_id: site.site_id.clone(),
            default_url: Some(format!("https://{}.{DOMAIN_SUFFIX}", site.site_id)),
            labels: labels.clone(),
        };
        state.sites.insert(site.site_id.clone(), hosted.clone());
        Ok(hosted)
    }

    async fn create_version(
        &self,
        _site: &SiteRef,
        _config: &VersionConfig,
    ) -> Result<String, HostingError> {
        self.enter("create_version").await?;
        let mut state = self.state.lock().await;
        state.next_version += 1;
        Ok(format!("v{}", state.next_version))
    }

    async fn populate_files(
        &self,
        _site: &SiteRef,
        _version_id: &str,
        manifest: &BTreeMap<String, String>,
    ) -> Result<PopulateOutcome, HostingError> {
        self.enter("populate_files").await?;
        let state = self.state.lock().await;
        let mut required: Vec<String> = manifest
            .values()
            .filter(|hash| !state.stored_hashes.contains(*hash))
            .cloned()
            .collect();
        required.sort();
        required.dedup();
        Ok(PopulateOutcome {
            upload_url: (!required.is_empty()).then(|| "https://upload.test/files".to_string()),
            upload_required_hashes: required,
        })
    }

    async fn upload_blob(
        &self,
        _upload_url: &str,
        hash: &str,
        _gzipped: Bytes,
    ) -> Result<(), HostingError> {
        self.enter("upload_blob").await?;
        let mut state = self.state.lock().await;
        state.stored_hashes.insert(hash.to_string());
        state.uploads.push(hash.to_string());
        Ok(())
    }

    async fn finalize_version(
        &self,
        _site: &SiteRef,
        version_id: &str,
    ) -> Result<(), HostingError> {
        self.enter("finalize_version").await?;
        self.state
            .lock()
            .await
            .finalized
            .push(version_id.to_string());
        Ok(())
    }

    async fn create_release(
        &self,
        _site: &SiteRef,
        version_id: &str,
        _message: Option<&str>,
    ) -> Result<String, HostingError> {
        self.enter("create_release").await?;
        let mut state = self.state.lock().await;
        if !state.finalized.iter().any(|id| id == version_id) {
            return Err(HostingError::Status {
                status: 400,
                message: format!("version {version_id} is not finalized"),
            });
        }
        let release_id = format!("r{}", state.releases.len() + 1);
        state
            .releases
            .push((version_id.to_string(), release_id.clone()));
        Ok(release_id)
    }

    async fn create_custom_domain(
        &self,
        _site: &SiteRef,
        domain: &str,
    ) -> Result<CustomDomain, HostingError> {
        self.enter("create_custom_domain").await?;
        let initial = *self.initial_domain_states.lock().await;
        let mut state = self.state.lock().await;
        if state.domains.contains_key(domain) {
            return Err(HostingError::AlreadyExists {
                resource: format!("custom domain `{domain}`"),
            });
        }
        let registered = CustomDomain {
            domain: domain.to_string(),
            states: initial,
            desired_records: Self::desired_records(domain),
            issues: Vec::new(),
        };
        state.domains.insert(domain.to_string(), registered.clone());
        Ok(registered)
    }

    async fn get_custom_domain(
        &self,
        _site: &SiteRef,
        domain: &str,
    ) -> Result<Option<CustomDomain>, HostingError> {
        self.enter("get_custom_domain").await?;
        let mut state = self.state.lock().await;
        match state.reads.pop_front() {
            Some(DomainRead::Fail(err)) => Err(err),
            Some(DomainRead::Missing) => Ok(None),
            Some(DomainRead::States(states)) => {
                let entry = state
                    .domains
                    .entry(domain.to_string())
                    .or_insert_with(|| CustomDomain {
                        domain: domain.to_string(),
                        states,
                        desired_records: Self::desired_records(domain),
                        issues: Vec::new(),
                    });
                entry.states = states;
                Ok(Some(entry.clone()))
            }
            None => Ok(state.domains.get(domain).cloned()),
        }
    }

    async fn delete_custom_domain(
        &self,
        _site: &SiteRef,
        domain: &str,
    ) -> Result<(), HostingError> {
        self.enter("delete_custom_domain").await?;
        match self.state.lock().await.domains.remove(domain) {
            Some(_) => Ok(()),
            None => Err(HostingError::NotFound {
                resource: format!("custom domain `{domain}`"),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeDns {
    zones: Mutex<HashMap<String, Vec<DnsRecord>>>,
    unknown_zones: Mutex<HashSet<String>>,
}

impl FakeDns {
    pub async fn records(&self, domain: &str) -> Vec<DnsRecord> {
        self.zones
            .lock()
            .await
            .get(domain)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn seed(&self, domain: &str, records: Vec<DnsRecord>) {
        self.zones.lock().await.insert(domain.to_string(), records);
    }

    pub async fn forget_zone(&self, domain: &str) {
        self.unknown_zones.lock().await.insert(domain.to_string());
    }
}

#[async_trait]
impl DnsAutomation for FakeDns {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>, DnsError> {
        if self.unknown_zones.lock().await.contains(domain) {
            return Err(DnsError::UnknownZone(domain.to_string()));
        }
        Ok(self.records(domain).await)
    }

    async fn add_records(&self, domain: &str, records: &[DnsRecord]) -> Result<(), DnsError> {
        if self.unknown_zones.lock().await.contains(domain) {
            return Err(DnsError::UnknownZone(domain.to_string()));
        }
        self.zones
            .lock()
            .await
            .entry(domain.to_string())
            .or_default()
            .extend(records.iter().cloned());
        Ok(())
    }
}

/// Every service wired against the in-memory stores.
pub struct Harness {
    pub sites: Arc<InMemorySites>,
    pub connections: Arc<InMemoryConnections>,
    pub events: Arc<InMemoryEvents>,
    pub hosting: Arc<FakeHosting>,
    pub dns: Arc<FakeDns>,
    pub registry: Arc<SiteRegistry>,
    pub deployer: Arc<ContentDeployer>,
    pub orchestrator: Arc<ConnectionOrchestrator>,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_reconcile_config(reconcile_config())
    }

    pub fn with_reconcile_config(reconcile: ReconcileConfig) -> Self {
        let sites = Arc::new(InMemorySites::default());
        let connections = Arc::new(InMemoryConnections::default());
        let events = Arc::new(InMemoryEvents::default());
        let hosting = Arc::new(FakeHosting::default());
        let dns = Arc::new(FakeDns::default());

        let retry = RetryPolicy::immediate(3);
        let registry = SiteRegistry::new(
            sites.clone(),
            hosting.clone(),
            RegistryConfig {
                default_project_id: PROJECT_ID.to_string(),
                namespace: NAMESPACE.to_string(),
                default_domain_suffix: DOMAIN_SUFFIX.to_string(),
                retry,
            },
        );
        let deployer = ContentDeployer::new(sites.clone(), hosting.clone(), retry);
        let orchestrator = ConnectionOrchestrator::new(
            sites.clone(),
            connections.clone(),
            events.clone(),
            registry.clone(),
            deployer.clone(),
            hosting.clone(),
            Some(dns.clone() as Arc<dyn DnsAutomation>),
            ConnectionsConfig {
                fallback_host_addresses: vec![
                    FALLBACK_ADDRESS.to_string(),
                    FALLBACK_ADDRESS_V6.to_string(),
                ],
                schedule: reconcile.schedule,
                retry,
            },
        );
        let reconciler = Reconciler::new(
            sites.clone(),
            connections.clone(),
            events.clone(),
            hosting.clone(),
            reconcile,
        );

        Self {
            sites,
            connections,
            events,
            hosting,
            dns,
            registry: Arc::new(registry),
            deployer: Arc::new(deployer),
            orchestrator: Arc::new(orchestrator),
            reconciler: Arc::new(reconciler),
        }
    }
}

pub fn reconcile_config() -> ReconcileConfig {
    ReconcileConfig {
        schedule: PollSchedule::default(),
        fallback_host_addresses: vec![
            FALLBACK_ADDRESS.to_string(),
            FALLBACK_ADDRESS_V6.to_string(),
        ],
        ..ReconcileConfig::default()
    }
}
