//! Request, response and status types shared by the siteline server and its
//! API consumers.
//!
//! Enumerations double as Postgres enum types when the `sqlx` feature is on.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of a hosted site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "site_status", rename_all = "snake_case")
)]
pub enum SiteStatus {
    Creating,
    Deploying,
    Active,
    DomainPending,
    Error,
}

impl SiteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SiteStatus::Creating => "creating",
            SiteStatus::Deploying => "deploying",
            SiteStatus::Active => "active",
            SiteStatus::DomainPending => "domain_pending",
            SiteStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "site_kind", rename_all = "snake_case")
)]
pub enum SiteKind {
    #[default]
    Generated,
    Landing,
}

/// TLS certificate state mirrored onto the site record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "tls_status", rename_all = "snake_case")
)]
pub enum TlsStatus {
    Pending,
    Provisioning,
    Active,
    ExpiringSoon,
    Expired,
}

/// Internal state machine of a domain connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "connection_status", rename_all = "snake_case")
)]
pub enum ConnectionStatus {
    CreatingSite,
    DeployingContent,
    AddingDomain,
    PendingDns,
    DnsPropagating,
    PendingSsl,
    SslProvisioning,
    Connected,
    Error,
    VerificationFailed,
    Disconnected,
}

/// Which reconciliation budget a status draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Dns,
    Ssl,
}

impl ConnectionStatus {
    pub const ALL: [ConnectionStatus; 11] = [
        ConnectionStatus::CreatingSite,
        ConnectionStatus::DeployingContent,
        ConnectionStatus::AddingDomain,
        ConnectionStatus::PendingDns,
        ConnectionStatus::DnsPropagating,
        ConnectionStatus::PendingSsl,
        ConnectionStatus::SslProvisioning,
        ConnectionStatus::Connected,
        ConnectionStatus::Error,
        ConnectionStatus::VerificationFailed,
        ConnectionStatus::Disconnected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::CreatingSite => "creating_site",
            ConnectionStatus::DeployingContent => "deploying_content",
            ConnectionStatus::AddingDomain => "adding_domain",
            ConnectionStatus::PendingDns => "pending_dns",
            ConnectionStatus::DnsPropagating => "dns_propagating",
            ConnectionStatus::PendingSsl => "pending_ssl",
            ConnectionStatus::SslProvisioning => "ssl_provisioning",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
            ConnectionStatus::VerificationFailed => "verification_failed",
            ConnectionStatus::Disconnected => "disconnected",
        }
    }

    /// No further transitions happen without a caller restarting the flow.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connected
                | ConnectionStatus::Error
                | ConnectionStatus::VerificationFailed
                | ConnectionStatus::Disconnected
        )
    }

    /// Active connections hold an exclusive claim on their domain.
    pub fn is_active(self) -> bool {
        !matches!(
            self,
            ConnectionStatus::Error
                | ConnectionStatus::VerificationFailed
                | ConnectionStatus::Disconnected
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ConnectionStatus::Error | ConnectionStatus::VerificationFailed
        )
    }

    pub fn phase(self) -> Option<ConnectionPhase> {
        match self {
            ConnectionStatus::AddingDomain
            | ConnectionStatus::PendingDns
            | ConnectionStatus::DnsPropagating => Some(ConnectionPhase::Dns),
            ConnectionStatus::PendingSsl | ConnectionStatus::SslProvisioning => {
                Some(ConnectionPhase::Ssl)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "connection_method", rename_all = "snake_case")
)]
pub enum ConnectionMethod {
    #[default]
    Manual,
    Automated,
    Launch,
}

impl ConnectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionMethod::Manual => "manual",
            ConnectionMethod::Automated => "automated",
            ConnectionMethod::Launch => "launch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DnsRecordType {
    A,
    #[serde(rename = "AAAA")]
    Aaaa,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "TXT")]
    Txt,
}

impl DnsRecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            DnsRecordType::A => "A",
            DnsRecordType::Aaaa => "AAAA",
            DnsRecordType::Cname => "CNAME",
            DnsRecordType::Txt => "TXT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "A" => Some(DnsRecordType::A),
            "AAAA" => Some(DnsRecordType::Aaaa),
            "CNAME" => Some(DnsRecordType::Cname),
            "TXT" => Some(DnsRecordType::Txt),
            _ => None,
        }
    }

    pub fn is_host_address(self) -> bool {
        matches!(self, DnsRecordType::A | DnsRecordType::Aaaa)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsRecordStatus {
    Pending,
    Active,
}

/// A DNS record the domain owner has to configure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub name: String,
    pub value: String,
    pub ttl: u32,
    pub status: DnsRecordStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsureSiteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub business_name: String,
    pub lead_id: String,
    pub agency_id: String,
    pub user_id: String,
    #[serde(default)]
    pub site_kind: SiteKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsureSiteResponse {
    pub site_id: String,
    pub is_new: bool,
    pub default_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub html_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub domain: String,
    pub lead_id: String,
    pub agency_id: String,
    pub user_id: String,
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(default)]
    pub method: ConnectionMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub lead_id: String,
    pub agency_id: String,
    pub user_id: String,
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConnectionStatus>,
    #[serde(default)]
    pub dns_records: Vec<DnsRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub is_complete: bool,
    pub requires_retry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_check_delay_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConnectionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionView {
    pub id: Uuid,
    pub domain: Option<String>,
    pub site_id: String,
    pub method: ConnectionMethod,
    pub status: ConnectionStatus,
    pub dns_records: Vec<DnsRecord>,
    pub host_state: Option<String>,
    pub ownership_state: Option<String>,
    pub cert_state: Option<String>,
    pub verification_token: Option<String>,
    pub dns_attempts: i32,
    pub ssl_attempts: i32,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_checked_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub connected_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One entry of a connection's lifecycle history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEventView {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectResponse {
    pub connection_id: Uuid,
    pub status: ConnectionStatus,
}
