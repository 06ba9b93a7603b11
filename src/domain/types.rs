//! Shared domain enumerations aligned with persisted database enums and the
//! hosting provider's custom-domain signals.

use serde::{Deserialize, Serialize};

pub use siteline_api_types::{
    ConnectionMethod, ConnectionPhase, ConnectionStatus, DnsRecordStatus, DnsRecordType, SiteKind,
    SiteStatus, TlsStatus,
};

/// Whether DNS points the domain at the hosting provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostState {
    #[serde(rename = "HOST_UNHOSTED")]
    Unhosted,
    #[serde(rename = "HOST_UNREACHABLE")]
    Unreachable,
    #[serde(rename = "HOST_MISMATCH")]
    Mismatch,
    #[serde(rename = "HOST_CONFLICT")]
    Conflict,
    #[serde(rename = "HOST_ACTIVE")]
    Active,
    #[serde(rename = "HOST_STATE_UNSPECIFIED", other)]
    Unspecified,
}

impl HostState {
    pub const ALL: [HostState; 6] = [
        HostState::Unspecified,
        HostState::Unhosted,
        HostState::Unreachable,
        HostState::Mismatch,
        HostState::Conflict,
        HostState::Active,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HostState::Unspecified => "HOST_STATE_UNSPECIFIED",
            HostState::Unhosted => "HOST_UNHOSTED",
            HostState::Unreachable => "HOST_UNREACHABLE",
            HostState::Mismatch => "HOST_MISMATCH",
            HostState::Conflict => "HOST_CONFLICT",
            HostState::Active => "HOST_ACTIVE",
        }
    }
}

/// Whether control over the domain has been proven to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnershipState {
    #[serde(rename = "OWNERSHIP_MISSING")]
    Missing,
    #[serde(rename = "OWNERSHIP_UNREACHABLE")]
    Unreachable,
    #[serde(rename = "OWNERSHIP_MISMATCH")]
    Mismatch,
    #[serde(rename = "OWNERSHIP_CONFLICT")]
    Conflict,
    #[serde(rename = "OWNERSHIP_PENDING")]
    Pending,
    #[serde(rename = "OWNERSHIP_ACTIVE")]
    Active,
    #[serde(rename = "OWNERSHIP_STATE_UNSPECIFIED", other)]
    Unspecified,
}

impl OwnershipState {
    pub const ALL: [OwnershipState; 7] = [
        OwnershipState::Unspecified,
        OwnershipState::Missing,
        OwnershipState::Unreachable,
        OwnershipState::Mismatch,
        OwnershipState::Conflict,
        OwnershipState::Pending,
        OwnershipState::Active,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OwnershipState::Unspecified => "OWNERSHIP_STATE_UNSPECIFIED",
            OwnershipState::Missing => "OWNERSHIP_MISSING",
            OwnershipState::Unreachable => "OWNERSHIP_UNREACHABLE",
            OwnershipState::Mismatch => "OWNERSHIP_MISMATCH",
            OwnershipState::Conflict => "OWNERSHIP_CONFLICT",
            OwnershipState::Pending => "OWNERSHIP_PENDING",
            OwnershipState::Active => "OWNERSHIP_ACTIVE",
        }
    }
}

/// TLS certificate issuance progress reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertState {
    #[serde(rename = "CERT_PREPARING")]
    Preparing,
    #[serde(rename = "CERT_VALIDATING")]
    Validating,
    #[serde(rename = "CERT_PROPAGATING")]
    Propagating,
    #[serde(rename = "CERT_ACTIVE")]
    Active,
    #[serde(rename = "CERT_EXPIRING_SOON")]
    ExpiringSoon,
    #[serde(rename = "CERT_EXPIRED")]
    Expired,
    #[serde(rename = "CERT_STATE_UNSPECIFIED", other)]
    Unspecified,
}

impl CertState {
    pub const ALL: [CertState; 7] = [
        CertState::Unspecified,
        CertState::Preparing,
        CertState::Validating,
        CertState::Propagating,
        CertState::Active,
        CertState::ExpiringSoon,
        CertState::Expired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CertState::Unspecified => "CERT_STATE_UNSPECIFIED",
            CertState::Preparing => "CERT_PREPARING",
            CertState::Validating => "CERT_VALIDATING",
            CertState::Propagating => "CERT_PROPAGATING",
            CertState::Active => "CERT_ACTIVE",
            CertState::ExpiringSoon => "CERT_EXPIRING_SOON",
            CertState::Expired => "CERT_EXPIRED",
        }
    }
}

/// Kinds of lifecycle events appended for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionEventKind {
    Connected,
    Failed,
    Disconnected,
}

impl ConnectionEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionEventKind::Connected => "connection.connected",
            ConnectionEventKind::Failed => "connection.failed",
            ConnectionEventKind::Disconnected => "connection.disconnected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "connection.connected" => Some(ConnectionEventKind::Connected),
            "connection.failed" => Some(ConnectionEventKind::Failed),
            "connection.disconnected" => Some(ConnectionEventKind::Disconnected),
            _ => None,
        }
    }
}
