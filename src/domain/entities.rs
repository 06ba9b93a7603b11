//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{
    ConnectionEventKind, ConnectionMethod, ConnectionStatus, SiteKind, SiteStatus, TlsStatus,
};
use siteline_api_types::DnsRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRecord {
    pub site_id: String,
    pub project_id: String,
    pub agency_id: String,
    pub lead_id: String,
    pub user_id: String,
    pub business_name: String,
    pub site_kind: SiteKind,
    pub default_url: String,
    pub status: SiteStatus,
    pub last_deployed_at: Option<OffsetDateTime>,
    pub current_version_id: Option<String>,
    pub current_release_id: Option<String>,
    pub custom_domain: Option<String>,
    pub connection_id: Option<Uuid>,
    pub tls_status: Option<TlsStatus>,
    pub error_message: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionRecord {
    pub id: Uuid,
    pub domain: Option<String>,
    pub site_id: String,
    pub project_id: String,
    pub agency_id: String,
    pub lead_id: String,
    pub user_id: String,
    pub method: ConnectionMethod,
    pub status: ConnectionStatus,
    pub dns_records: Vec<DnsRecord>,
    pub host_state: Option<String>,
    pub ownership_state: Option<String>,
    pub cert_state: Option<String>,
    pub verification_token: Option<String>,
    pub dns_attempts: i32,
    pub ssl_attempts: i32,
    pub poll_count: i32,
    pub error_message: Option<String>,
    pub last_checked_at: Option<OffsetDateTime>,
    pub next_check_at: Option<OffsetDateTime>,
    pub connected_at: Option<OffsetDateTime>,
    pub disconnected_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ConnectionRecord {
    pub fn to_view(&self) -> siteline_api_types::ConnectionView {
        siteline_api_types::ConnectionView {
            id: self.id,
            domain: self.domain.clone(),
            site_id: self.site_id.clone(),
            method: self.method,
            status: self.status,
            dns_records: self.dns_records.clone(),
            host_state: self.host_state.clone(),
            ownership_state: self.ownership_state.clone(),
            cert_state: self.cert_state.clone(),
            verification_token: self.verification_token.clone(),
            dns_attempts: self.dns_attempts,
            ssl_attempts: self.ssl_attempts,
            error_message: self.error_message.clone(),
            last_checked_at: self.last_checked_at,
            connected_at: self.connected_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionEventRecord {
    pub id: Uuid,
    pub connection_id: Uuid,
    pub site_id: String,
    pub kind: ConnectionEventKind,
    pub payload: serde_json::Value,
    pub created_at: OffsetDateTime,
}

impl ConnectionEventRecord {
    pub fn to_view(&self) -> siteline_api_types::ConnectionEventView {
        siteline_api_types::ConnectionEventView {
            id: self.id,
            kind: self.kind.as_str().to_string(),
            payload: self.payload.clone(),
            created_at: self.created_at,
        }
    }
}
