//! Port to a DNS host that can write records on behalf of the domain owner.

use async_trait::async_trait;
use siteline_api_types::DnsRecord;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("dns provider answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("dns provider unreachable: {0}")]
    Transport(String),
    #[error("unexpected dns provider response: {0}")]
    Decode(String),
    #[error("domain `{0}` is not managed by the dns provider")]
    UnknownZone(String),
}

#[async_trait]
pub trait DnsAutomation: Send + Sync {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>, DnsError>;

    async fn add_records(&self, domain: &str, records: &[DnsRecord]) -> Result<(), DnsError>;
}

/// Records from `wanted` that `existing` does not already contain.
pub fn missing_records(wanted: &[DnsRecord], existing: &[DnsRecord]) -> Vec<DnsRecord> {
    wanted
        .iter()
        .filter(|record| {
            !existing.iter().any(|present| {
                present.record_type == record.record_type
                    && present.name.eq_ignore_ascii_case(&record.name)
                    && present.value == record.value
            })
        })
        .cloned()
        .collect()
}
