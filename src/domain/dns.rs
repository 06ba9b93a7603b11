//! DNS instructions handed to domain owners.

use siteline_api_types::{DnsRecord, DnsRecordStatus, DnsRecordType};

pub const DEFAULT_RECORD_TTL: u32 = 3600;

const APEX_NAME: &str = "@";
const WWW_NAME: &str = "www";

/// One record from the provider's list of desired DNS updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    pub domain_name: String,
    pub record_type: DnsRecordType,
    pub rdata: String,
    pub action_required: bool,
}

/// Build the record list for `domain`.
///
/// Ownership (TXT) and host (A/AAAA) records come from the provider.
/// `fallback_addresses` is the provider's published host set; any address the
/// provider did not list is appended as a pending apex record. A `www` CNAME
/// towards `default_host` is always appended.
pub fn build_dns_records(
    domain: &str,
    desired: &[DesiredRecord],
    fallback_addresses: &[String],
    default_host: &str,
) -> Vec<DnsRecord> {
    let mut records: Vec<DnsRecord> = Vec::new();

    for record in desired
        .iter()
        .filter(|record| matches!(record.record_type, DnsRecordType::Txt))
        .chain(
            desired
                .iter()
                .filter(|record| record.record_type.is_host_address()),
        )
    {
        push_unique(
            &mut records,
            DnsRecord {
                record_type: record.record_type,
                name: relative_name(domain, &record.domain_name),
                value: record.rdata.trim().to_string(),
                ttl: DEFAULT_RECORD_TTL,
                status: if record.action_required {
                    DnsRecordStatus::Pending
                } else {
                    DnsRecordStatus::Active
                },
            },
        );
    }

    for address in fallback_addresses {
        let record_type = if address.contains(':') {
            DnsRecordType::Aaaa
        } else {
            DnsRecordType::A
        };
        push_unique(
            &mut records,
            DnsRecord {
                record_type,
                name: APEX_NAME.to_string(),
                value: address.trim().to_string(),
                ttl: DEFAULT_RECORD_TTL,
                status: DnsRecordStatus::Pending,
            },
        );
    }

    push_unique(
        &mut records,
        DnsRecord {
            record_type: DnsRecordType::Cname,
            name: WWW_NAME.to_string(),
            value: default_host.to_string(),
            ttl: DEFAULT_RECORD_TTL,
            status: DnsRecordStatus::Pending,
        },
    );

    records
}

/// The ownership TXT value the domain owner has to publish, if any.
pub fn verification_token(records: &[DnsRecord]) -> Option<String> {
    records
        .iter()
        .find(|record| record.record_type == DnsRecordType::Txt)
        .map(|record| record.value.clone())
}

/// Records that still need to be written at the DNS host.
pub fn pending_records(records: &[DnsRecord]) -> Vec<DnsRecord> {
    records
        .iter()
        .filter(|record| record.status == DnsRecordStatus::Pending)
        .cloned()
        .collect()
}

fn relative_name(domain: &str, record_name: &str) -> String {
    let name = record_name.trim().trim_end_matches('.').to_ascii_lowercase();
    if name.is_empty() || name == domain {
        return APEX_NAME.to_string();
    }
    match name.strip_suffix(domain) {
        Some(prefix) if prefix.ends_with('.') => prefix.trim_end_matches('.').to_string(),
        _ => name,
    }
}

fn push_unique(records: &mut Vec<DnsRecord>, record: DnsRecord) {
    let exists = records.iter().any(|existing| {
        existing.record_type == record.record_type
            && existing.name == record.name
            && existing.value == record.value
    });
    if !exists {
        records.push(record);
    }
}
