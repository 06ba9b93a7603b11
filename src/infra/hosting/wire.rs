//! JSON bodies exchanged with the hosting REST API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::hosting::{CustomDomain, HeaderRule, HostedSite, VersionConfig};
use crate::domain::dns::DesiredRecord;
use crate::domain::status::RemoteStates;
use crate::domain::types::{CertState, DnsRecordType, HostState, OwnershipState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SiteBody {
    pub name: String,
    #[serde(default)]
    pub default_url: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl SiteBody {
    pub fn into_hosted(self, fallback_id: &str) -> HostedSite {
        let site_id = last_segment(&self.name).unwrap_or(fallback_id).to_string();
        HostedSite {
            site_id,
            default_url: self.default_url,
            labels: self.labels,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CreateSiteBody<'a> {
    pub labels: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateVersionBody {
    pub config: ServingConfigBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ServingConfigBody {
    pub clean_urls: bool,
    pub headers: Vec<HeaderBody>,
}

#[derive(Debug, Serialize)]
pub(super) struct HeaderBody {
    pub glob: String,
    pub headers: BTreeMap<String, String>,
}

impl From<&VersionConfig> for CreateVersionBody {
    fn from(config: &VersionConfig) -> Self {
        Self {
            config: ServingConfigBody {
                clean_urls: config.clean_urls,
                headers: config.headers.iter().map(HeaderBody::from).collect(),
            },
        }
    }
}

impl From<&HeaderRule> for HeaderBody {
    fn from(rule: &HeaderRule) -> Self {
        Self {
            glob: rule.glob.clone(),
            headers: rule.headers.clone(),
        }
    }
}

/// Versions and releases answer with a resource name ending in their id.
#[derive(Debug, Deserialize)]
pub(super) struct NamedBody {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct PopulateFilesBody<'a> {
    pub files: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct PopulateFilesResponse {
    pub upload_required_hashes: Vec<String>,
    pub upload_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct FinalizeBody {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct ReleaseBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

/// Long-running operation wrapper returned by custom-domain creation.
#[derive(Debug, Deserialize)]
pub(super) struct OperationBody {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub response: Option<CustomDomainBody>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OperationError {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CustomDomainBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host_state: Option<HostState>,
    #[serde(default)]
    pub ownership_state: Option<OwnershipState>,
    #[serde(default)]
    pub cert: Option<CertBody>,
    #[serde(default)]
    pub required_dns_updates: Option<DnsUpdatesBody>,
    #[serde(default)]
    pub issues: Vec<IssueBody>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CertBody {
    #[serde(default)]
    pub state: Option<CertState>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct DnsUpdatesBody {
    pub desired: Vec<DnsRecordSetBody>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct DnsRecordSetBody {
    pub domain_name: String,
    pub records: Vec<DnsRecordBody>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct DnsRecordBody {
    pub domain_name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub rdata: String,
    pub required_action: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct IssueBody {
    #[serde(default)]
    pub message: String,
}

impl CustomDomainBody {
    pub fn into_domain(self, requested: &str) -> CustomDomain {
        let states = RemoteStates {
            ownership: self.ownership_state.unwrap_or(OwnershipState::Unspecified),
            host: self.host_state.unwrap_or(HostState::Unspecified),
            cert: self
                .cert
                .and_then(|cert| cert.state)
                .unwrap_or(CertState::Unspecified),
        };

        let desired_records = self
            .required_dns_updates
            .unwrap_or_default()
            .desired
            .into_iter()
            .flat_map(|set| {
                let set_name = set.domain_name;
                set.records.into_iter().filter_map(move |record| {
                    let record_type = DnsRecordType::parse(&record.record_type)?;
                    let action = record.required_action.as_deref().unwrap_or("NONE");
                    if action.eq_ignore_ascii_case("REMOVE") {
                        return None;
                    }
                    let domain_name = if record.domain_name.is_empty() {
                        set_name.clone()
                    } else {
                        record.domain_name
                    };
                    Some(DesiredRecord {
                        domain_name,
                        record_type,
                        rdata: record.rdata,
                        action_required: !action.eq_ignore_ascii_case("NONE"),
                    })
                })
            })
            .collect();

        let domain = last_segment(&self.name)
            .filter(|segment| !segment.is_empty())
            .unwrap_or(requested)
            .to_string();

        CustomDomain {
            domain,
            states,
            desired_records,
            issues: self
                .issues
                .into_iter()
                .map(|issue| issue.message)
                .filter(|message| !message.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    #[serde(default)]
    pub message: String,
}

pub(super) fn last_segment(name: &str) -> Option<&str> {
    name.rsplit('/').next().filter(|segment| !segment.is_empty())
}
