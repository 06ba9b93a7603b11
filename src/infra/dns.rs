//! REST client for the DNS host used by automated connections.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use siteline_api_types::{DnsRecord, DnsRecordStatus, DnsRecordType};

use crate::application::dns::{DnsAutomation, DnsError};
use crate::domain::dns::DEFAULT_RECORD_TTL;

#[derive(Debug, Clone)]
pub struct RestDnsClient {
    client: Client,
    base: Url,
    api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordBody {
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: Option<u32>,
}

impl RestDnsClient {
    pub fn new(base: Url, api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("siteline/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    fn records_url(&self, domain: &str) -> Result<Url, DnsError> {
        let base = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/v1/domains/{domain}/records"))
            .map_err(|err| DnsError::Decode(format!("invalid request url: {err}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.api_key)
    }

    async fn send(&self, builder: RequestBuilder, domain: &str) -> Result<Vec<u8>, DnsError> {
        let response = builder
            .send()
            .await
            .map_err(|err| DnsError::Transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| DnsError::Transport(err.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(DnsError::UnknownZone(domain.to_string()));
        }
        if !status.is_success() {
            return Err(DnsError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DnsAutomation for RestDnsClient {
    async fn list_records(&self, domain: &str) -> Result<Vec<DnsRecord>, DnsError> {
        let url = self.records_url(domain)?;
        let bytes = self.send(self.request(Method::GET, url), domain).await?;
        let bodies: Vec<RecordBody> =
            serde_json::from_slice(&bytes).map_err(|err| DnsError::Decode(err.to_string()))?;

        Ok(bodies
            .into_iter()
            .filter_map(|body| {
                Some(DnsRecord {
                    record_type: DnsRecordType::parse(&body.record_type)?,
                    name: body.name,
                    value: body.data,
                    ttl: body.ttl.unwrap_or(DEFAULT_RECORD_TTL),
                    status: DnsRecordStatus::Active,
                })
            })
            .collect())
    }

    async fn add_records(&self, domain: &str, records: &[DnsRecord]) -> Result<(), DnsError> {
        if records.is_empty() {
            return Ok(());
        }

        let bodies: Vec<RecordBody> = records
            .iter()
            .map(|record| RecordBody {
                record_type: record.record_type.as_str().to_string(),
                name: record.name.clone(),
                data: record.value.clone(),
                ttl: Some(record.ttl),
            })
            .collect();

        let url = self.records_url(domain)?;
        self.send(self.request(Method::PATCH, url).json(&bodies), domain)
            .await?;
        Ok(())
    }
}
