use thiserror::Error;

use crate::infra::hosting::HostingClientError;

/// Failures while bringing up adapters for a process command.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind listener: {0}")]
    Listener(#[from] std::io::Error),
    #[error("database unavailable: {0}")]
    Pool(#[source] sqlx::Error),
    #[error("migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("hosting client: {0}")]
    Hosting(#[from] HostingClientError),
    #[error("dns client: {0}")]
    Dns(#[source] reqwest::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("missing setting `{key}`")]
    MissingSetting { key: &'static str },
}

impl InfraError {
    pub fn missing(key: &'static str) -> Self {
        Self::MissingSetting { key }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
