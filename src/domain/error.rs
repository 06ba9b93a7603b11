use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
    #[error("page content must not be empty")]
    EmptyContent,
    #[error("failed to compress `{path}`: {source}")]
    Compression {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DomainError {
    pub fn invalid_domain(reason: impl Into<String>) -> Self {
        Self::InvalidDomain(reason.into())
    }
}
