//! Custom-domain normalization and validation.

use crate::domain::error::DomainError;

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Hostnames that are documentation placeholders rather than real customer domains.
const PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "domain.com",
    "yourdomain.com",
    "localhost.localdomain",
];

/// Reduce user input such as `https://www.Acme.io:443/about` to `acme.io`.
pub fn normalize_domain(input: &str) -> Result<String, DomainError> {
    let mut host = input.trim().to_ascii_lowercase();

    if let Some(index) = host.find("://") {
        host.drain(..index + 3);
    }
    if let Some(index) = host.find(['/', '?', '#']) {
        host.truncate(index);
    }
    if let Some(index) = host.rfind('@') {
        host.drain(..=index);
    }
    if let Some(index) = host.find(':') {
        host.truncate(index);
    }

    let host = host.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);

    validate_hostname(host)?;
    Ok(host.to_string())
}

fn validate_hostname(host: &str) -> Result<(), DomainError> {
    if host.is_empty() {
        return Err(DomainError::invalid_domain("domain must not be empty"));
    }
    if host.len() > MAX_HOSTNAME_LEN {
        return Err(DomainError::invalid_domain(format!(
            "domain exceeds {MAX_HOSTNAME_LEN} characters"
        )));
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return Err(DomainError::invalid_domain(format!(
            "`{host}` is not a fully qualified domain"
        )));
    }

    for label in &labels {
        validate_label(host, label)?;
    }

    let tld = labels.last().copied().unwrap_or_default();
    if !tld.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(DomainError::invalid_domain(format!(
            "`{host}` has an invalid top-level domain"
        )));
    }

    if PLACEHOLDER_DOMAINS.contains(&host) {
        return Err(DomainError::invalid_domain(format!(
            "`{host}` is a placeholder domain"
        )));
    }

    Ok(())
}

fn validate_label(host: &str, label: &str) -> Result<(), DomainError> {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return Err(DomainError::invalid_domain(format!(
            "`{host}` has a label outside 1..={MAX_LABEL_LEN} characters"
        )));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(DomainError::invalid_domain(format!(
            "`{host}` has a label starting or ending with a hyphen"
        )));
    }
    if !label
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    {
        return Err(DomainError::invalid_domain(format!(
            "`{host}` contains characters outside a-z, 0-9 and hyphen"
        )));
    }
    Ok(())
}
