//! Deterministic hosted-site identifiers.
//!
//! A site id is a pure function of the business name and the lead id, so
//! registering the same lead twice always lands on the same hosted site.

use sha2::{Digest, Sha256};
use slug::slugify;

/// Upper bound the hosting provider accepts for a site id.
pub const MAX_SITE_ID_LEN: usize = 30;

const MAX_SLUG_LEN: usize = 20;
const SHORT_HASH_LEN: usize = 6;
const FALLBACK_SLUG: &str = "site";

/// Derive the site id for `(business_name, lead_id)` under `namespace`.
///
/// The slug gets whatever room the namespace and the hash leave, so the full
/// hash always survives the length cap.
pub fn derive_site_id(namespace: &str, business_name: &str, lead_id: &str) -> String {
    let hash = short_hash(lead_id);
    let namespace = cap(namespace, MAX_SITE_ID_LEN - SHORT_HASH_LEN - 1);

    let prefix = if namespace.is_empty() {
        0
    } else {
        namespace.chars().count() + 1
    };
    let reserved = prefix + SHORT_HASH_LEN + 1;
    let budget = MAX_SITE_ID_LEN.saturating_sub(reserved).min(MAX_SLUG_LEN);
    let slug = business_slug(business_name, budget);

    let candidate = [namespace.as_str(), slug.as_str(), hash.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if candidate.starts_with(|ch: char| ch.is_ascii_lowercase()) {
        candidate
    } else {
        format!("{FALLBACK_SLUG}-{hash}")
    }
}

/// Public default URL of a site on the provider's shared domain.
pub fn default_site_url(site_id: &str, domain_suffix: &str) -> String {
    format!(
        "https://{site_id}.{}",
        domain_suffix.trim_start_matches('.')
    )
}

fn business_slug(business_name: &str, budget: usize) -> String {
    let slug = cap(&slugify(business_name), budget);
    if slug.is_empty() {
        cap(FALLBACK_SLUG, budget)
    } else {
        slug
    }
}

/// Keep at most `limit` characters, without dangling hyphens.
fn cap(value: &str, limit: usize) -> String {
    let truncated: String = value.chars().take(limit).collect();
    truncated.trim_matches('-').to_string()
}

fn short_hash(lead_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(lead_id.trim().as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(SHORT_HASH_LEN);
    digest
}
