//! Content-addressed release files.
//!
//! Every served file is gzip-compressed and addressed by the SHA-256 digest
//! of the compressed bytes. The gzip header carries no timestamp or file
//! name, so identical content always produces an identical digest.

use std::collections::BTreeMap;
use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};

use crate::domain::error::DomainError;

pub const INDEX_PATH: &str = "/index.html";
pub const ROBOTS_PATH: &str = "/robots.txt";

const ROBOTS_TXT: &str = "User-agent: *\nAllow: /\n";

/// A compressed file ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFile {
    pub path: String,
    pub hash: String,
    pub gzipped: Bytes,
}

/// Files of one release, keyed by served path.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFiles {
    files: BTreeMap<String, ReleaseFile>,
}

impl ReleaseFiles {
    /// Build the file set for a single-page site.
    pub fn for_page(html: &str) -> Result<Self, DomainError> {
        if html.trim().is_empty() {
            return Err(DomainError::EmptyContent);
        }

        let mut files = Self::default();
        files.insert(INDEX_PATH, html.as_bytes())?;
        files.insert(ROBOTS_PATH, ROBOTS_TXT.as_bytes())?;
        Ok(files)
    }

    pub fn insert(&mut self, path: &str, content: &[u8]) -> Result<(), DomainError> {
        let gzipped = gzip(content).map_err(|source| DomainError::Compression {
            path: path.to_string(),
            source,
        })?;
        let hash = content_hash(&gzipped);
        self.files.insert(
            path.to_string(),
            ReleaseFile {
                path: path.to_string(),
                hash,
                gzipped: Bytes::from(gzipped),
            },
        );
        Ok(())
    }

    /// Path to hash mapping submitted to the provider.
    pub fn manifest(&self) -> BTreeMap<String, String> {
        self.files
            .iter()
            .map(|(path, file)| (path.clone(), file.hash.clone()))
            .collect()
    }

    pub fn by_hash(&self, hash: &str) -> Option<&ReleaseFile> {
        self.files.values().find(|file| file.hash == hash)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn gzip(content: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content)?;
    encoder.finish()
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
