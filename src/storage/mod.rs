pub(crate) mod s3_versions;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;

pub use s3_versions::{S3VersionStore, build_s3_client};

/// One stored version of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub key: String,
    pub version_id: String,
    pub last_modified: DateTime<Utc>,
    pub is_latest: bool,
}

/// Where the next listing page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMarker {
    pub key_marker: String,
    pub version_id_marker: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VersionPage {
    pub records: Vec<VersionRecord>,
    /// `None` when this was the last page.
    pub next: Option<PageMarker>,
}

/// The storage operations a restore run needs.
///
/// Listings must return the versions of any single key newest first, and
/// that order has to hold across page boundaries.
#[async_trait]
pub trait VersionStore: Send + Sync {
    async fn list_versions_page(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&PageMarker>,
    ) -> Result<VersionPage>;

    /// Copies `version_id` of `key` onto the key itself, making it the current version.
    /// Returns the id of the newly written version when the provider reports one.
    async fn copy_version(&self, bucket: &str, key: &str, version_id: &str) -> Result<Option<String>>;
}
