// s3r/src/storage/s3_versions.rs
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_sdk_s3 as s3;
use chrono::{DateTime, Utc};
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::operation::list_object_versions::ListObjectVersionsOutput;
use tracing::{debug, info, warn};

use super::{PageMarker, VersionPage, VersionRecord, VersionStore};
use crate::config::{DEFAULT_REGION, StorageSettings};
use crate::errors::{AppError, Result};

/// Builds the S3 client once for the whole run.
pub async fn build_s3_client(settings: &StorageSettings) -> s3::Client {
    let region_provider = RegionProviderChain::first_try(settings.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION));

    let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
        .region(region_provider)
        .retry_config(RetryConfig::standard().with_max_attempts(settings.max_attempts));

    if let Some(endpoint_url) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    if let Some(credentials) = &settings.credentials {
        loader = loader.credentials_provider(s3::config::Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None, // session_token
            None, // expiry
            "Static", // provider_name
        ));
    }

    let sdk_config = loader.load().await;
    info!(
        "S3 client ready (region: {}, endpoint: {}, max attempts: {})",
        sdk_config
            .region()
            .map(ToString::to_string)
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        settings.endpoint_url.as_deref().unwrap_or("default"),
        settings.max_attempts
    );

    let s3_config = s3::config::Builder::from(&sdk_config)
        .force_path_style(settings.force_path_style)
        .build();
    s3::Client::from_conf(s3_config)
}

/// [`VersionStore`] backed by a real S3 (or S3-compatible) bucket.
pub struct S3VersionStore {
    client: s3::Client,
}

impl S3VersionStore {
    pub fn new(client: s3::Client) -> Self {
        S3VersionStore { client }
    }
}

#[async_trait]
impl VersionStore for S3VersionStore {
    async fn list_versions_page(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&PageMarker>,
    ) -> Result<VersionPage> {
        let mut request = self.client.list_object_versions().bucket(bucket);
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(marker) = marker {
            request = request.key_marker(&marker.key_marker);
            if let Some(version_id_marker) = &marker.version_id_marker {
                request = request.version_id_marker(version_id_marker);
            }
        }

        let output = request.send().await.map_err(|e| AppError::StorageList {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            message: DisplayErrorContext(&e).to_string(),
        })?;

        page_from_output(&output, bucket, prefix)
    }

    async fn copy_version(&self, bucket: &str, key: &str, version_id: &str) -> Result<Option<String>> {
        let output = self
            .client
            .copy_object()
            .bucket(bucket)
            .key(key)
            .copy_source(copy_source(bucket, key, version_id))
            .send()
            .await
            .map_err(|e| AppError::StorageCopy {
                bucket: bucket.to_string(),
                key: key.to_string(),
                version_id: version_id.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(output.version_id().map(str::to_string))
    }
}

/// Converts one `ListObjectVersions` response into a page, keeping provider order.
///
/// A truncated response without a continuation marker is an error: the rest
/// of the listing cannot be reached.
fn page_from_output(output: &ListObjectVersionsOutput, bucket: &str, prefix: &str) -> Result<VersionPage> {
    let mut records = Vec::with_capacity(output.versions().len());
    for version in output.versions() {
        let (Some(key), Some(version_id), Some(modified)) =
            (version.key(), version.version_id(), version.last_modified())
        else {
            warn!("Skipping incomplete version entry: {:?}", version);
            continue;
        };
        let Some(last_modified) = DateTime::<Utc>::from_timestamp(modified.secs(), modified.subsec_nanos()) else {
            warn!("Skipping {} version {}: modification time out of range", key, version_id);
            continue;
        };
        records.push(VersionRecord {
            key: key.to_string(),
            version_id: version_id.to_string(),
            last_modified,
            is_latest: version.is_latest().unwrap_or(false),
        });
    }

    if !output.delete_markers().is_empty() {
        debug!("Ignoring {} delete markers", output.delete_markers().len());
    }

    let next = match (output.is_truncated().unwrap_or(false), output.next_key_marker()) {
        (true, Some(key_marker)) => Some(PageMarker {
            key_marker: key_marker.to_string(),
            version_id_marker: output.next_version_id_marker().map(str::to_string),
        }),
        (true, None) => {
            return Err(AppError::StorageList {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: "listing truncated without a continuation marker".into(),
            });
        }
        _ => None,
    };

    Ok(VersionPage { records, next })
}

/// Builds the `CopySource` header value for a specific version.
/// Path segments of the key are URL-encoded, the separators are kept.
fn copy_source(bucket: &str, key: &str, version_id: &str) -> String {
    let encoded_key = key
        .split('/')
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}?versionId={}", bucket, encoded_key, encode_component(version_id))
}

fn encode_component(component: &str) -> String {
    // form encoding turns spaces into '+'; literal '+' is already %2B at this point
    url::form_urlencoded::byte_serialize(component.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
