// s3r/src/restore/logic.rs
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::lister::list_all_versions;
use super::restorer::{FailurePolicy, ObjectRestorer, RestoreReport};
use super::selector::RestoreSelector;
use crate::config::RestoreConfig;
use crate::errors::{AppError, Result};
use crate::storage::VersionStore;

pub async fn perform_restore_orchestration(
    restore_config: &RestoreConfig,
    store: &dyn VersionStore,
    cancel: CancellationToken,
) -> Result<RestoreReport> {
    let restore_point = restore_config.restore_point;
    let bucket = restore_config.bucket.as_str();
    let prefix = restore_config.prefix.as_str();

    info!(
        "Restoring s3://{}/{} to its state before {}",
        bucket, prefix, restore_point
    );

    // The whole listing is fetched first so a listing error leaves the bucket untouched.
    let versions = list_all_versions(store, bucket, prefix).await?;

    let policy = if restore_config.keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };
    let targets = RestoreSelector::new(restore_point).select(versions);
    let mut report = ObjectRestorer::new(store, bucket, cancel)
        .with_concurrency(restore_config.concurrency)
        .with_policy(policy)
        .apply(targets)
        .await;

    info!("Restore finished: {}", report.summary());
    for target in report.unprocessed() {
        warn!("Not restored: s3://{}/{} (version {})", bucket, target.key, target.version_id);
    }

    if policy == FailurePolicy::Abort && !report.failed.is_empty() {
        let first = report.failed.remove(0);
        return Err(first.error);
    }

    if !report.skipped.is_empty() {
        return Err(AppError::Cancelled(format!(
            "restore interrupted, {} object(s) were not processed",
            report.skipped.len()
        )));
    }

    Ok(report)
}
