// s3r/src/restore/restorer.rs
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::selector::RestoreTarget;
use crate::errors::AppError;
use crate::storage::VersionStore;

/// What to do with the remaining targets once a copy fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop issuing new copies after the first failure.
    Abort,
    /// Record the failure and carry on with the rest.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredObject {
    pub target: RestoreTarget,
    pub new_version_id: Option<String>,
}

#[derive(Debug)]
pub struct CopyFailure {
    pub target: RestoreTarget,
    pub error: AppError,
}

/// Per-target outcome of a restore run.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<RestoredObject>,
    pub failed: Vec<CopyFailure>,
    /// Targets that were never attempted because the run was stopped.
    pub skipped: Vec<RestoreTarget>,
}

impl RestoreReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Targets left untouched by the run, failures first, in emission order.
    pub fn unprocessed(&self) -> impl Iterator<Item = &RestoreTarget> {
        self.failed.iter().map(|f| &f.target).chain(self.skipped.iter())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} restored, {} failed, {} skipped",
            self.restored.len(),
            self.failed.len(),
            self.skipped.len()
        )
    }
}

enum CopyOutcome {
    Restored(RestoredObject),
    Failed(CopyFailure),
    Skipped(RestoreTarget),
}

/// Copies selected versions back on top of their keys.
pub struct ObjectRestorer<'a> {
    store: &'a dyn VersionStore,
    bucket: &'a str,
    concurrency: usize,
    policy: FailurePolicy,
    cancel: CancellationToken,
}

impl<'a> ObjectRestorer<'a> {
    pub fn new(store: &'a dyn VersionStore, bucket: &'a str, cancel: CancellationToken) -> Self {
        ObjectRestorer {
            store,
            bucket,
            concurrency: 1,
            policy: FailurePolicy::Abort,
            cancel,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Applies `targets` in the order given.
    ///
    /// Targets hold distinct keys, so at most one copy per key is ever in
    /// flight. Once the token is cancelled no further copy is started.
    pub async fn apply<I>(&self, targets: I) -> RestoreReport
    where
        I: IntoIterator<Item = RestoreTarget>,
    {
        let outcomes: Vec<CopyOutcome> = stream::iter(targets)
            .map(|target| self.restore_one(target))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = RestoreReport::default();
        for outcome in outcomes {
            match outcome {
                CopyOutcome::Restored(restored) => report.restored.push(restored),
                CopyOutcome::Failed(failure) => report.failed.push(failure),
                CopyOutcome::Skipped(target) => report.skipped.push(target),
            }
        }
        report
    }

    async fn restore_one(&self, target: RestoreTarget) -> CopyOutcome {
        if self.cancel.is_cancelled() {
            return CopyOutcome::Skipped(target);
        }

        if target.is_current {
            debug!("{} is already at version {}, copying anyway", target.key, target.version_id);
        }
        info!(
            "Restoring s3://{}/{} to version {} (modified {})",
            self.bucket, target.key, target.version_id, target.last_modified
        );
        match self
            .store
            .copy_version(self.bucket, &target.key, &target.version_id)
            .await
        {
            Ok(new_version_id) => {
                info!(
                    "Restored s3://{}/{} as version {}",
                    self.bucket,
                    target.key,
                    new_version_id.as_deref().unwrap_or("(unversioned)")
                );
                CopyOutcome::Restored(RestoredObject {
                    target,
                    new_version_id,
                })
            }
            Err(error) => {
                error!("{}", error);
                if self.policy == FailurePolicy::Abort && !self.cancel.is_cancelled() {
                    warn!("Stopping after the first failed copy; remaining objects are left untouched");
                    self.cancel.cancel();
                }
                CopyOutcome::Failed(CopyFailure { target, error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::VersionRecord;
    use crate::storage::memory::MemoryVersionStore;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn target(key: &str, version_id: &str) -> RestoreTarget {
        RestoreTarget {
            key: key.to_string(),
            version_id: version_id.to_string(),
            last_modified: Utc.with_ymd_and_hms(2021, 5, 1, 0, 0, 0).unwrap(),
            is_current: false,
        }
    }

    fn keys(targets: &[RestoreTarget]) -> Vec<&str> {
        targets.iter().map(|t| t.key.as_str()).collect()
    }

    fn seeded_store() -> MemoryVersionStore {
        let records = ["a", "b", "c", "d"]
            .iter()
            .map(|key| VersionRecord {
                key: key.to_string(),
                version_id: "v1".into(),
                last_modified: Utc.with_ymd_and_hms(2021, 5, 1, 0, 0, 0).unwrap(),
                is_latest: true,
            })
            .collect();
        MemoryVersionStore::new(records)
    }

    fn targets() -> Vec<RestoreTarget> {
        ["a", "b", "c", "d"].iter().map(|k| target(k, "v1")).collect()
    }

    #[tokio::test]
    async fn test_applies_targets_in_order() {
        let store = seeded_store();
        let report = ObjectRestorer::new(&store, "b", CancellationToken::new())
            .apply(targets())
            .await;

        assert!(report.is_success());
        assert_eq!(report.restored.len(), 4);
        assert!(report.restored.iter().all(|r| r.new_version_id.is_some()));
        let copied: Vec<String> = store.copies().into_iter().map(|(k, _)| k).collect();
        assert_eq!(copied, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_after_first_failure() {
        let store = seeded_store().failing_copy_for("b");
        let report = ObjectRestorer::new(&store, "b", CancellationToken::new())
            .apply(targets())
            .await;

        assert!(!report.is_success());
        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].target.key, "b");
        assert!(matches!(report.failed[0].error, AppError::StorageCopy { .. }));
        assert_eq!(keys(&report.skipped), vec!["c", "d"]);
        assert_eq!(report.summary(), "1 restored, 1 failed, 2 skipped");
        assert_eq!(
            report.unprocessed().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            vec!["b", "c", "d"]
        );
    }

    #[tokio::test]
    async fn test_continue_policy_attempts_every_target() {
        let store = seeded_store().failing_copy_for("b");
        let report = ObjectRestorer::new(&store, "b", CancellationToken::new())
            .with_policy(FailurePolicy::Continue)
            .apply(targets())
            .await;

        assert_eq!(report.restored.len(), 3);
        assert_eq!(report.failed.len(), 1);
        assert!(report.skipped.is_empty());
        let copied: Vec<String> = store.copies().into_iter().map(|(k, _)| k).collect();
        assert_eq!(copied, vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_everything() {
        let store = seeded_store();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = ObjectRestorer::new(&store, "b", cancel).apply(targets()).await;

        assert!(report.restored.is_empty());
        assert_eq!(keys(&report.skipped), vec!["a", "b", "c", "d"]);
        assert!(store.copies().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_copies_keep_one_per_key() {
        let store = seeded_store().with_copy_delay(Duration::from_millis(20));
        let report = ObjectRestorer::new(&store, "b", CancellationToken::new())
            .with_concurrency(4)
            .apply(targets())
            .await;

        assert!(report.is_success());
        let restored_keys: Vec<&str> = report.restored.iter().map(|r| r.target.key.as_str()).collect();
        assert_eq!(restored_keys, vec!["a", "b", "c", "d"]);
        assert!(store.max_in_flight() > 1);
        assert_eq!(store.max_in_flight_per_key(), 1);
    }

    #[tokio::test]
    async fn test_empty_target_list() {
        let store = seeded_store();
        let report = ObjectRestorer::new(&store, "b", CancellationToken::new())
            .apply(Vec::new())
            .await;
        assert!(report.is_success());
        assert_eq!(report.summary(), "0 restored, 0 failed, 0 skipped");
    }
}
