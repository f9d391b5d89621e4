// In-memory VersionStore used by the restore tests.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{PageMarker, VersionPage, VersionRecord, VersionStore};
use crate::errors::{AppError, Result};

pub struct MemoryVersionStore {
    versions: Mutex<Vec<VersionRecord>>,
    page_size: usize,
    copy_time: DateTime<Utc>,
    copy_delay: Option<Duration>,
    fail_listing_on_page: Option<usize>,
    failing_keys: HashSet<String>,
    copies: Mutex<Vec<(String, String)>>,
    pages_served: AtomicUsize,
    in_flight: Mutex<HashMap<String, usize>>,
    max_in_flight_per_key: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryVersionStore {
    /// `versions` must already be in listing order (newest first per key).
    pub fn new(versions: Vec<VersionRecord>) -> Self {
        MemoryVersionStore {
            versions: Mutex::new(versions),
            page_size: 1000,
            copy_time: Utc::now(),
            copy_delay: None,
            fail_listing_on_page: None,
            failing_keys: HashSet::new(),
            copies: Mutex::new(Vec::new()),
            pages_served: AtomicUsize::new(0),
            in_flight: Mutex::new(HashMap::new()),
            max_in_flight_per_key: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_copy_delay(mut self, delay: Duration) -> Self {
        self.copy_delay = Some(delay);
        self
    }

    /// Fails the listing request for the given 1-based page number.
    pub fn failing_listing_on_page(mut self, page: usize) -> Self {
        self.fail_listing_on_page = Some(page);
        self
    }

    pub fn failing_copy_for(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    pub fn copies(&self) -> Vec<(String, String)> {
        self.copies.lock().unwrap().clone()
    }

    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight_per_key(&self) -> usize {
        self.max_in_flight_per_key.load(Ordering::SeqCst)
    }

    fn enter(&self, key: &str) {
        let mut in_flight = self.in_flight.lock().unwrap();
        let count = in_flight.entry(key.to_string()).or_default();
        *count += 1;
        self.max_in_flight_per_key.fetch_max(*count, Ordering::SeqCst);
        let total: usize = in_flight.values().sum();
        self.max_in_flight.fetch_max(total, Ordering::SeqCst);
    }

    fn leave(&self, key: &str) {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(count) = in_flight.get_mut(key) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn list_versions_page(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&PageMarker>,
    ) -> Result<VersionPage> {
        let page_number = self.pages_served.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_listing_on_page == Some(page_number) {
            return Err(AppError::StorageList {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: "SlowDown: please reduce your request rate".into(),
            });
        }

        let versions = self.versions.lock().unwrap();
        let matching: Vec<&VersionRecord> = versions.iter().filter(|v| v.key.starts_with(prefix)).collect();

        let start = match marker {
            Some(marker) => matching
                .iter()
                .position(|v| {
                    v.key == marker.key_marker
                        && marker.version_id_marker.as_deref() == Some(v.version_id.as_str())
                })
                .map(|i| i + 1)
                .unwrap_or(matching.len()),
            None => 0,
        };
        let end = (start + self.page_size).min(matching.len());
        let records: Vec<VersionRecord> = matching[start..end].iter().map(|v| (*v).clone()).collect();

        let next = if end < matching.len() {
            records.last().map(|last| PageMarker {
                key_marker: last.key.clone(),
                version_id_marker: Some(last.version_id.clone()),
            })
        } else {
            None
        };

        Ok(VersionPage { records, next })
    }

    async fn copy_version(&self, bucket: &str, key: &str, version_id: &str) -> Result<Option<String>> {
        self.enter(key);
        if let Some(delay) = self.copy_delay {
            tokio::time::sleep(delay).await;
        }
        self.leave(key);

        if self.failing_keys.contains(key) {
            return Err(AppError::StorageCopy {
                bucket: bucket.to_string(),
                key: key.to_string(),
                version_id: version_id.to_string(),
                message: "AccessDenied".into(),
            });
        }

        let mut versions = self.versions.lock().unwrap();
        let new_version_id = format!("copy-{}", versions.len());
        for existing in versions.iter_mut().filter(|v| v.key == key) {
            existing.is_latest = false;
        }
        let position = versions.iter().position(|v| v.key == key).unwrap_or(versions.len());
        versions.insert(
            position,
            VersionRecord {
                key: key.to_string(),
                version_id: new_version_id.clone(),
                last_modified: self.copy_time,
                is_latest: true,
            },
        );
        self.copies
            .lock()
            .unwrap()
            .push((key.to_string(), version_id.to_string()));
        Ok(Some(new_version_id))
    }
}
