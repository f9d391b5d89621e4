// s3r/src/restore/selector.rs
//! Point-in-time version selection.
//!
//! Listings deliver the versions of each key newest first. Walking them in
//! that order, the first version written strictly before the restore point
//! is the one that was current at that moment. Every older version of the
//! same key is ignored after that.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;
use crate::storage::VersionRecord;

/// The moment objects are restored to, with one second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RestorePoint(DateTime<Utc>);

impl RestorePoint {
    pub fn from_unix_seconds(secs: i64) -> Result<Self, AppError> {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .map(RestorePoint)
            .ok_or_else(|| AppError::InvalidTimestamp {
                input: secs.to_string(),
                reason: "outside the representable range".into(),
            })
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl FromStr for RestorePoint {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs: i64 = s.trim().parse().map_err(|e: std::num::ParseIntError| AppError::InvalidTimestamp {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        RestorePoint::from_unix_seconds(secs).map_err(|_| AppError::InvalidTimestamp {
            input: s.to_string(),
            reason: "outside the representable range".into(),
        })
    }
}

impl fmt::Display for RestorePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A key and the version that should become its current version again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTarget {
    pub key: String,
    pub version_id: String,
    pub last_modified: DateTime<Utc>,
    /// The chosen version is already the key's current version.
    pub is_current: bool,
}

/// Selection state for a single restore pass.
#[derive(Debug)]
pub struct RestoreSelector {
    restore_point: RestorePoint,
    seen: HashSet<String>,
}

impl RestoreSelector {
    pub fn new(restore_point: RestorePoint) -> Self {
        RestoreSelector {
            restore_point,
            seen: HashSet::new(),
        }
    }

    /// Feeds the next record in listing order.
    pub fn offer(&mut self, record: &VersionRecord) -> Option<RestoreTarget> {
        if self.seen.contains(&record.key) {
            return None;
        }
        // Strictly before: a version written exactly at the restore point is not selected.
        if record.last_modified < self.restore_point.as_datetime() {
            self.seen.insert(record.key.clone());
            return Some(RestoreTarget {
                key: record.key.clone(),
                version_id: record.version_id.clone(),
                last_modified: record.last_modified,
                is_current: record.is_latest,
            });
        }
        None
    }

    /// Lazily selects targets from `records`, consuming the selector.
    pub fn select<I>(self, records: I) -> SelectTargets<I::IntoIter>
    where
        I: IntoIterator<Item = VersionRecord>,
    {
        SelectTargets {
            selector: self,
            records: records.into_iter(),
        }
    }
}

/// Iterator returned by [`RestoreSelector::select`].
pub struct SelectTargets<I> {
    selector: RestoreSelector,
    records: I,
}

impl<I> Iterator for SelectTargets<I>
where
    I: Iterator<Item = VersionRecord>,
{
    type Item = RestoreTarget;

    fn next(&mut self) -> Option<Self::Item> {
        for record in self.records.by_ref() {
            if let Some(target) = self.selector.offer(&record) {
                return Some(target);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.records.size_hint().1)
    }
}

#[cfg(test)]
pub fn select_restore_targets<I>(restore_point: RestorePoint, records: I) -> Vec<RestoreTarget>
where
    I: IntoIterator<Item = VersionRecord>,
{
    RestoreSelector::new(restore_point).select(records).collect()
}
