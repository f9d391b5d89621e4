// s3r/src/restore/lister.rs
use tracing::{debug, info};

use crate::errors::Result;
use crate::storage::{VersionRecord, VersionStore};

/// Lists every version under `prefix`, following pagination to the end.
///
/// Records come back in provider order. Nothing is returned unless every
/// page was fetched.
pub async fn list_all_versions(
    store: &dyn VersionStore,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<VersionRecord>> {
    info!("Listing object versions in s3://{}/{}", bucket, prefix);

    let mut records = Vec::new();
    let mut marker = None;
    let mut pages = 0usize;

    loop {
        let page = store.list_versions_page(bucket, prefix, marker.as_ref()).await?;
        pages += 1;
        debug!("Page {}: {} versions", pages, page.records.len());
        records.extend(page.records);

        match page.next {
            Some(next) => marker = Some(next),
            None => break,
        }
    }

    info!("Listed {} versions across {} page(s)", records.len(), pages);
    Ok(records)
}
