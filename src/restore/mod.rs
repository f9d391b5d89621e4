mod logic;
pub(crate) mod lister; // Version listing with full pagination
pub(crate) mod restorer; // Copy-in-place of selected versions
pub(crate) mod selector; // Point-in-time version selection

use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, OperationConfig};
use crate::errors::{AppError, Result};
use crate::storage::VersionStore;

pub use restorer::RestoreReport;

/// Public entry point for the restore process.
/// Lists, selects and copies using the storage client built by `main`.
pub async fn run_restore_flow(
    app_config: &AppConfig,
    store: &dyn VersionStore,
    cancel: CancellationToken,
) -> Result<RestoreReport> {
    let restore_config = match &app_config.operation {
        Some(OperationConfig::Restore(cfg)) => cfg,
        _ => {
            return Err(AppError::Config(
                "Restore operation selected but no restore configuration found.".into(),
            ));
        }
    };

    logic::perform_restore_orchestration(restore_config, store, cancel).await
}
