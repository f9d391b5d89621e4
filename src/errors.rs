use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to list object versions in bucket {bucket} (prefix {prefix:?}): {message}")]
    StorageList {
        bucket: String,
        prefix: String,
        message: String,
    },

    #[error("Failed to restore s3://{bucket}/{key} from version {version_id}: {message}")]
    StorageCopy {
        bucket: String,
        key: String,
        version_id: String,
        message: String,
    },

    #[error("Command not implemented: {0}")]
    NotImplemented(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl AppError {
    /// Process exit code for this error class.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Argument(_)
            | AppError::InvalidTimestamp { .. }
            | AppError::Config(_)
            | AppError::NotImplemented(_) => 2,
            AppError::Cancelled(_) => 130,
            AppError::StorageList { .. } | AppError::StorageCopy { .. } => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
