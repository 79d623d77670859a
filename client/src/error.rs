//! Unified error handling for the client.

use crate::config::ConfigError;
use crate::remote::RemoteError;
use crate::storage::StorageError;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Engine error: {0}")]
    Engine(#[from] tote_engine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sync engine stopped before the mutation was applied")]
    Closed,
}

impl SyncError {
    /// Message suitable for showing to the person using the app.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                "Could not access data saved on this device.".to_string()
            }
            SyncError::Remote(e) => e.user_message("sync"),
            SyncError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                e.to_string()
            }
            SyncError::Config(e) => e.to_string(),
            SyncError::Closed => "The app is shutting down.".to_string(),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tote_engine::CollectionKind;

    #[test]
    fn user_messages() {
        let err = SyncError::from(tote_engine::Error::UnsupportedForKind {
            operation: "setQuantity",
            kind: CollectionKind::Liked,
        });
        assert_eq!(
            err.user_message(),
            "operation 'setQuantity' is not supported for liked collections"
        );

        let err = SyncError::from(RemoteError::Unauthorized(401));
        assert_eq!(err.user_message(), "Authorization error when trying to sync.");

        let err = SyncError::from(ConfigError::MissingApiUrl);
        assert_eq!(err.to_string(), "Configuration error: API_URL environment variable is required");
    }
}
