use thiserror::Error;

use super::mapper::MapError;
use crate::blogger::FeedError;
use crate::storage::DatabaseError;

/// Errors raised while setting up or running a migration.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The remote service rejected the credentials
    #[error("Incorrect Blogger username or password")]
    Authentication,

    /// A configured value does not match the local store or the remote account
    #[error("{0}")]
    Configuration(String),

    /// The operator supplied an empty or unusable answer
    #[error("{0}")]
    Input(String),

    #[error("Blogger request failed: {0}")]
    Feed(FeedError),

    #[error("Could not map remote record: {0}")]
    Mapping(#[from] MapError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Console read/write failed
    #[error("Console I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FeedError> for MigrateError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::Authentication => MigrateError::Authentication,
            other => MigrateError::Feed(other),
        }
    }
}

impl MigrateError {
    /// True for errors that abort the run before or between posts.
    ///
    /// Everything else is confined to the post being imported.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrateError::Authentication
                | MigrateError::Configuration(_)
                | MigrateError::Input(_)
                | MigrateError::Io(_)
        )
    }
}
