//! Common error types for Transcriba

use std::fmt;
use thiserror::Error;

/// Common result type for Transcriba operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of record a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Role,
    Revision,
    Collection,
    Source,
    TranscribaObject,
    InfoPage,
    Discussion,
    Directory,
    Image,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::User => "user",
            Entity::Role => "role",
            Entity::Revision => "revision",
            Entity::Collection => "collection",
            Entity::Source => "source",
            Entity::TranscribaObject => "transcriba object",
            Entity::InfoPage => "info page",
            Entity::Discussion => "discussion",
            Entity::Directory => "directory",
            Entity::Image => "image file",
        };
        f.write_str(name)
    }
}

/// Error kinds shared by every Transcriba operation
#[derive(Error, Debug)]
pub enum Error {
    /// Requested record does not exist
    #[error("{0} was not found")]
    NotFound(Entity),

    /// Payload did not have the expected shape
    #[error("Expected data format was different")]
    WrongFormat,

    /// Mandatory input parameter missing or out of range
    #[error("Lack of mandatory input parameters: {0}")]
    WrongInput(String),

    /// Unique record already exists
    #[error("Cannot create a duplicate {0}")]
    Duplicate(String),

    /// Action was already carried out
    #[error("Action was already done")]
    Replay,

    /// Object is reserved by another user or not in an editable state
    #[error("Cannot access model because it is already occupied")]
    Occupied,

    /// User is already working on another object
    #[error("User is busy")]
    BusyUser,

    /// Missing or insufficient credentials
    #[error("User has not the required permissions: {0}")]
    Unauthorized(String),

    /// Action is never allowed for this principal
    #[error("This action is not allowed")]
    Forbidden,

    /// `administrator` must be the highest configured role
    #[error("Role administrator must be the last configured role")]
    WrongRoleOrder,

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote source could not be reached or answered with an error
    #[error("Remote source error: {0}")]
    Remote(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity() {
        let err = Error::NotFound(Entity::Revision);
        assert_eq!(err.to_string(), "revision was not found");
    }

    #[test]
    fn test_sqlx_error_converts() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::Database(_)));
    }
}
