use std::{io, path::PathBuf};
use thiserror::Error;

/// Failures of the persistence layer (account store and avatar media).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists: {0}")]
    Conflict(String),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed account store {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Outcomes of the registration and login flows that are not a success.
#[derive(Debug, Error)]
pub enum Error {
    #[error("username is required")]
    MissingUsername,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("username already taken")]
    UsernameTaken,
    // Same message for unknown users and wrong passwords.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("password hashing failed")]
    Hashing,
}

impl Error {
    /// Validation failures the caller can fix by changing the input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::MissingUsername | Self::PasswordMismatch)
    }
}
