use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not attached to a game client")]
    NotAttached,

    #[error("No running game client found")]
    ProcessNotFound,

    #[error("Access to the game process was denied")]
    PermissionDenied,

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Module not found in target process: {0}")]
    ModuleNotFound(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to open archive: {}", .0.display())]
    ArchiveOpenFailed(PathBuf),

    #[error("Failed to decode the property definition record")]
    RegistryParseFailed,

    #[error("Player entity not found in the entity table")]
    PlayerNotFound,

    #[error("Record data truncated at offset {offset}")]
    TruncatedRecord { offset: usize },

    #[error("Invalid code signature: {0}")]
    InvalidSignature(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }
}
