use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, FreedictError>;

/// Enum representing all possible errors in the freedict_rs library.
#[derive(Error, Debug)]
pub enum FreedictError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Data directory not found or could not be determined")]
    DataDirNotFound,

    #[error("Required data file not found: {0}")]
    DataFileNotFound(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Refusing to read block at offset {offset}: length {length} exceeds the block limit")]
    BlockTooLarge { offset: u64, length: u32 },

    #[error("Failed to parse data: {0}")]
    ParseError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Import cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String), // For unexpected situations
}
