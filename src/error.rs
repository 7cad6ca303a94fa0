use std::time::Duration;

use thiserror::Error;

/// Rejected submission. Nothing is added to the shelf.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a book needs a title")]
    MissingTitle,
    #[error("a book needs a cover image")]
    MissingImage,
    #[error("cover image must be an embedded data URI")]
    ImageNotEmbedded,
}

/// The persisted slot held something that is not a shelf.
#[derive(Debug, Error)]
pub enum PersistenceParseError {
    #[error("malformed shelf payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported shelf version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image file is empty")]
    Empty,
    #[error("could not read image file: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("could not decode image: {0}")]
    Malformed(#[source] image::ImageError),
    #[error("image decode did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("image decoder stopped without a result")]
    WorkerFailed,
    #[error("could not encode cover: {0}")]
    Encode(#[source] image::ImageError),
    #[error("not a base64 image data URI")]
    InvalidDataUri,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("slot storage failed: {0}")]
    Backend(#[from] rusqlite::Error),
    #[error("could not prepare data directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize shelf: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max dimension must be positive")]
    ZeroDimension,
    #[error("jpeg quality must be between 1 and 100, got {0}")]
    Quality(u8),
    #[error("decode timeout must be positive")]
    ZeroTimeout,
    #[error("slot name cannot be empty")]
    EmptySlot,
    #[error("no data directory available, pass --data-dir or set BOOKSHELF_DATA_DIR")]
    NoDataDir,
}
