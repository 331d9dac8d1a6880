//! Error types for ingestion and the record store.

use thiserror::Error;
use uuid::Uuid;

use crate::models::FileStatus;

/// Failures reported by the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("file record {0} not found")]
    NotFound(Uuid),

    #[error("file record {id} cannot move to {next}; it is missing or already finalized")]
    RejectedTransition { id: Uuid, next: FileStatus },

    #[error("stored file record is unreadable: {0}")]
    Corrupt(String),

    #[error("store rejected the write: {0}")]
    Rejected(String),
}

/// Failures surfaced to the caller of an ingestion attempt.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("only .{expected} files are accepted (got '{filename}')")]
    InvalidExtension { filename: String, expected: &'static str },

    #[error("file size {size_bytes} bytes exceeds the {limit_bytes} byte limit")]
    OversizedDocument { size_bytes: u64, limit_bytes: u64 },

    #[error("invalid XML document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
