//! Record store gateway.
//!
//! The ingestion coordinator and the analytics commands only talk to the
//! store through this trait; `db::PgRecordStore` is the production backend.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{FileRecord, FileStatus, NewFileRecord};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record and return the id the store assigned to it.
    async fn create_record(&self, record: &NewFileRecord) -> Result<Uuid, StoreError>;

    /// Move a `Processing` record to `status`.
    async fn update_status(&self, id: Uuid, status: FileStatus) -> Result<(), StoreError>;

    /// Every record, newest upload first.
    async fn list_all(&self) -> Result<Vec<FileRecord>, StoreError>;

    /// The `limit` most recent uploads.
    async fn list_recent(&self, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        let mut records = self.list_all().await?;
        records.truncate(limit);
        Ok(records)
    }

    async fn fetch_record(&self, id: Uuid) -> Result<Option<FileRecord>, StoreError>;

    async fn delete_record(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Rejects any target that is not a legal move out of `Processing`.
pub fn ensure_finalizing(id: Uuid, next: FileStatus) -> Result<(), StoreError> {
    if FileStatus::Processing.can_transition_to(next) {
        Ok(())
    } else {
        Err(StoreError::RejectedTransition { id, next })
    }
}
