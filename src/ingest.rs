use chrono::Utc;
use uuid::Uuid;

use crate::error::{IngestError, Result, StoreError};
use crate::extractor;
use crate::models::{FileSize, FileStatus, NewFileRecord};
use crate::store::RecordStore;
use crate::validator::{self, Document};

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub id: Uuid,
    pub filename: String,
    pub status: FileStatus,
    pub trade_count: usize,
}

/// Runs validate -> extract -> create -> finalize for one document.
///
/// Validation and parse failures never reach the store. Once the record
/// exists, any later failure marks it `Failed` before being returned.
pub async fn ingest<S>(store: &S, document: &Document) -> Result<IngestOutcome>
where
    S: RecordStore + ?Sized,
{
    validator::validate(document).inspect_err(|e| {
        tracing::warn!(file = %document.name, error = %e, "upload rejected");
    })?;

    let text = document.text()?;
    let trades = extractor::extract(text).inspect_err(|e| {
        tracing::warn!(file = %document.name, error = %e, "document could not be parsed");
    })?;

    let record = NewFileRecord {
        filename: document.name.clone(),
        status: FileStatus::Processing,
        file_type: document
            .extension()
            .unwrap_or_else(|| validator::ACCEPTED_EXTENSION.to_string()),
        file_size: FileSize::from_bytes(document.size_bytes),
        raw_content: text.to_string(),
        sample_trades: trades,
        uploaded_at: Utc::now(),
    };
    let trade_count = record.trade_count();

    let id = store.create_record(&record).await.inspect_err(|e| {
        tracing::warn!(file = %document.name, error = %e, "store rejected new file record");
    })?;
    tracing::info!(%id, file = %document.name, trades = trade_count, "file record created");

    if let Err(err) = store.update_status(id, FileStatus::Completed).await {
        mark_failed(store, id, &err).await;
        return Err(IngestError::Store(err));
    }

    tracing::info!(%id, "file ingestion completed");
    Ok(IngestOutcome {
        id,
        filename: document.name.clone(),
        status: FileStatus::Completed,
        trade_count,
    })
}

async fn mark_failed<S>(store: &S, id: Uuid, cause: &StoreError)
where
    S: RecordStore + ?Sized,
{
    tracing::warn!(%id, error = %cause, "finalizing file record failed; marking as Failed");
    if let Err(e) = store.update_status(id, FileStatus::Failed).await {
        tracing::error!(%id, error = %e, "could not mark file record as Failed");
    }
}
