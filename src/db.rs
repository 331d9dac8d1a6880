use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{FileRecord, FileSize, FileStatus, NewFileRecord, TradeRecord};
use crate::store::{ensure_finalizing, RecordStore};

const SELECT_FILES: &str = "SELECT id, filename, status, file_type, file_size_kb, \
     file_content, sample_trades, upload_date \
     FROM trade_ingest.files";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Record store backed by the `trade_ingest.files` table.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &PgRow) -> Result<FileRecord, StoreError> {
    let status: String = row.try_get("status")?;
    let Json(sample_trades): Json<Vec<TradeRecord>> = row.try_get("sample_trades")?;

    Ok(FileRecord {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        status: status.parse().map_err(StoreError::Corrupt)?,
        file_type: row.try_get("file_type")?,
        file_size: FileSize::from_kb(row.try_get("file_size_kb")?),
        raw_content: row.try_get("file_content")?,
        sample_trades,
        uploaded_at: row.try_get("upload_date")?,
    })
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_record(&self, record: &NewFileRecord) -> Result<Uuid, StoreError> {
        let trades = i32::try_from(record.trade_count())
            .map_err(|_| StoreError::Rejected("too many trades for one file".to_string()))?;

        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO trade_ingest.files
            (id, filename, status, file_type, file_size_kb, file_content,
             trades, sample_trades, upload_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.filename)
        .bind(record.status.as_str())
        .bind(&record.file_type)
        .bind(record.file_size.kb())
        .bind(&record.raw_content)
        .bind(trades)
        .bind(Json(&record.sample_trades))
        .bind(record.uploaded_at)
        .fetch_one(&self.pool)
        .await?
        .try_get("id")?;

        Ok(id)
    }

    async fn update_status(&self, id: Uuid, status: FileStatus) -> Result<(), StoreError> {
        ensure_finalizing(id, status)?;

        let result = sqlx::query(
            r#"
            UPDATE trade_ingest.files
            SET status = $2
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(FileStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RejectedTransition { id, next: status });
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>, StoreError> {
        let query = format!("{SELECT_FILES} ORDER BY upload_date DESC");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        let query = format!("{SELECT_FILES} ORDER BY upload_date DESC LIMIT $1");
        let rows = sqlx::query(&query)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn fetch_record(&self, id: Uuid) -> Result<Option<FileRecord>, StoreError> {
        let query = format!("{SELECT_FILES} WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn delete_record(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM trade_ingest.files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }
}
