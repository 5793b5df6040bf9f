use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::db::{DbError, ImportLog, NewImportLog};

#[derive(Clone)]
pub struct ImportLogRepository {
    pool: PgPool,
}

impl ImportLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, log), fields(file_name = %log.file_name))]
    pub async fn record(&self, log: &NewImportLog) -> Result<i64, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO import_logs (
                file_name, total_records, imported_records, updated_records,
                skipped_records, error_records, success, duration_ms, report
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&log.file_name)
        .bind(log.total_records)
        .bind(log.imported_records)
        .bind(log.updated_records)
        .bind(log.skipped_records)
        .bind(log.error_records)
        .bind(log.success)
        .bind(log.duration_ms)
        .bind(&log.report)
        .fetch_one(&self.pool)
        .await?;

        info!("Recorded import log {} for {}", id, log.file_name);
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn find_recent(&self, limit: i64) -> Result<Vec<ImportLog>, DbError> {
        let logs = sqlx::query_as::<_, ImportLog>(
            r#"
            SELECT id, file_name, total_records, imported_records, updated_records,
                   skipped_records, error_records, success, duration_ms, report, created_at
            FROM import_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} import logs", logs.len());
        Ok(logs)
    }
}
