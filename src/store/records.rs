use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::error::AppError;
use crate::models::job::JobRecord;

/// Destination for finished walks. `id` is the conflict key.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Upsert every record. Returns whether the records were actually stored.
    async fn upsert(&self, records: &[JobRecord], owner_id: Option<&str>) -> Result<bool, AppError>;

    /// False when records are dropped on the floor (no database configured).
    fn is_persistent(&self) -> bool {
        true
    }
}

/// Writes into the `career_board` table, which is provisioned externally.
#[derive(Clone)]
pub struct PgRecordSink {
    pool: PgPool,
}

impl PgRecordSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const UPSERT_SQL: &str = "INSERT INTO career_board (
        id, url, collection, title, employer, employer_url, location, posted_time,
        employment_type, workplace_type, is_promoted, supports_expedited_apply,
        is_actively_hiring, description, hiring_team, match_analysis, owner_id, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW())
    ON CONFLICT (id) DO UPDATE SET
        url = EXCLUDED.url,
        collection = EXCLUDED.collection,
        title = EXCLUDED.title,
        employer = EXCLUDED.employer,
        employer_url = EXCLUDED.employer_url,
        location = EXCLUDED.location,
        posted_time = EXCLUDED.posted_time,
        employment_type = EXCLUDED.employment_type,
        workplace_type = EXCLUDED.workplace_type,
        is_promoted = EXCLUDED.is_promoted,
        supports_expedited_apply = EXCLUDED.supports_expedited_apply,
        is_actively_hiring = EXCLUDED.is_actively_hiring,
        description = COALESCE(EXCLUDED.description, career_board.description),
        hiring_team = COALESCE(EXCLUDED.hiring_team, career_board.hiring_team),
        match_analysis = COALESCE(EXCLUDED.match_analysis, career_board.match_analysis),
        owner_id = COALESCE(EXCLUDED.owner_id, career_board.owner_id),
        updated_at = NOW()";

#[async_trait]
impl RecordSink for PgRecordSink {
    async fn upsert(&self, records: &[JobRecord], owner_id: Option<&str>) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(UPSERT_SQL)
                .bind(&record.id)
                .bind(&record.url)
                .bind(record.collection.as_str())
                .bind(&record.title)
                .bind(&record.employer)
                .bind(&record.employer_url)
                .bind(&record.location)
                .bind(&record.posted_time)
                .bind(&record.employment_type)
                .bind(&record.workplace_type)
                .bind(record.is_promoted)
                .bind(record.supports_expedited_apply)
                .bind(record.is_actively_hiring)
                .bind(&record.description)
                .bind(record.hiring_team.as_ref().map(Json))
                .bind(record.match_analysis.as_ref().map(Json))
                .bind(owner_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!("Upserted {} jobs into career_board", records.len());
        Ok(true)
    }
}

/// Used when no database is configured; records only live in the job result.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl RecordSink for NullSink {
    async fn upsert(&self, records: &[JobRecord], _owner_id: Option<&str>) -> Result<bool, AppError> {
        tracing::warn!(
            "No database configured, skipping save of {} jobs",
            records.len()
        );
        Ok(false)
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collection::Collection;

    #[tokio::test]
    async fn null_sink_reports_not_saved() {
        let sink = NullSink;
        let records = vec![JobRecord::new("1", Collection::Retail)];
        assert!(!sink.upsert(&records, Some("owner-1")).await.unwrap());
        assert!(!sink.is_persistent());
    }

    #[test]
    fn upsert_statement_binds_every_column() {
        let placeholders = (1..=17).filter(|n| UPSERT_SQL.contains(&format!("${n}"))).count();
        assert_eq!(placeholders, 17);
        assert!(UPSERT_SQL.contains("ON CONFLICT (id) DO UPDATE"));
    }
}
