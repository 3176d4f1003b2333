//! PostgreSQL delay queue
//!
//! Entries are rows of `delay_queue`. Claiming is a single `UPDATE` over a
//! `FOR UPDATE SKIP LOCKED` sub-select, so rows another drain is claiming at the
//! same moment are skipped rather than returned twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stepwatch_core::domain::job::JobKey;

use super::{DelayQueue, QueueEntry, QueueError};

#[derive(Debug, Clone)]
pub struct PgDelayQueue {
    pool: PgPool,
}

impl PgDelayQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    job_key: String,
    payload: String,
    not_before: DateTime<Utc>,
}

impl From<EntryRow> for QueueEntry {
    fn from(row: EntryRow) -> Self {
        Self {
            key: JobKey::from(row.job_key),
            payload: row.payload,
            not_before: row.not_before,
        }
    }
}

#[async_trait]
impl DelayQueue for PgDelayQueue {
    async fn insert(&self, entry: &QueueEntry) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            INSERT INTO delay_queue (job_key, payload, not_before)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_key) DO UPDATE
            SET payload = EXCLUDED.payload, not_before = EXCLUDED.not_before
            "#,
        )
        .bind(entry.key.as_str())
        .bind(&entry.payload)
        .bind(entry.not_before)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        claimed_until: DateTime<Utc>,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            UPDATE delay_queue AS q
            SET not_before = $2
            FROM (
                SELECT job_key
                FROM delay_queue
                WHERE not_before <= $1
                ORDER BY not_before
                FOR UPDATE SKIP LOCKED
            ) AS due
            WHERE q.job_key = due.job_key
            RETURNING q.job_key, q.payload, q.not_before
            "#,
        )
        .bind(now)
        .bind(claimed_until)
        .fetch_all(&self.pool)
        .await?;

        // RETURNING carries no order; every row shares the same new score
        let mut claimed: Vec<QueueEntry> = rows.into_iter().map(Into::into).collect();
        claimed.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(claimed)
    }

    async fn remove(&self, key: &JobKey) -> Result<bool, QueueError> {
        let result = sqlx::query("DELETE FROM delay_queue WHERE job_key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT job_key, payload, not_before
            FROM delay_queue
            ORDER BY not_before ASC, job_key ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), QueueError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Run against a scratch database:
    //! `DATABASE_URL=postgres://... cargo test -- --ignored`

    use super::*;
    use crate::db;
    use crate::testing::{at, sample_job};
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn queue() -> PgDelayQueue {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = db::create_pool(&url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        sqlx::query("DELETE FROM delay_queue")
            .execute(&pool)
            .await
            .unwrap();
        PgDelayQueue::new(pool)
    }

    fn entry(pipeline_id: u64, not_before: DateTime<Utc>) -> QueueEntry {
        QueueEntry::for_job(&sample_job(pipeline_id), not_before).unwrap()
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_claim_and_rescore() {
        let queue = queue().await;
        queue.insert(&entry(1, at(4))).await.unwrap();

        assert!(queue.claim_due(at(3), at(7)).await.unwrap().is_empty());

        let claimed = queue.claim_due(at(5), at(9)).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].not_before, at(9));
        assert_eq!(claimed[0].decode().unwrap(), sample_job(1));

        assert!(queue.claim_due(at(8), at(12)).await.unwrap().is_empty());
        assert_eq!(queue.claim_due(at(9), at(13)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_upsert_and_remove() {
        let queue = queue().await;
        let first = entry(1, at(0));
        queue.insert(&first).await.unwrap();
        queue.insert(&entry(1, at(20))).await.unwrap();

        let all = queue.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].not_before, at(20));

        assert!(queue.remove(&first.key).await.unwrap());
        assert!(!queue.remove(&first.key).await.unwrap());
        queue.ping().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires PostgreSQL"]
    async fn test_concurrent_claims_are_disjoint() {
        let queue = Arc::new(queue().await);
        for id in 0..100 {
            queue.insert(&entry(id, at(0))).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..6 {
            let queue = Arc::clone(&queue);
            handles.push(tokio::spawn(async move {
                queue.claim_due(at(1), at(5)).await.unwrap()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for claimed in handle.await.unwrap() {
                assert!(seen.insert(claimed.key), "entry claimed twice");
            }
        }
        assert_eq!(seen.len(), 100);
    }
}
