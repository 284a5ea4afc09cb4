// SQLite SubmissionStore

use async_trait::async_trait;
use sqlx::SqlitePool;

use judge_core::domain::{Job, Language, NewSubmission, Submission};
use judge_core::error::{AppError, Result};
use judge_core::port::{SubmissionFilter, SubmissionStore};

use crate::job_store::JobRow;
use crate::map_sqlx_error;

pub struct SqliteSubmissionStore {
    pool: SqlitePool,
}

impl SqliteSubmissionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for SqliteSubmissionStore {
    async fn create_with_job(
        &self,
        new: NewSubmission,
        callback_url: Option<String>,
        now: i64,
    ) -> Result<(Submission, Job)> {
        // Submission and first job commit together or not at all.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row: SubmissionRow = sqlx::query_as(
            r#"
            INSERT INTO submissions (uid, gid, time, problem_id, code, language)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(new.uid)
        .bind(new.gid)
        .bind(now)
        .bind(new.problem_id)
        .bind(&new.code)
        .bind(new.language.as_code())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let job_row: JobRow = sqlx::query_as(
            r#"
            INSERT INTO jobs (submission_id, creation_time, status, callback_url)
            VALUES (?, ?, 'queued', ?)
            RETURNING *
            "#,
        )
        .bind(row.id)
        .bind(now)
        .bind(&callback_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok((row.try_into_submission()?, job_row.try_into_job()?))
    }

    async fn find(&self, id: i64) -> Result<Option<Submission>> {
        let row: Option<SubmissionRow> =
            sqlx::query_as("SELECT * FROM submissions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(SubmissionRow::try_into_submission).transpose()
    }

    async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>> {
        let rows: Vec<SubmissionRow> = match filter {
            SubmissionFilter::All => {
                sqlx::query_as("SELECT * FROM submissions ORDER BY id ASC")
                    .fetch_all(&self.pool)
                    .await
            }
            SubmissionFilter::Uid(uid) => {
                sqlx::query_as("SELECT * FROM submissions WHERE uid = ? ORDER BY id ASC")
                    .bind(uid)
                    .fetch_all(&self.pool)
                    .await
            }
            SubmissionFilter::Gid(gid) => {
                sqlx::query_as("SELECT * FROM submissions WHERE gid = ? ORDER BY id ASC")
                    .bind(gid)
                    .fetch_all(&self.pool)
                    .await
            }
            SubmissionFilter::Problem(problem_id) => {
                sqlx::query_as("SELECT * FROM submissions WHERE problem_id = ? ORDER BY id ASC")
                    .bind(problem_id)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(SubmissionRow::try_into_submission)
            .collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubmissionRow {
    id: i64,
    uid: Option<i64>,
    gid: Option<i64>,
    time: i64,
    problem_id: i64,
    code: String,
    language: String,
}

impl SubmissionRow {
    fn try_into_submission(self) -> Result<Submission> {
        let language = Language::parse(&self.language)
            .map_err(|_| AppError::Database(format!("Unknown language: {}", self.language)))?;
        Ok(Submission {
            id: self.id,
            uid: self.uid,
            gid: self.gid,
            time: self.time,
            problem_id: self.problem_id,
            code: self.code,
            language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;
    use judge_core::domain::JobStatus;

    async fn seed_problem(pool: &SqlitePool, id: i64) {
        sqlx::query(
            r#"
            INSERT INTO problems
                (id, last_modified, test_cases, time_limit, memory_limit,
                 generator_code, generator_language, grader_code, grader_language)
            VALUES (?, 0, 10, 1.0, 65536, 'gen', 'python3', 'grade', 'python3')
            "#,
        )
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    }

    fn new_submission(problem_id: i64, uid: Option<i64>, gid: Option<i64>) -> NewSubmission {
        NewSubmission {
            uid,
            gid,
            problem_id,
            code: "print('hi')".into(),
            language: Language::Python3,
        }
    }

    #[tokio::test]
    async fn create_with_job_yields_one_queued_job() {
        let pool = memory_pool().await;
        seed_problem(&pool, 1).await;
        let store = SqliteSubmissionStore::new(pool.clone());

        let (submission, job) = store
            .create_with_job(new_submission(1, Some(7), None), None, 1_000)
            .await
            .unwrap();

        assert_eq!(job.submission_id, submission.id);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.creation_time, 1_000);
        assert_eq!(submission.time, 1_000);

        let job_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE submission_id = ?")
                .bind(submission.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(job_count, 1);
    }

    #[tokio::test]
    async fn missing_problem_rolls_back_everything() {
        let pool = memory_pool().await;
        let store = SqliteSubmissionStore::new(pool.clone());

        // No problem row: the foreign key fails and neither row persists.
        let result = store
            .create_with_job(new_submission(42, None, None), None, 1_000)
            .await;
        assert!(result.is_err());

        let submissions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(submissions, 0);
    }

    #[tokio::test]
    async fn listing_filters() {
        let pool = memory_pool().await;
        seed_problem(&pool, 1).await;
        seed_problem(&pool, 2).await;
        let store = SqliteSubmissionStore::new(pool);

        store
            .create_with_job(new_submission(1, Some(7), Some(1)), None, 1_000)
            .await
            .unwrap();
        store
            .create_with_job(new_submission(2, Some(7), Some(2)), None, 2_000)
            .await
            .unwrap();
        store
            .create_with_job(new_submission(2, Some(8), None), None, 3_000)
            .await
            .unwrap();

        assert_eq!(store.list(SubmissionFilter::All).await.unwrap().len(), 3);
        assert_eq!(store.list(SubmissionFilter::Uid(7)).await.unwrap().len(), 2);
        assert_eq!(store.list(SubmissionFilter::Gid(2)).await.unwrap().len(), 1);
        assert_eq!(
            store.list(SubmissionFilter::Problem(2)).await.unwrap().len(),
            2
        );
        assert!(store.list(SubmissionFilter::Uid(99)).await.unwrap().is_empty());
    }
}
