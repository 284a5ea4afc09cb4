// SQLite ProblemStore

use async_trait::async_trait;
use sqlx::SqlitePool;

use judge_core::domain::{Language, NewProblem, Problem, ProblemPatch};
use judge_core::error::{AppError, Result};
use judge_core::port::ProblemStore;

use crate::map_sqlx_error;

pub struct SqliteProblemStore {
    pool: SqlitePool,
}

impl SqliteProblemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProblemStore for SqliteProblemStore {
    async fn insert(&self, new: NewProblem, now: i64) -> Result<Problem> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM problems WHERE id = ?")
            .bind(new.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if exists.is_some() {
            return Err(AppError::Conflict(format!(
                "Problem {} already exists",
                new.id
            )));
        }

        let row: ProblemRow = sqlx::query_as(
            r#"
            INSERT INTO problems
                (id, last_modified, test_cases, time_limit, memory_limit,
                 generator_code, generator_language, grader_code, grader_language,
                 source_verifier_code, source_verifier_language)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(now)
        .bind(new.test_cases)
        .bind(new.time_limit)
        .bind(new.memory_limit)
        .bind(&new.generator_code)
        .bind(new.generator_language.as_code())
        .bind(&new.grader_code)
        .bind(new.grader_language.as_code())
        .bind(&new.source_verifier_code)
        .bind(new.source_verifier_language.map(|l| l.as_code()))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        row.try_into_problem()
    }

    async fn find(&self, id: i64) -> Result<Option<Problem>> {
        let row: Option<ProblemRow> = sqlx::query_as("SELECT * FROM problems WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(ProblemRow::try_into_problem).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Problem>> {
        let rows: Vec<ProblemRow> = sqlx::query_as("SELECT * FROM problems ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(ProblemRow::try_into_problem).collect()
    }

    async fn update(&self, id: i64, patch: ProblemPatch, now: i64) -> Result<Problem> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row: Option<ProblemRow> = sqlx::query_as("SELECT * FROM problems WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        let mut problem = row
            .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))?
            .try_into_problem()?;

        apply_patch(&mut problem, patch);
        problem.last_modified = now;

        sqlx::query(
            r#"
            UPDATE problems
            SET last_modified = ?, test_cases = ?, time_limit = ?, memory_limit = ?,
                generator_code = ?, generator_language = ?,
                grader_code = ?, grader_language = ?,
                source_verifier_code = ?, source_verifier_language = ?
            WHERE id = ?
            "#,
        )
        .bind(problem.last_modified)
        .bind(problem.test_cases)
        .bind(problem.time_limit)
        .bind(problem.memory_limit)
        .bind(&problem.generator_code)
        .bind(problem.generator_language.as_code())
        .bind(&problem.grader_code)
        .bind(problem.grader_language.as_code())
        .bind(&problem.source_verifier_code)
        .bind(problem.source_verifier_language.map(|l| l.as_code()))
        .bind(problem.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(problem)
    }
}

fn apply_patch(problem: &mut Problem, patch: ProblemPatch) {
    if let Some(test_cases) = patch.test_cases {
        problem.test_cases = test_cases;
    }
    if let Some(time_limit) = patch.time_limit {
        problem.time_limit = time_limit;
    }
    if let Some(memory_limit) = patch.memory_limit {
        problem.memory_limit = memory_limit;
    }
    if let Some(generator_code) = patch.generator_code {
        problem.generator_code = generator_code;
    }
    if let Some(generator_language) = patch.generator_language {
        problem.generator_language = generator_language;
    }
    if let Some(grader_code) = patch.grader_code {
        problem.grader_code = grader_code;
    }
    if let Some(grader_language) = patch.grader_language {
        problem.grader_language = grader_language;
    }
    if let Some(source_verifier_code) = patch.source_verifier_code {
        problem.source_verifier_code = Some(source_verifier_code);
    }
    if let Some(source_verifier_language) = patch.source_verifier_language {
        problem.source_verifier_language = Some(source_verifier_language);
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProblemRow {
    id: i64,
    last_modified: i64,
    test_cases: i64,
    time_limit: f64,
    memory_limit: i64,
    generator_code: String,
    generator_language: String,
    grader_code: String,
    grader_language: String,
    source_verifier_code: Option<String>,
    source_verifier_language: Option<String>,
}

impl ProblemRow {
    fn try_into_problem(self) -> Result<Problem> {
        let parse = |code: &str| {
            Language::parse(code)
                .map_err(|_| AppError::Database(format!("Unknown language: {}", code)))
        };
        Ok(Problem {
            id: self.id,
            last_modified: self.last_modified,
            test_cases: self.test_cases,
            time_limit: self.time_limit,
            memory_limit: self.memory_limit,
            generator_code: self.generator_code,
            generator_language: parse(&self.generator_language)?,
            grader_code: self.grader_code,
            grader_language: parse(&self.grader_language)?,
            source_verifier_code: self.source_verifier_code,
            source_verifier_language: self
                .source_verifier_language
                .as_deref()
                .map(parse)
                .transpose()?,
        })
    }
}
