// Problem Store Port (Interface)

use crate::domain::{NewProblem, Problem, ProblemPatch};
use crate::error::Result;
use async_trait::async_trait;

/// Store interface for problems. The store owns `last_modified`: it is set
/// on insert and refreshed on every update.
#[async_trait]
pub trait ProblemStore: Send + Sync {
    /// Insert with an externally assigned id; `Conflict` if the id exists.
    async fn insert(&self, new: NewProblem, now: i64) -> Result<Problem>;

    async fn find(&self, id: i64) -> Result<Option<Problem>>;

    async fn list_all(&self) -> Result<Vec<Problem>>;

    /// Apply a partial update; `NotFound` if the id does not exist.
    async fn update(&self, id: i64, patch: ProblemPatch, now: i64) -> Result<Problem>;
}
