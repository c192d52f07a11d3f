//! Persistence seam for jobs, candidates, sessions and evaluations.
//!
//! `PgStore` is the production backend; `MemoryStore` backs the tests. Session
//! counters are only ever changed through `increment_progress` and
//! `create_retry_unit`, both atomic in each backend.

use async_trait::async_trait;
use uuid::Uuid;

use crate::analysis::JobAnalysis;
use crate::errors::AppError;
use crate::models::candidate::{CandidateProfile, CandidateSkill};
use crate::models::job::{JobOpening, SkillRequirement};
use crate::models::screening::{EvaluationRecord, ScreeningSession};
use crate::scoring::aggregator::ScoringWeights;

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ScreeningStore: Send + Sync {
    // ── Jobs ────────────────────────────────────────────────────────────────

    async fn get_job(&self, job_id: Uuid) -> Result<JobOpening, AppError>;

    /// Stores extracted skills and marks the job analyzed. An extracted
    /// education level only fills an empty requirement.
    async fn save_job_analysis(&self, job_id: Uuid, analysis: &JobAnalysis) -> Result<(), AppError>;

    async fn update_job_weights(&self, job_id: Uuid, weights: ScoringWeights) -> Result<(), AppError>;

    async fn job_skill_requirements(&self, job_id: Uuid) -> Result<Vec<SkillRequirement>, AppError> {
        Ok(self.get_job(job_id).await?.skills)
    }

    // ── Candidates ──────────────────────────────────────────────────────────

    async fn get_candidate(&self, candidate_id: Uuid) -> Result<CandidateProfile, AppError>;

    async fn candidate_skills(&self, candidate_id: Uuid) -> Result<Vec<CandidateSkill>, AppError>;

    // ── Sessions ────────────────────────────────────────────────────────────

    /// Persists the session and one pending evaluation per candidate, in order.
    async fn create_session(
        &self,
        session: &ScreeningSession,
        candidate_ids: &[Uuid],
    ) -> Result<Vec<EvaluationRecord>, AppError>;

    async fn get_session(&self, session_id: Uuid) -> Result<ScreeningSession, AppError>;

    /// Writes status, timestamps and error message. Never touches counters.
    async fn save_session_state(&self, session: &ScreeningSession) -> Result<(), AppError>;

    /// Atomically bumps `processed_count` (and `failed_count` when `failed`).
    async fn increment_progress(&self, session_id: Uuid, failed: bool) -> Result<ScreeningSession, AppError>;

    /// Atomically adds token usage and its cost to the session totals.
    async fn add_session_usage(&self, session_id: Uuid, tokens: u64, cost_usd: f64) -> Result<(), AppError>;

    // ── Evaluations ─────────────────────────────────────────────────────────

    /// Creates a fresh pending evaluation for the same candidate and bumps the
    /// session's `total_count`.
    async fn create_retry_unit(&self, failed: &EvaluationRecord) -> Result<EvaluationRecord, AppError>;

    /// All evaluations of a session in creation order.
    async fn list_units(&self, session_id: Uuid) -> Result<Vec<EvaluationRecord>, AppError>;

    async fn get_unit(&self, unit_id: Uuid) -> Result<EvaluationRecord, AppError>;

    async fn save_unit(&self, unit: &EvaluationRecord) -> Result<(), AppError>;

    async fn assign_ranks(&self, session_id: Uuid, ranks: &[(Uuid, Option<u32>)]) -> Result<(), AppError>;
}
