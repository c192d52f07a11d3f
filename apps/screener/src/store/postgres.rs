use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::analysis::JobAnalysis;
use crate::errors::AppError;
use crate::models::candidate::{CandidateProfile, CandidateRow, CandidateSkill};
use crate::models::job::{JobOpening, JobRow, SkillRequirement};
use crate::models::screening::{EvaluationRecord, EvaluationRow, ScreeningSession, SessionRow};
use crate::scoring::aggregator::ScoringWeights;
use crate::store::ScreeningStore;

const SESSION_COLUMNS: &str = "id, job_id, status, total_count, processed_count, failed_count, \
    pass_threshold, top_n_candidates, total_tokens_used, total_cost_usd, error_message, \
    created_at, started_at, completed_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_pending_unit(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        session_id: Uuid,
        job_id: Uuid,
        candidate_id: Uuid,
        retry_of: Option<Uuid>,
    ) -> Result<EvaluationRecord, AppError> {
        let row: EvaluationRow = sqlx::query_as(
            r#"
            INSERT INTO evaluations (id, session_id, job_id, candidate_id, status, retry_of)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(job_id)
        .bind(candidate_id)
        .bind(retry_of)
        .fetch_one(&mut **tx)
        .await?;
        row.try_into()
    }
}

#[async_trait]
impl ScreeningStore for PgStore {
    async fn get_job(&self, job_id: Uuid) -> Result<JobOpening, AppError> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(JobOpening::from)
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
    }

    async fn save_job_analysis(&self, job_id: Uuid, analysis: &JobAnalysis) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET extracted_skills = $2,
                analyzed = TRUE,
                education_requirement = CASE
                    WHEN btrim(education_requirement) = '' AND $3::text IS NOT NULL THEN $3
                    ELSE education_requirement
                END
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(Json(&analysis.skills))
        .bind(analysis.education_requirement.as_deref())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {job_id} not found")));
        }
        Ok(())
    }

    async fn update_job_weights(&self, job_id: Uuid, weights: ScoringWeights) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET weight_skills = $2, weight_experience = $3, weight_education = $4, weight_fit = $5
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(weights.skills)
        .bind(weights.experience)
        .bind(weights.education)
        .bind(weights.fit)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {job_id} not found")));
        }
        Ok(())
    }

    async fn job_skill_requirements(&self, job_id: Uuid) -> Result<Vec<SkillRequirement>, AppError> {
        let skills: Option<Json<Vec<SkillRequirement>>> =
            sqlx::query_scalar("SELECT extracted_skills FROM jobs WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;
        skills
            .map(|s| s.0)
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
    }

    async fn get_candidate(&self, candidate_id: Uuid) -> Result<CandidateProfile, AppError> {
        let row: Option<CandidateRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, status, total_experience_years, highest_education,
                   work_history, created_at
            FROM candidates WHERE id = $1
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CandidateProfile::from)
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
    }

    async fn candidate_skills(&self, candidate_id: Uuid) -> Result<Vec<CandidateSkill>, AppError> {
        let skills: Option<Json<Vec<CandidateSkill>>> =
            sqlx::query_scalar("SELECT extracted_skills FROM candidates WHERE id = $1")
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await?;
        skills
            .map(|s| s.0)
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
    }

    async fn create_session(
        &self,
        session: &ScreeningSession,
        candidate_ids: &[Uuid],
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Missing references are reported as 404 rather than surfacing as a
        // foreign-key violation.
        let job_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1)")
            .bind(session.job_id)
            .fetch_one(&mut *tx)
            .await?;
        if !job_exists {
            return Err(AppError::NotFound(format!("Job {} not found", session.job_id)));
        }

        let found: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM candidates WHERE id = ANY($1)")
            .bind(candidate_ids)
            .fetch_all(&mut *tx)
            .await?;
        if let Some(missing) = first_missing(candidate_ids, &found) {
            return Err(AppError::NotFound(format!("Candidate {missing} not found")));
        }

        sqlx::query(
            r#"
            INSERT INTO screening_sessions
                (id, job_id, status, total_count, pass_threshold, top_n_candidates, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id)
        .bind(session.job_id)
        .bind(session.status.as_str())
        .bind(session.total_count as i32)
        .bind(session.pass_threshold)
        .bind(session.top_n_candidates as i32)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await?;

        // One insert per candidate keeps seq in request order.
        let mut units = Vec::with_capacity(candidate_ids.len());
        for candidate_id in candidate_ids {
            units.push(
                Self::insert_pending_unit(&mut tx, session.id, session.job_id, *candidate_id, None).await?,
            );
        }

        tx.commit().await?;
        Ok(units)
    }

    async fn get_session(&self, session_id: Uuid) -> Result<ScreeningSession, AppError> {
        let row: Option<SessionRow> =
            sqlx::query_as(&format!("SELECT {SESSION_COLUMNS} FROM screening_sessions WHERE id = $1"))
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?
            .try_into()
    }

    async fn save_session_state(&self, session: &ScreeningSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE screening_sessions
            SET status = $2, error_message = $3, started_at = $4, completed_at = $5
            WHERE id = $1
            "#,
        )
        .bind(session.id)
        .bind(session.status.as_str())
        .bind(session.error_message.as_deref())
        .bind(session.started_at)
        .bind(session.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_progress(&self, session_id: Uuid, failed: bool) -> Result<ScreeningSession, AppError> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE screening_sessions
            SET processed_count = processed_count + 1,
                failed_count = failed_count + CASE WHEN $2 THEN 1 ELSE 0 END
            WHERE id = $1
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(failed)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?
            .try_into()
    }

    async fn add_session_usage(&self, session_id: Uuid, tokens: u64, cost_usd: f64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE screening_sessions
            SET total_tokens_used = total_tokens_used + $2,
                total_cost_usd = total_cost_usd + $3
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .bind(i64::try_from(tokens).unwrap_or(i64::MAX))
        .bind(cost_usd)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_retry_unit(&self, failed: &EvaluationRecord) -> Result<EvaluationRecord, AppError> {
        let mut tx = self.pool.begin().await?;
        let bumped = sqlx::query("UPDATE screening_sessions SET total_count = total_count + 1 WHERE id = $1")
            .bind(failed.session_id)
            .execute(&mut *tx)
            .await?;
        if bumped.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Session {} not found", failed.session_id)));
        }
        let unit = Self::insert_pending_unit(
            &mut tx,
            failed.session_id,
            failed.job_id,
            failed.candidate_id,
            Some(failed.id),
        )
        .await?;
        tx.commit().await?;
        Ok(unit)
    }

    async fn list_units(&self, session_id: Uuid) -> Result<Vec<EvaluationRecord>, AppError> {
        let rows: Vec<EvaluationRow> =
            sqlx::query_as("SELECT * FROM evaluations WHERE session_id = $1 ORDER BY seq ASC")
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(EvaluationRecord::try_from).collect()
    }

    async fn get_unit(&self, unit_id: Uuid) -> Result<EvaluationRecord, AppError> {
        let row: Option<EvaluationRow> = sqlx::query_as("SELECT * FROM evaluations WHERE id = $1")
            .bind(unit_id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| AppError::NotFound(format!("Evaluation {unit_id} not found")))?
            .try_into()
    }

    async fn save_unit(&self, unit: &EvaluationRecord) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE evaluations
            SET status = $2,
                scores = $3,
                matched_skills = $4,
                missing_skills = $5,
                bonus_skills = $6,
                must_have_met = $7,
                years_of_experience = $8,
                experience_gap_years = $9,
                relevant_experience_pct = $10,
                education_match = $11,
                education_level = $12,
                explanation = $13,
                model_used = $14,
                tokens_used = $15,
                processing_time_ms = $16,
                error_message = $17,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(unit.id)
        .bind(unit.status.as_str())
        .bind(unit.scores.map(Json))
        .bind(Json(&unit.matched_skills))
        .bind(Json(&unit.missing_skills))
        .bind(Json(&unit.bonus_skills))
        .bind(unit.must_have_met)
        .bind(unit.years_of_experience)
        .bind(unit.experience_gap_years)
        .bind(unit.relevant_experience_pct)
        .bind(unit.education_match)
        .bind(&unit.education_level)
        .bind(unit.explanation.as_ref().map(Json))
        .bind(unit.model_used.as_deref())
        .bind(i32::try_from(unit.tokens_used).unwrap_or(i32::MAX))
        .bind(i64::try_from(unit.processing_time_ms).unwrap_or(i64::MAX))
        .bind(unit.error_message.as_deref())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Evaluation {} not found", unit.id)));
        }
        Ok(())
    }

    async fn assign_ranks(&self, session_id: Uuid, ranks: &[(Uuid, Option<u32>)]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (unit_id, rank) in ranks {
            sqlx::query("UPDATE evaluations SET rank = $3 WHERE id = $1 AND session_id = $2")
                .bind(unit_id)
                .bind(session_id)
                .bind(rank.map(|r| r as i32))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// First requested id, in request order, that the lookup did not return.
fn first_missing(requested: &[Uuid], found: &[Uuid]) -> Option<Uuid> {
    let found: HashSet<&Uuid> = found.iter().collect();
    requested.iter().find(|id| !found.contains(id)).copied()
}
