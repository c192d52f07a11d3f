use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::scoring::skills::{MatchedSkill, MissingSkill};

// ────────────────────────────────────────────────────────────────────────────
// Status enums
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle of one candidate–job evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl EvaluationStatus {
    /// pending → processing → completed | failed. Nothing leaves a terminal state.
    /// A unit may also fail straight from pending when its precondition is unmet.
    pub fn can_transition_to(self, next: EvaluationStatus) -> bool {
        use EvaluationStatus as S;
        matches!(
            (self, next),
            (S::Pending, S::Processing)
                | (S::Pending, S::Failed)
                | (S::Processing, S::Completed)
                | (S::Processing, S::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationStatus::Pending => "pending",
            EvaluationStatus::Processing => "processing",
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EvaluationStatus::Pending),
            "processing" => Some(EvaluationStatus::Processing),
            "completed" => Some(EvaluationStatus::Completed),
            "failed" => Some(EvaluationStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Processing,
    Completed,
    /// The session could not be loaded or initialized.
    Failed,
    /// Dispatch stopped early; units that never ran stay pending.
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }

    /// Monotonic: pending → processing → terminal. Pending may fail or be
    /// cancelled before it ever starts.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus as S;
        matches!(
            (self, next),
            (S::Pending, S::Processing)
                | (S::Pending, S::Failed)
                | (S::Pending, S::Cancelled)
                | (S::Processing, S::Completed)
                | (S::Processing, S::Failed)
                | (S::Processing, S::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SessionStatus::Pending),
            "processing" => Some(SessionStatus::Processing),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of recommendation labels produced by the explanation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Shortlisted,
    #[default]
    Maybe,
    Rejected,
}

impl Decision {
    /// Maps a free-form label from the LLM. Anything unrecognized is "maybe".
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "shortlisted" | "shortlist" => Decision::Shortlisted,
            "rejected" | "reject" => Decision::Rejected,
            _ => Decision::Maybe,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Shortlisted => "shortlisted",
            Decision::Maybe => "maybe",
            Decision::Rejected => "rejected",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluation record
// ────────────────────────────────────────────────────────────────────────────

/// Component scores as persisted: 0–100, two decimals; similarity 0–1, four decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub overall: f64,
    pub skill: f64,
    pub experience: f64,
    pub education: f64,
    pub fit: f64,
    pub semantic_similarity: f64,
}

/// Structured fields returned by the explanation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub explanation: String,
    pub recommendation: String,
    pub decision: Decision,
    pub interview_questions: Vec<String>,
    pub red_flags: Vec<String>,
    pub growth_potential: String,
}

/// One candidate–job evaluation inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub status: EvaluationStatus,
    pub scores: Option<ScoreBreakdown>,
    pub matched_skills: Vec<MatchedSkill>,
    pub missing_skills: Vec<MissingSkill>,
    pub bonus_skills: Vec<String>,
    pub must_have_met: bool,
    pub years_of_experience: f64,
    pub experience_gap_years: f64,
    pub relevant_experience_pct: f64,
    pub education_match: bool,
    pub education_level: String,
    pub explanation: Option<Explanation>,
    pub model_used: Option<String>,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
    pub rank: Option<u32>,
    pub error_message: Option<String>,
    /// Set when this unit was created by retrying a failed one.
    pub retry_of: Option<Uuid>,
    /// Creation order within the store; breaks ranking ties.
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationRecord {
    pub fn pending(session_id: Uuid, job_id: Uuid, candidate_id: Uuid, seq: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id,
            job_id,
            candidate_id,
            status: EvaluationStatus::Pending,
            scores: None,
            matched_skills: vec![],
            missing_skills: vec![],
            bonus_skills: vec![],
            must_have_met: false,
            years_of_experience: 0.0,
            experience_gap_years: 0.0,
            relevant_experience_pct: 0.0,
            education_match: false,
            education_level: String::new(),
            explanation: None,
            model_used: None,
            tokens_used: 0,
            processing_time_ms: 0,
            rank: None,
            error_message: None,
            retry_of: None,
            seq,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn overall_score(&self) -> Option<f64> {
        self.scores.map(|s| s.overall)
    }

    pub fn decision(&self) -> Option<Decision> {
        self.explanation.as_ref().map(|e| e.decision)
    }

    /// Completed with a score at or above the session threshold.
    pub fn passed(&self, threshold: f64) -> bool {
        self.status == EvaluationStatus::Completed
            && self.overall_score().is_some_and(|s| s >= threshold)
    }

    /// Moves the record to `next`, rejecting transitions the state machine forbids.
    pub fn transition_to(&mut self, next: EvaluationStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Evaluation {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

/// One job screened against N candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningSession {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: SessionStatus,
    pub total_count: u32,
    pub processed_count: u32,
    pub failed_count: u32,
    pub pass_threshold: f64,
    pub top_n_candidates: u32,
    pub total_tokens_used: u64,
    pub total_cost_usd: f64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_PASS_THRESHOLD: f64 = 70.0;
pub const DEFAULT_TOP_N: u32 = 10;

impl ScreeningSession {
    pub fn new(job_id: Uuid, total_count: u32, pass_threshold: f64, top_n_candidates: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            status: SessionStatus::Pending,
            total_count,
            processed_count: 0,
            failed_count: 0,
            pass_threshold,
            top_n_candidates,
            total_tokens_used: 0,
            total_cost_usd: 0.0,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn transition_to(&mut self, next: SessionStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Session {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        match next {
            SessionStatus::Processing => self.started_at = Some(Utc::now()),
            s if s.is_terminal() => self.completed_at = Some(Utc::now()),
            _ => {}
        }
        self.status = next;
        Ok(())
    }

    pub fn progress_pct(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        (self.processed_count as f64 / self.total_count as f64 * 1000.0).round() / 10.0
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => {
                Some(((end - start).num_milliseconds() as f64 / 100.0).round() / 10.0)
            }
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Database rows
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: String,
    pub total_count: i32,
    pub processed_count: i32,
    pub failed_count: i32,
    pub pass_threshold: f64,
    pub top_n_candidates: i32,
    pub total_tokens_used: i64,
    pub total_cost_usd: f64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for ScreeningSession {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = SessionStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Session {} has unknown status '{}'",
                row.id,
                row.status
            ))
        })?;
        Ok(ScreeningSession {
            id: row.id,
            job_id: row.job_id,
            status,
            total_count: row.total_count.max(0) as u32,
            processed_count: row.processed_count.max(0) as u32,
            failed_count: row.failed_count.max(0) as u32,
            pass_threshold: row.pass_threshold,
            top_n_candidates: row.top_n_candidates.max(0) as u32,
            total_tokens_used: row.total_tokens_used.max(0) as u64,
            total_cost_usd: row.total_cost_usd,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EvaluationRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub status: String,
    pub scores: Option<Json<ScoreBreakdown>>,
    pub matched_skills: Json<Vec<MatchedSkill>>,
    pub missing_skills: Json<Vec<MissingSkill>>,
    pub bonus_skills: Json<Vec<String>>,
    pub must_have_met: bool,
    pub years_of_experience: f64,
    pub experience_gap_years: f64,
    pub relevant_experience_pct: f64,
    pub education_match: bool,
    pub education_level: String,
    pub explanation: Option<Json<Explanation>>,
    pub model_used: Option<String>,
    pub tokens_used: i32,
    pub processing_time_ms: i64,
    pub rank: Option<i32>,
    pub error_message: Option<String>,
    pub retry_of: Option<Uuid>,
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EvaluationRow> for EvaluationRecord {
    type Error = AppError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let status = EvaluationStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Evaluation {} has unknown status '{}'",
                row.id,
                row.status
            ))
        })?;
        Ok(EvaluationRecord {
            id: row.id,
            session_id: row.session_id,
            job_id: row.job_id,
            candidate_id: row.candidate_id,
            status,
            scores: row.scores.map(|j| j.0),
            matched_skills: row.matched_skills.0,
            missing_skills: row.missing_skills.0,
            bonus_skills: row.bonus_skills.0,
            must_have_met: row.must_have_met,
            years_of_experience: row.years_of_experience,
            experience_gap_years: row.experience_gap_years,
            relevant_experience_pct: row.relevant_experience_pct,
            education_match: row.education_match,
            education_level: row.education_level,
            explanation: row.explanation.map(|j| j.0),
            model_used: row.model_used,
            tokens_used: row.tokens_used.max(0) as u32,
            processing_time_ms: row.processing_time_ms.max(0) as u64,
            rank: row.rank.map(|r| r.max(0) as u32),
            error_message: row.error_message,
            retry_of: row.retry_of,
            seq: row.seq,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
