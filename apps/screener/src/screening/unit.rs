//! Evaluation unit: one candidate's run through the pipeline.
//!
//! pending ──► processing ──► completed
//!    │             │
//!    └─────────────┴───────► failed
//!
//! A candidate whose resume is not parsed fails straight from pending. Any
//! error after that is captured on the record; the unit never touches session
//! counters, which belong to the coordinator.

use uuid::Uuid;

use tracing::{error, info};

use crate::errors::AppError;
use crate::models::candidate::{CandidateProfile, CandidateSkill};
use crate::models::job::{JobOpening, SkillRequirement};
use crate::models::screening::{EvaluationRecord, EvaluationStatus};
use crate::screening::evaluator::{EvaluationOutcome, Evaluator};
use crate::store::ScreeningStore;

/// Terminal state of a unit run plus the tokens it spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitResult {
    pub status: EvaluationStatus,
    pub tokens_used: u32,
}

impl UnitResult {
    pub fn failed(&self) -> bool {
        self.status == EvaluationStatus::Failed
    }
}

/// Runs a pending unit to a terminal state.
///
/// `Err` means the unit could not be run at all (not pending, or the store
/// failed); scoring errors are recorded on the unit and reported as `Ok`.
pub async fn run_unit(
    store: &dyn ScreeningStore,
    evaluator: &Evaluator,
    job: &JobOpening,
    job_skills: &[SkillRequirement],
    unit_id: Uuid,
) -> Result<UnitResult, AppError> {
    let mut unit = store.get_unit(unit_id).await?;
    if unit.status != EvaluationStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Evaluation {unit_id} is {} and cannot be run",
            unit.status
        )));
    }

    let (candidate, candidate_skills) = match load_candidate(store, unit.candidate_id).await {
        Ok(loaded) => loaded,
        Err(err) => return fail(store, &mut unit, err).await,
    };

    unit.transition_to(EvaluationStatus::Processing)?;
    store.save_unit(&unit).await?;

    match evaluator
        .evaluate(job, job_skills, &candidate, &candidate_skills)
        .await
    {
        Ok(outcome) => {
            let tokens_used = outcome.tokens_used;
            apply_outcome(&mut unit, outcome);
            unit.transition_to(EvaluationStatus::Completed)?;
            store.save_unit(&unit).await?;
            info!(
                unit_id = %unit.id,
                candidate_id = %unit.candidate_id,
                score = ?unit.overall_score(),
                "Evaluation completed"
            );
            Ok(UnitResult {
                status: EvaluationStatus::Completed,
                tokens_used,
            })
        }
        Err(err) => fail(store, &mut unit, err).await,
    }
}

pub(crate) async fn load_candidate(
    store: &dyn ScreeningStore,
    candidate_id: Uuid,
) -> Result<(CandidateProfile, Vec<CandidateSkill>), AppError> {
    let candidate = store.get_candidate(candidate_id).await?;
    if !candidate.status.is_parsed() {
        return Err(AppError::Precondition(format!(
            "Candidate {candidate_id} resume has not been parsed"
        )));
    }
    let skills = store.candidate_skills(candidate_id).await?;
    Ok((candidate, skills))
}

async fn fail(
    store: &dyn ScreeningStore,
    unit: &mut EvaluationRecord,
    err: AppError,
) -> Result<UnitResult, AppError> {
    error!(unit_id = %unit.id, candidate_id = %unit.candidate_id, error = %err, "Evaluation failed");
    unit.error_message = Some(err.to_string());
    unit.rank = None;
    unit.transition_to(EvaluationStatus::Failed)?;
    store.save_unit(unit).await?;
    Ok(UnitResult {
        status: EvaluationStatus::Failed,
        tokens_used: 0,
    })
}

fn apply_outcome(unit: &mut EvaluationRecord, outcome: EvaluationOutcome) {
    unit.scores = Some(outcome.scores);
    unit.matched_skills = outcome.matched_skills;
    unit.missing_skills = outcome.missing_skills;
    unit.bonus_skills = outcome.bonus_skills;
    unit.must_have_met = outcome.must_have_met;
    unit.years_of_experience = outcome.years_of_experience;
    unit.experience_gap_years = outcome.experience_gap_years;
    unit.relevant_experience_pct = outcome.relevant_experience_pct;
    unit.education_match = outcome.education_match;
    unit.education_level = outcome.education_level;
    unit.explanation = Some(outcome.explanation);
    unit.model_used = Some(outcome.model_used);
    unit.tokens_used = outcome.tokens_used;
    unit.processing_time_ms = outcome.processing_time_ms;
    unit.error_message = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::CandidateStatus;
    use crate::models::screening::ScreeningSession;
    use crate::scoring::SkillMatcher;
    use crate::screening::evaluator::tests::{candidate, job, CannedExplainer, FixedSimilarity};
    use crate::screening::external::CallPolicy;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn evaluator() -> Evaluator {
        Evaluator::new(
            SkillMatcher::default(),
            Arc::new(FixedSimilarity(0.5)),
            Arc::new(CannedExplainer { tokens: 50 }),
            CallPolicy::new(Duration::from_secs(5), 1),
        )
    }

    async fn setup(status: CandidateStatus) -> (MemoryStore, JobOpening, EvaluationRecord) {
        let store = MemoryStore::new();
        let job = job();
        let mut cand = candidate("Ada");
        cand.status = status;
        let cand_id = cand.id;
        store.insert_job(job.clone()).await;
        store
            .insert_candidate(cand, vec![CandidateSkill::named("rust")])
            .await;
        let session = ScreeningSession::new(job.id, 1, 70.0, 10);
        let units = store.create_session(&session, &[cand_id]).await.unwrap();
        (store, job, units[0].clone())
    }

    #[tokio::test]
    async fn test_unit_completes_and_persists_scores() {
        let (store, job, unit) = setup(CandidateStatus::Parsed).await;
        let result = run_unit(&store, &evaluator(), &job, &job.skills, unit.id).await.unwrap();
        assert_eq!(result.status, EvaluationStatus::Completed);
        assert_eq!(result.tokens_used, 50);

        let saved = store.get_unit(unit.id).await.unwrap();
        assert_eq!(saved.status, EvaluationStatus::Completed);
        assert!(saved.scores.is_some());
        assert!(saved.error_message.is_none());
        // postgres is missing
        assert_eq!(saved.missing_skills.len(), 1);
        assert!(saved.missing_skills[0].is_critical);
        assert_eq!(saved.model_used.as_deref(), Some("stub-model"));
    }

    #[tokio::test]
    async fn test_unparsed_candidate_fails_fast() {
        let (store, job, unit) = setup(CandidateStatus::Parsing).await;
        let result = run_unit(&store, &evaluator(), &job, &job.skills, unit.id).await.unwrap();
        assert!(result.failed());

        let saved = store.get_unit(unit.id).await.unwrap();
        assert_eq!(saved.status, EvaluationStatus::Failed);
        assert!(saved.error_message.unwrap().contains("not been parsed"));
        assert!(saved.scores.is_none());
        assert!(saved.rank.is_none());
    }

    #[tokio::test]
    async fn test_terminal_unit_is_not_rerun() {
        let (store, job, unit) = setup(CandidateStatus::Parsed).await;
        run_unit(&store, &evaluator(), &job, &job.skills, unit.id).await.unwrap();
        let err = run_unit(&store, &evaluator(), &job, &job.skills, unit.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
