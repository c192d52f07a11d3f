//! Evaluator: scores one candidate against one job.
//!
//! Order is fixed: skills, experience, education, similarity lookup, aggregate,
//! explanation. The first external failure short-circuits the evaluation.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::errors::AppError;
use crate::models::candidate::{CandidateProfile, CandidateSkill};
use crate::models::job::{JobOpening, SkillRequirement};
use crate::models::screening::{Explanation, ScoreBreakdown};
use crate::scoring::{
    EducationScorer, ExperienceScorer, MatchedSkill, MissingSkill, ScoreAggregator, SkillMatcher,
};
use crate::screening::explanation::{EvaluationContext, ExplanationGenerator};
use crate::screening::external::CallPolicy;
use crate::screening::similarity::{clamp_similarity, SimilarityProvider};

/// Everything an evaluation produces, rounded the way it is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub scores: ScoreBreakdown,
    pub matched_skills: Vec<MatchedSkill>,
    pub missing_skills: Vec<MissingSkill>,
    pub bonus_skills: Vec<String>,
    pub must_have_met: bool,
    pub years_of_experience: f64,
    pub experience_gap_years: f64,
    pub relevant_experience_pct: f64,
    pub education_match: bool,
    pub education_level: String,
    pub explanation: Explanation,
    pub model_used: String,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
}

pub struct Evaluator {
    skills: SkillMatcher,
    experience: ExperienceScorer,
    education: EducationScorer,
    aggregator: ScoreAggregator,
    similarity: Arc<dyn SimilarityProvider>,
    explainer: Arc<dyn ExplanationGenerator>,
    policy: CallPolicy,
}

impl Evaluator {
    pub fn new(
        skills: SkillMatcher,
        similarity: Arc<dyn SimilarityProvider>,
        explainer: Arc<dyn ExplanationGenerator>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            skills,
            experience: ExperienceScorer::new(),
            education: EducationScorer::new(),
            aggregator: ScoreAggregator::new(),
            similarity,
            explainer,
            policy,
        }
    }

    /// Callers check preconditions (parsed candidate, analyzed job) first.
    pub async fn evaluate(
        &self,
        job: &JobOpening,
        job_skills: &[SkillRequirement],
        candidate: &CandidateProfile,
        candidate_skills: &[CandidateSkill],
    ) -> Result<EvaluationOutcome, AppError> {
        let started = Instant::now();
        let job_text = job.full_text();

        let skill = self.skills.match_skills(candidate_skills, job_skills);
        let experience = self.experience.score(
            candidate.total_experience_years,
            &candidate.work_history,
            job.min_experience_years,
            job.max_experience_years,
            &job_text,
        );
        let education = self
            .education
            .score(&candidate.highest_education, &job.education_requirement);

        // The similarity client has no retry loop of its own.
        let similarity = self
            .policy
            .retrying("similarity lookup", || {
                self.similarity.similarity(candidate.id, &job_text)
            })
            .await
            .map(clamp_similarity)?;

        let aggregate = self.aggregator.aggregate(
            skill.score,
            experience.score,
            education.score,
            similarity,
            &job.weights,
        );

        let scores = ScoreBreakdown {
            overall: round2(aggregate.overall.clamp(0.0, 100.0)),
            skill: round2(skill.score),
            experience: round2(experience.score),
            education: round2(education.score),
            fit: round2(aggregate.fit),
            semantic_similarity: round4(similarity),
        };
        debug!(candidate_id = %candidate.id, overall = scores.overall, "Scored");

        let context = EvaluationContext {
            candidate_name: candidate.name.clone(),
            years_of_experience: candidate.total_experience_years.max(0.0),
            education_level: candidate.highest_education.clone(),
            scores,
            must_have_met: skill.must_have_satisfied,
            matched: skill.matched.clone(),
            missing: skill.missing.clone(),
            bonus: skill.bonus.clone(),
            job_title: job.title.clone(),
            min_experience_years: job.min_experience_years,
            requirements: job.requirements.clone(),
        };

        // The LLM client retries rate limits itself; only bound the wait here.
        let generated = self
            .policy
            .timed("explanation", self.explainer.generate(&context))
            .await?;

        Ok(EvaluationOutcome {
            scores,
            matched_skills: skill.matched,
            missing_skills: skill.missing,
            bonus_skills: skill.bonus,
            must_have_met: skill.must_have_satisfied,
            years_of_experience: round2(candidate.total_experience_years.max(0.0)),
            experience_gap_years: experience.gap_years,
            relevant_experience_pct: round2(experience.relevance_pct),
            education_match: education.is_match,
            education_level: candidate.highest_education.clone(),
            tokens_used: generated.usage.total_tokens(),
            model_used: generated.usage.model,
            explanation: generated.explanation,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
