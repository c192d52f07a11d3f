//! Explanation step: turns finished scores into strengths, weaknesses, a
//! recommendation and interview questions.
//!
//! Runs after scoring and never changes a score. The evaluator holds it as
//! `Arc<dyn ExplanationGenerator>` so tests can use a canned implementation.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::{truncate_for_prompt, FAIRNESS_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::screening::{Decision, Explanation, ScoreBreakdown};
use crate::scoring::skills::{MatchedSkill, MissingSkill};
use crate::screening::prompts::EXPLANATION_PROMPT;

const MAX_LISTED_SKILLS: usize = 10;
const MAX_LISTED_BONUS: usize = 8;
const MAX_REQUIREMENTS_CHARS: usize = 1000;

/// Everything the explanation step may look at.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub candidate_name: String,
    pub years_of_experience: f64,
    pub education_level: String,
    pub scores: ScoreBreakdown,
    pub must_have_met: bool,
    pub matched: Vec<MatchedSkill>,
    pub missing: Vec<MissingSkill>,
    pub bonus: Vec<String>,
    pub job_title: String,
    pub min_experience_years: f64,
    pub requirements: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageMetrics {
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl UsageMetrics {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedExplanation {
    pub explanation: Explanation,
    pub usage: UsageMetrics,
}

#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    async fn generate(&self, context: &EvaluationContext) -> Result<GeneratedExplanation, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LLM-backed implementation
// ────────────────────────────────────────────────────────────────────────────

/// Raw model output. Every field is optional; `decision` is free text until mapped.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExplanation {
    strengths: Vec<String>,
    weaknesses: Vec<String>,
    explanation: String,
    recommendation: String,
    decision: String,
    interview_questions: Vec<String>,
    red_flags: Vec<String>,
    growth_potential: String,
}

impl From<RawExplanation> for Explanation {
    fn from(raw: RawExplanation) -> Self {
        Explanation {
            strengths: raw.strengths,
            weaknesses: raw.weaknesses,
            explanation: raw.explanation,
            recommendation: raw.recommendation,
            decision: Decision::from_label(&raw.decision),
            interview_questions: raw.interview_questions,
            red_flags: raw.red_flags,
            growth_potential: raw.growth_potential,
        }
    }
}

pub struct LlmExplanationGenerator {
    llm: LlmClient,
}

impl LlmExplanationGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ExplanationGenerator for LlmExplanationGenerator {
    async fn generate(&self, context: &EvaluationContext) -> Result<GeneratedExplanation, AppError> {
        let prompt = build_prompt(context);
        let reply = self
            .llm
            .call_json_with_usage::<RawExplanation>(&prompt, JSON_ONLY_SYSTEM)
            .await?;

        let explanation = Explanation::from(reply.value);
        info!(
            decision = explanation.decision.as_str(),
            tokens = reply.usage.total(),
            "Explanation generated"
        );

        Ok(GeneratedExplanation {
            explanation,
            usage: UsageMetrics {
                model: reply.model,
                input_tokens: reply.usage.input_tokens,
                output_tokens: reply.usage.output_tokens,
            },
        })
    }
}

fn build_prompt(ctx: &EvaluationContext) -> String {
    let matched = join_or_none(ctx.matched.iter().map(|s| s.name.as_str()), MAX_LISTED_SKILLS);
    let missing = join_or_none(ctx.missing.iter().map(|s| s.name.as_str()), MAX_LISTED_SKILLS);
    let bonus = join_or_none(ctx.bonus.iter().map(String::as_str), MAX_LISTED_BONUS);
    let requirements = if ctx.requirements.trim().is_empty() {
        "Not provided".to_string()
    } else {
        truncate_for_prompt(&ctx.requirements, MAX_REQUIREMENTS_CHARS)
    };
    let education = if ctx.education_level.is_empty() {
        "unknown"
    } else {
        ctx.education_level.as_str()
    };

    EXPLANATION_PROMPT
        .replace("{candidate_name}", &ctx.candidate_name)
        .replace("{years}", &format!("{:.1}", ctx.years_of_experience))
        .replace("{education_score}", &format!("{:.1}", ctx.scores.education))
        .replace("{education}", education)
        .replace("{overall}", &format!("{:.1}", ctx.scores.overall))
        .replace("{skill}", &format!("{:.1}", ctx.scores.skill))
        .replace("{experience}", &format!("{:.1}", ctx.scores.experience))
        .replace("{similarity}", &format!("{:.3}", ctx.scores.semantic_similarity))
        .replace("{must_have_met}", if ctx.must_have_met { "yes" } else { "no" })
        .replace("{n_matched}", &ctx.matched.len().to_string())
        .replace("{matched}", &matched)
        .replace("{n_missing}", &ctx.missing.len().to_string())
        .replace("{missing}", &missing)
        .replace("{n_bonus}", &ctx.bonus.len().to_string())
        .replace("{bonus}", &bonus)
        .replace("{job_title}", &ctx.job_title)
        .replace("{min_years}", &format!("{:.1}", ctx.min_experience_years))
        .replace("{requirements}", &requirements)
        .replace("{fairness}", FAIRNESS_INSTRUCTION)
}

fn join_or_none<'a>(names: impl Iterator<Item = &'a str>, limit: usize) -> String {
    let joined = names.take(limit).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "None".to_string()
    } else {
        joined
    }
}
