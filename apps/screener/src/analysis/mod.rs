//! Job Analysis: extracts weighted skill requirements from a job posting.
//!
//! A session cannot score anyone until its job has been analyzed; the
//! coordinator runs the analyzer once, synchronously, before dispatching.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::{truncate_for_prompt, JSON_ONLY_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::job::{JobOpening, SkillImportance, SkillRequirement};
use crate::screening::prompts::JOB_ANALYSIS_PROMPT;

/// Skills beyond this are dropped; long postings tend to list noise at the tail.
pub const MAX_EXTRACTED_SKILLS: usize = 60;
const MAX_JOB_TEXT_CHARS: usize = 8000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobAnalysis {
    pub skills: Vec<SkillRequirement>,
    /// Canonical level label when the model found one; "any" is kept as-is.
    pub education_requirement: Option<String>,
    pub tokens_used: u32,
}

#[async_trait]
pub trait JobAnalyzer: Send + Sync {
    async fn analyze(&self, job: &JobOpening) -> Result<JobAnalysis, AppError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAnalysis {
    skills: Vec<RawSkill>,
    education_requirement: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSkill {
    name: String,
    category: Option<String>,
    importance: String,
    years_required: Option<f64>,
}

pub struct LlmJobAnalyzer {
    llm: LlmClient,
}

impl LlmJobAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl JobAnalyzer for LlmJobAnalyzer {
    async fn analyze(&self, job: &JobOpening) -> Result<JobAnalysis, AppError> {
        let prompt = JOB_ANALYSIS_PROMPT
            .replace("{title}", &job.title)
            .replace("{job_text}", &truncate_for_prompt(&job.full_text(), MAX_JOB_TEXT_CHARS));

        let reply = self
            .llm
            .call_json_with_usage::<RawAnalysis>(&prompt, JSON_ONLY_SYSTEM)
            .await?;

        let mut analysis = normalize(reply.value);
        analysis.tokens_used = reply.usage.total();
        info!(
            job_id = %job.id,
            skills = analysis.skills.len(),
            tokens = analysis.tokens_used,
            "Job analyzed"
        );
        Ok(analysis)
    }
}

/// Drops unnamed skills, parses importance leniently, caps the list.
fn normalize(raw: RawAnalysis) -> JobAnalysis {
    let skills = raw
        .skills
        .into_iter()
        .filter_map(|s| {
            let name = s.name.trim();
            if name.is_empty() {
                return None;
            }
            Some(SkillRequirement {
                years_required: s
                    .years_required
                    .filter(|y| y.is_finite() && *y > 0.0)
                    .unwrap_or(0.0),
                category: s.category.filter(|c| !c.trim().is_empty()),
                ..SkillRequirement::new(name, SkillImportance::from_label(&s.importance))
            })
        })
        .take(MAX_EXTRACTED_SKILLS)
        .collect();

    JobAnalysis {
        skills,
        education_requirement: raw
            .education_requirement
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty()),
        tokens_used: 0,
    }
}
