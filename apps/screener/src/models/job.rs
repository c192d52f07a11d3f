use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::scoring::aggregator::ScoringWeights;

/// How strongly a job demands a skill. Drives the matcher's weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillImportance {
    MustHave,
    #[default]
    Required,
    Preferred,
    NiceToHave,
}

impl SkillImportance {
    pub fn weight(self) -> f64 {
        match self {
            SkillImportance::MustHave => 3.0,
            SkillImportance::Required => 2.0,
            SkillImportance::Preferred => 1.0,
            SkillImportance::NiceToHave => 0.5,
        }
    }

    /// Lenient parse for analyzer output. Unknown labels fall back to `Required`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "must_have" => SkillImportance::MustHave,
            "preferred" => SkillImportance::Preferred,
            "nice_to_have" => SkillImportance::NiceToHave,
            _ => SkillImportance::Required,
        }
    }

    /// Missing skills at these levels are flagged as critical gaps.
    pub fn is_critical(self) -> bool {
        matches!(self, SkillImportance::MustHave | SkillImportance::Required)
    }
}

/// A skill the job asks for. Immutable for the duration of a scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub name: String,
    #[serde(default)]
    pub importance: SkillImportance,
    #[serde(default)]
    pub years_required: f64,
    #[serde(default)]
    pub category: Option<String>,
}

impl SkillRequirement {
    pub fn new(name: impl Into<String>, importance: SkillImportance) -> Self {
        Self {
            name: name.into(),
            importance,
            years_required: 0.0,
            category: None,
        }
    }
}

/// A job opening as the scoring pipeline sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOpening {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub responsibilities: String,
    pub requirements: String,
    pub nice_to_have: String,
    pub min_experience_years: f64,
    pub max_experience_years: Option<f64>,
    /// Free text, e.g. "Bachelor's degree in CS or equivalent", "any".
    pub education_requirement: String,
    pub weights: ScoringWeights,
    pub skills: Vec<SkillRequirement>,
    /// True once skill requirements have been extracted from the text.
    pub analyzed: bool,
    pub created_at: DateTime<Utc>,
}

impl JobOpening {
    /// Concatenated text used for relevance scoring, similarity lookup and analysis.
    pub fn full_text(&self) -> String {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.responsibilities.as_str(),
            self.requirements.as_str(),
            self.nice_to_have.as_str(),
        ]
        .iter()
        .filter(|part| !part.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n")
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub responsibilities: String,
    pub requirements: String,
    pub nice_to_have: String,
    pub min_experience_years: f64,
    pub max_experience_years: Option<f64>,
    pub education_requirement: String,
    pub weight_skills: f64,
    pub weight_experience: f64,
    pub weight_education: f64,
    pub weight_fit: f64,
    pub extracted_skills: Json<Vec<SkillRequirement>>,
    pub analyzed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<JobRow> for JobOpening {
    fn from(row: JobRow) -> Self {
        JobOpening {
            id: row.id,
            title: row.title,
            description: row.description,
            responsibilities: row.responsibilities,
            requirements: row.requirements,
            nice_to_have: row.nice_to_have,
            min_experience_years: row.min_experience_years,
            max_experience_years: row.max_experience_years,
            education_requirement: row.education_requirement,
            weights: ScoringWeights {
                skills: row.weight_skills,
                experience: row.weight_experience,
                education: row.weight_education,
                fit: row.weight_fit,
            },
            skills: row.extracted_skills.0,
            analyzed: row.analyzed,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importance_weights() {
        assert_eq!(SkillImportance::MustHave.weight(), 3.0);
        assert_eq!(SkillImportance::Required.weight(), 2.0);
        assert_eq!(SkillImportance::Preferred.weight(), 1.0);
        assert_eq!(SkillImportance::NiceToHave.weight(), 0.5);
    }

    #[test]
    fn test_importance_from_label_is_lenient() {
        assert_eq!(SkillImportance::from_label("Must Have"), SkillImportance::MustHave);
        assert_eq!(SkillImportance::from_label("nice-to-have"), SkillImportance::NiceToHave);
        assert_eq!(SkillImportance::from_label("critical"), SkillImportance::Required);
        assert_eq!(SkillImportance::from_label(""), SkillImportance::Required);
    }

    #[test]
    fn test_requirement_deserializes_with_defaults() {
        let req: SkillRequirement = serde_json::from_str(r#"{"name": "Rust"}"#).unwrap();
        assert_eq!(req.importance, SkillImportance::Required);
        assert_eq!(req.years_required, 0.0);
        assert!(req.category.is_none());
    }

    #[test]
    fn test_full_text_skips_empty_sections() {
        let job = JobOpening {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            description: "Build APIs".into(),
            responsibilities: "".into(),
            requirements: "Rust, Postgres".into(),
            nice_to_have: "  ".into(),
            min_experience_years: 0.0,
            max_experience_years: None,
            education_requirement: "any".into(),
            weights: ScoringWeights::default(),
            skills: vec![],
            analyzed: false,
            created_at: Utc::now(),
        };
        assert_eq!(job.full_text(), "Backend Engineer\n\nBuild APIs\n\nRust, Postgres");
    }
}
