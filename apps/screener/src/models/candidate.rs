use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Where a candidate's resume is in the extraction/parsing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Uploaded,
    Parsing,
    Parsed,
    Indexed,
    Failed,
}

impl CandidateStatus {
    /// Text extraction and structured parsing have both finished.
    pub fn is_parsed(self) -> bool {
        matches!(self, CandidateStatus::Parsed | CandidateStatus::Indexed)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(CandidateStatus::Uploaded),
            "parsing" => Some(CandidateStatus::Parsing),
            "parsed" => Some(CandidateStatus::Parsed),
            "indexed" => Some(CandidateStatus::Indexed),
            "failed" => Some(CandidateStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSkill {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub years_used: Option<f64>,
}

impl CandidateSkill {
    #[cfg(test)]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            years_used: None,
        }
    }
}

/// One position from the parsed work history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkHistoryEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// Structured candidate profile produced by the (external) resume parser.
/// Skills are stored separately and read through `ScreeningStore::candidate_skills`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub status: CandidateStatus,
    pub total_experience_years: f64,
    /// Canonical level label such as "bachelor" or "phd"; empty if unknown.
    pub highest_education: String,
    pub work_history: Vec<WorkHistoryEntry>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub status: String,
    pub total_experience_years: f64,
    pub highest_education: String,
    pub work_history: Json<Vec<WorkHistoryEntry>>,
    pub created_at: DateTime<Utc>,
}

impl From<CandidateRow> for CandidateProfile {
    fn from(row: CandidateRow) -> Self {
        CandidateProfile {
            id: row.id,
            name: row.name,
            email: row.email,
            // Unknown states are treated as not yet parsed.
            status: CandidateStatus::parse(&row.status).unwrap_or(CandidateStatus::Uploaded),
            total_experience_years: row.total_experience_years,
            highest_education: row.highest_education,
            work_history: row.work_history.0,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_parsed_or_indexed_are_ready() {
        assert!(CandidateStatus::Parsed.is_parsed());
        assert!(CandidateStatus::Indexed.is_parsed());
        assert!(!CandidateStatus::Uploaded.is_parsed());
        assert!(!CandidateStatus::Parsing.is_parsed());
        assert!(!CandidateStatus::Failed.is_parsed());
    }

    #[test]
    fn test_work_history_tolerates_missing_fields() {
        let entry: WorkHistoryEntry = serde_json::from_str(r#"{"title": "SRE"}"#).unwrap();
        assert_eq!(entry.title, "SRE");
        assert!(entry.description.is_empty());
        assert!(entry.technologies.is_empty());
    }
}
