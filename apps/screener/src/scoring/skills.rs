//! Skill Matcher: weighted fuzzy overlap between a candidate's skills and a job's
//! skill requirements.
//!
//! Pure, synchronous and deterministic. The synonym table is injected at
//! construction so two matchers with different tables never interfere.
//!
//! Algorithm:
//! 1. Normalize names (trim + lowercase) and expand through the synonym table
//! 2. Weight each requirement by importance (must_have 3.0 … nice_to_have 0.5)
//! 3. A requirement matches on exact name, synonym-expanded name, or substring
//!    (either direction) when both names are longer than 3 characters
//! 4. base = matched_weight / total_weight × 100, or 85 when the job lists no skills
//! 5. bonus = 0.5 per unmatched candidate skill, at most 5 points
//! 6. combined = min(100, base + bonus), × 0.7 if any must-have is missing

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::candidate::CandidateSkill;
use crate::models::job::{SkillImportance, SkillRequirement};

/// Score used when the job lists no skills at all.
pub const NO_REQUIREMENTS_SCORE: f64 = 85.0;
pub const MUST_HAVE_PENALTY: f64 = 0.7;
const BONUS_PER_SKILL: f64 = 0.5;
const MAX_BONUS_COUNTED: usize = 10;
const MAX_BONUS_LISTED: usize = 15;
/// Substring matching only applies when both names are longer than this.
const MIN_SUBSTRING_LEN: usize = 3;

const DEFAULT_SYNONYMS: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("ml", "machine learning"),
    ("ai", "artificial intelligence"),
    ("nlp", "natural language processing"),
    ("dl", "deep learning"),
    ("k8s", "kubernetes"),
    ("dbs", "databases"),
    ("oop", "object oriented"),
    ("golang", "go"),
    ("postgres", "postgresql"),
];

// ────────────────────────────────────────────────────────────────────────────
// Synonym table
// ────────────────────────────────────────────────────────────────────────────

/// Immutable abbreviation → canonical name map.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    map: HashMap<String, String>,
}

impl SynonymTable {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (normalize(k.as_ref()), normalize(v.as_ref())))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();
        Self { map }
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Returns the canonical form of an already-normalized name.
    pub fn expand<'a>(&'a self, name: &'a str) -> &'a str {
        self.map.get(name).map(String::as_str).unwrap_or(name)
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::new(DEFAULT_SYNONYMS.iter().copied())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSkill {
    pub name: String,
    pub importance: SkillImportance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingSkill {
    pub name: String,
    pub importance: SkillImportance,
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    /// Final score, 0–100.
    pub score: f64,
    /// Weighted coverage before bonus and penalty.
    pub base_score: f64,
    pub bonus_points: f64,
    pub matched: Vec<MatchedSkill>,
    pub missing: Vec<MissingSkill>,
    pub bonus: Vec<String>,
    pub must_have_satisfied: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Matcher
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SkillMatcher {
    synonyms: SynonymTable,
}

impl SkillMatcher {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    /// Scores candidate skills against job requirements.
    ///
    /// Requirements with duplicate names are each scored on their own (not
    /// de-duplicated). Requirements with blank names are ignored.
    pub fn match_skills(
        &self,
        candidate_skills: &[CandidateSkill],
        job_skills: &[SkillRequirement],
    ) -> SkillMatch {
        let candidate_names = self.candidate_names(candidate_skills);

        // Candidate names plus their canonical expansions.
        let mut candidate_pool: Vec<String> = Vec::with_capacity(candidate_names.len() * 2);
        for name in &candidate_names {
            push_unique(&mut candidate_pool, name.clone());
            push_unique(&mut candidate_pool, self.synonyms.expand(name).to_string());
        }

        let mut matched = Vec::new();
        let mut missing = Vec::new();
        let mut total_weight = 0.0_f64;
        let mut matched_weight = 0.0_f64;
        let mut must_have_total = 0_usize;
        let mut must_have_met = 0_usize;
        let mut requirement_pool: Vec<String> = Vec::new();

        for requirement in job_skills {
            let name = normalize(&requirement.name);
            if name.is_empty() {
                continue;
            }
            push_unique(&mut requirement_pool, name.clone());
            push_unique(&mut requirement_pool, self.synonyms.expand(&name).to_string());

            let weight = requirement.importance.weight();
            total_weight += weight;
            let is_must_have = requirement.importance == SkillImportance::MustHave;
            if is_must_have {
                must_have_total += 1;
            }

            if self.requirement_matches(&name, &candidate_pool) {
                matched_weight += weight;
                if is_must_have {
                    must_have_met += 1;
                }
                matched.push(MatchedSkill {
                    name: requirement.name.trim().to_string(),
                    importance: requirement.importance,
                });
            } else {
                missing.push(MissingSkill {
                    name: requirement.name.trim().to_string(),
                    importance: requirement.importance,
                    is_critical: requirement.importance.is_critical(),
                });
            }
        }

        // A candidate skill is a bonus only if none of its forms match any form
        // of any requirement, so "javascript" is not a bonus against "js".
        let bonus_all: Vec<String> = candidate_names
            .iter()
            .filter(|name| {
                let forms = [name.as_str(), self.synonyms.expand(name)];
                !forms
                    .iter()
                    .any(|form| requirement_pool.iter().any(|req| names_match(form, req)))
            })
            .cloned()
            .collect();

        let base_score = if total_weight > 0.0 {
            matched_weight / total_weight * 100.0
        } else {
            NO_REQUIREMENTS_SCORE
        };

        let bonus_points = bonus_all.len().min(MAX_BONUS_COUNTED) as f64 * BONUS_PER_SKILL;
        let must_have_satisfied = must_have_total == 0 || must_have_met == must_have_total;

        let mut score = (base_score + bonus_points).min(100.0);
        if !must_have_satisfied {
            score *= MUST_HAVE_PENALTY;
        }

        let mut bonus = bonus_all;
        bonus.truncate(MAX_BONUS_LISTED);

        SkillMatch {
            score: score.clamp(0.0, 100.0),
            base_score,
            bonus_points,
            matched,
            missing,
            bonus,
            must_have_satisfied,
        }
    }

    /// Distinct normalized candidate names, in input order.
    fn candidate_names(&self, skills: &[CandidateSkill]) -> Vec<String> {
        let mut seen = HashSet::new();
        skills
            .iter()
            .map(|s| normalize(&s.name))
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .collect()
    }

    fn requirement_matches(&self, requirement: &str, candidate_pool: &[String]) -> bool {
        if candidate_pool.iter().any(|c| c == requirement) {
            return true;
        }
        let expanded = self.synonyms.expand(requirement);
        if candidate_pool.iter().any(|c| c == expanded) {
            return true;
        }
        candidate_pool
            .iter()
            .any(|c| substring_match(requirement, c))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn push_unique(pool: &mut Vec<String>, name: String) {
    if !pool.contains(&name) {
        pool.push(name);
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a == b || substring_match(a, b)
}

/// "react" ~ "react.js", but "go" never matches "mongodb".
fn substring_match(a: &str, b: &str) -> bool {
    a.chars().count() > MIN_SUBSTRING_LEN
        && b.chars().count() > MIN_SUBSTRING_LEN
        && (a.contains(b) || b.contains(a))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
