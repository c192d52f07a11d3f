//! Experience Scorer: years-of-experience fit blended with work-history
//! relevance to the job text.
//!
//! years component:
//!   candidate ≥ min          → 100, or 85 if more than 1.5 × max
//!   0 < candidate < min      → candidate / min × 100
//!   min == 0                 → 100
//!
//! relevance: per work-history entry, the share of distinct job-text words that
//! appear in the entry's title + description + technologies, scaled ×3 and
//! capped at 100. Averaged over entries; 50 when there is nothing to compare.
//!
//! score = 0.6 × years + 0.4 × relevance

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::candidate::WorkHistoryEntry;

const YEARS_WEIGHT: f64 = 0.6;
const RELEVANCE_WEIGHT: f64 = 0.4;
const OVERQUALIFIED_FACTOR: f64 = 1.5;
const OVERQUALIFIED_SCORE: f64 = 85.0;
const NEUTRAL_RELEVANCE: f64 = 50.0;
const RELEVANCE_SCALE: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperienceScore {
    /// Final score, 0–100.
    pub score: f64,
    pub years_component: f64,
    pub relevance_pct: f64,
    /// Years short of the minimum, rounded to one decimal. 0 when met.
    pub gap_years: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExperienceScorer;

impl ExperienceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        candidate_years: f64,
        work_history: &[WorkHistoryEntry],
        min_years: f64,
        max_years: Option<f64>,
        job_text: &str,
    ) -> ExperienceScore {
        let years = non_negative(candidate_years);
        let min_years = non_negative(min_years);
        // A zero or negative maximum means "no upper bound".
        let max_years = max_years.filter(|m| m.is_finite() && *m > 0.0);

        let years_component = years_component(years, min_years, max_years);
        let gap_years = round1((min_years - years).max(0.0));
        let relevance_pct = relevance(work_history, job_text);

        let score = YEARS_WEIGHT * years_component + RELEVANCE_WEIGHT * relevance_pct;

        ExperienceScore {
            score: score.clamp(0.0, 100.0),
            years_component,
            relevance_pct,
            gap_years,
        }
    }
}

fn years_component(years: f64, min_years: f64, max_years: Option<f64>) -> f64 {
    if min_years <= 0.0 {
        return 100.0;
    }
    if years >= min_years {
        match max_years {
            Some(max) if years > max * OVERQUALIFIED_FACTOR => OVERQUALIFIED_SCORE,
            _ => 100.0,
        }
    } else {
        (years / min_years * 100.0).clamp(0.0, 100.0)
    }
}

fn relevance(work_history: &[WorkHistoryEntry], job_text: &str) -> f64 {
    let job_words = word_set(job_text);
    if job_words.is_empty() {
        return NEUTRAL_RELEVANCE;
    }

    let per_entry: Vec<f64> = work_history
        .iter()
        .filter_map(|entry| {
            let text = format!(
                "{} {} {}",
                entry.title,
                entry.description,
                entry.technologies.join(" ")
            );
            let words = word_set(&text);
            if words.is_empty() {
                return None;
            }
            let overlap = words.intersection(&job_words).count() as f64;
            Some((overlap / job_words.len() as f64 * RELEVANCE_SCALE).min(100.0))
        })
        .collect();

    if per_entry.is_empty() {
        NEUTRAL_RELEVANCE
    } else {
        per_entry.iter().sum::<f64>() / per_entry.len() as f64
    }
}

/// Lowercased whitespace tokens. Punctuation stays attached, so "rust," and
/// "rust" are different words.
fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, description: &str, tech: &[&str]) -> WorkHistoryEntry {
        WorkHistoryEntry {
            title: title.into(),
            company: None,
            description: description.into(),
            technologies: tech.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_meets_minimum_with_no_history() {
        let s = ExperienceScorer::new().score(5.0, &[], 5.0, None, "rust backend");
        assert_eq!(s.years_component, 100.0);
        assert_eq!(s.relevance_pct, 50.0);
        assert!((s.score - 80.0).abs() < 1e-9);
        assert_eq!(s.gap_years, 0.0);
    }

    #[test]
    fn test_below_minimum_is_proportional() {
        let s = ExperienceScorer::new().score(3.0, &[], 5.0, None, "");
        assert!((s.years_component - 60.0).abs() < 1e-9);
        assert_eq!(s.gap_years, 2.0);
    }

    #[test]
    fn test_gap_rounded_to_one_decimal() {
        let s = ExperienceScorer::new().score(2.33, &[], 5.0, None, "");
        assert_eq!(s.gap_years, 2.7);
    }

    #[test]
    fn test_overqualified_capped_at_85() {
        let s = ExperienceScorer::new().score(16.0, &[], 3.0, Some(10.0), "");
        assert_eq!(s.years_component, 85.0);

        // exactly 1.5 × max is not overqualified
        let s = ExperienceScorer::new().score(15.0, &[], 3.0, Some(10.0), "");
        assert_eq!(s.years_component, 100.0);
    }

    #[test]
    fn test_no_minimum_is_full_years_score() {
        let s = ExperienceScorer::new().score(0.0, &[], 0.0, None, "");
        assert_eq!(s.years_component, 100.0);
        assert_eq!(s.gap_years, 0.0);
    }

    #[test]
    fn test_negative_inputs_are_clamped() {
        let s = ExperienceScorer::new().score(-4.0, &[], 2.0, Some(-1.0), "");
        assert_eq!(s.years_component, 0.0);
        assert_eq!(s.gap_years, 2.0);
        assert!((0.0..=100.0).contains(&s.score));

        let s = ExperienceScorer::new().score(f64::NAN, &[], f64::NAN, None, "");
        assert_eq!(s.years_component, 100.0);
    }

    #[test]
    fn test_relevance_overlap_scaled_and_capped() {
        // job has 4 distinct words; entry shares 1 → 25% × 3 = 75
        let history = vec![entry("Engineer", "wrote rust services", &[])];
        let s = ExperienceScorer::new().score(5.0, &history, 5.0, None, "Rust Kafka Postgres Docker");
        assert!((s.relevance_pct - 75.0).abs() < 1e-9);

        // shares 2 of 4 → 150, capped at 100
        let history = vec![entry("Engineer", "", &["rust", "kafka"])];
        let s = ExperienceScorer::new().score(5.0, &history, 5.0, None, "rust kafka postgres docker");
        assert_eq!(s.relevance_pct, 100.0);
    }

    #[test]
    fn test_relevance_keeps_punctuation_attached() {
        // "rust," in the job text is not the word "rust"
        let history = vec![entry("Engineer", "wrote rust services", &[])];
        let s = ExperienceScorer::new().score(5.0, &history, 5.0, None, "Rust, Kafka, Postgres, Docker");
        assert_eq!(s.relevance_pct, 0.0);
        assert!((s.score - 60.0).abs() < 1e-9);

        // the last word carries no comma and still matches case-insensitively
        let history = vec![entry("Engineer", "", &["docker"])];
        let s = ExperienceScorer::new().score(5.0, &history, 5.0, None, "Rust, Kafka, Postgres, Docker");
        assert!((s.relevance_pct - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_averages_entries_and_skips_empty_ones() {
        let history = vec![
            entry("rust", "", &[]),
            entry("", "", &[]),
            entry("painter", "", &[]),
        ];
        let s = ExperienceScorer::new().score(5.0, &history, 5.0, None, "rust kafka postgres docker");
        // (75 + 0) / 2; the empty entry is not counted
        assert!((s.relevance_pct - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_job_text_is_neutral() {
        let history = vec![entry("rust", "", &[])];
        let s = ExperienceScorer::new().score(1.0, &history, 0.0, None, "   ");
        assert_eq!(s.relevance_pct, 50.0);
    }
}
