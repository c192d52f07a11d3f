//! Education Scorer: compares the candidate's highest degree with the first
//! degree keyword found in the job's free-text requirement.

use serde::{Deserialize, Serialize};

/// Degree levels by rank, matched as a prefix of the normalized label so
/// "Bachelor's" and "bachelor_of_science" both rank as a bachelor. Unknown
/// labels rank as 2, empty as 0.
const CANDIDATE_LEVELS: &[(&str, u8)] = &[
    ("high_school", 1),
    ("associate", 2),
    ("bachelor", 3),
    ("master", 4),
    ("mba", 4),
    ("phd", 5),
    ("doctor", 5),
];
const UNRECOGNIZED_RANK: u8 = 2;

/// Requirement keywords in priority order. The first one present wins, so
/// "Bachelor's or Master's" requires a bachelor. `any` means no requirement.
const REQUIREMENT_KEYWORDS: &[(Keyword, Option<u8>)] = &[
    (Keyword::Substring("high school"), Some(1)),
    (Keyword::Substring("high_school"), Some(1)),
    (Keyword::Substring("associate"), Some(2)),
    (Keyword::Substring("bachelor"), Some(3)),
    (Keyword::Substring("master"), Some(4)),
    (Keyword::Word("mba"), Some(4)),
    (Keyword::Substring("phd"), Some(5)),
    (Keyword::Substring("ph.d"), Some(5)),
    (Keyword::Substring("doctorate"), Some(5)),
    (Keyword::Word("any"), None),
];

/// How a requirement keyword is found in the job text. Short keywords must
/// stand alone so "any" does not fire inside "company".
#[derive(Debug, Clone, Copy)]
enum Keyword {
    Substring(&'static str),
    Word(&'static str),
}

impl Keyword {
    fn found_in(self, text: &str) -> bool {
        match self {
            Keyword::Substring(needle) => text.contains(needle),
            Keyword::Word(word) => text
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| token == word),
        }
    }
}

const MET_SCORE: f64 = 100.0;
const NO_REQUIREMENT_SCORE: f64 = 90.0;
const ONE_LEVEL_SHORT_SCORE: f64 = 70.0;
const FURTHER_SHORT_SCORE: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EducationScore {
    pub score: f64,
    pub is_match: bool,
    pub candidate_rank: u8,
    /// None when the job states no recognizable requirement.
    pub required_rank: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EducationScorer;

impl EducationScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, candidate_level: &str, requirement: &str) -> EducationScore {
        let candidate_rank = candidate_rank(candidate_level);

        let Some(required) = required_rank(requirement) else {
            return EducationScore {
                score: NO_REQUIREMENT_SCORE,
                is_match: true,
                candidate_rank,
                required_rank: None,
            };
        };

        if candidate_rank >= required {
            EducationScore {
                score: MET_SCORE,
                is_match: true,
                candidate_rank,
                required_rank: Some(required),
            }
        } else {
            let score = if required - candidate_rank == 1 {
                ONE_LEVEL_SHORT_SCORE
            } else {
                FURTHER_SHORT_SCORE
            };
            EducationScore {
                score,
                is_match: false,
                candidate_rank,
                required_rank: Some(required),
            }
        }
    }
}

pub fn candidate_rank(level: &str) -> u8 {
    let key: String = level
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '.'))
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    if key.is_empty() {
        return 0;
    }
    CANDIDATE_LEVELS
        .iter()
        .find(|(label, _)| key.starts_with(*label))
        .map(|(_, rank)| *rank)
        .unwrap_or(UNRECOGNIZED_RANK)
}

pub fn required_rank(requirement: &str) -> Option<u8> {
    let text = requirement.to_lowercase();
    REQUIREMENT_KEYWORDS
        .iter()
        .find(|(keyword, _)| keyword.found_in(&text))
        .and_then(|(_, rank)| *rank)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phd_meets_bachelor() {
        let s = EducationScorer::new().score("phd", "bachelor");
        assert_eq!(s.score, 100.0);
        assert!(s.is_match);
    }

    #[test]
    fn test_one_level_short_is_70() {
        let s = EducationScorer::new().score("associate", "bachelor");
        assert_eq!(s.score, 70.0);
        assert!(!s.is_match);
    }

    #[test]
    fn test_two_or_more_levels_short_is_40() {
        let s = EducationScorer::new().score("high_school", "phd");
        assert_eq!(s.score, 40.0);
        assert!(!s.is_match);

        let s = EducationScorer::new().score("", "PhD in Machine Learning");
        assert_eq!(s.score, 40.0);
    }

    #[test]
    fn test_any_or_missing_requirement_is_90() {
        for level in ["", "high_school", "phd", "other"] {
            let s = EducationScorer::new().score(level, "any");
            assert_eq!(s.score, 90.0);
            assert!(s.is_match);
        }
        let s = EducationScorer::new().score("bachelor", "");
        assert_eq!(s.score, 90.0);
        assert_eq!(s.required_rank, None);
    }

    #[test]
    fn test_first_keyword_in_priority_order_wins() {
        assert_eq!(required_rank("Bachelor's or Master's"), Some(3));
        assert_eq!(required_rank("Master's or PhD preferred"), Some(4));
        assert_eq!(required_rank("High school diploma"), Some(1));
        assert_eq!(required_rank("Doctorate in physics"), Some(5));
        assert_eq!(required_rank("Relevant certification"), None);
    }

    #[test]
    fn test_candidate_ranks() {
        assert_eq!(candidate_rank("High School"), 1);
        assert_eq!(candidate_rank("MBA"), 4);
        assert_eq!(candidate_rank("other"), 2);
        assert_eq!(candidate_rank("bootcamp"), 2);
        assert_eq!(candidate_rank("  "), 0);
    }

    #[test]
    fn test_any_must_be_a_whole_word() {
        assert_eq!(required_rank("Many years in a company setting"), None);
        let s = EducationScorer::new().score("", "Many years in a company, Bachelor's");
        assert_eq!(s.required_rank, Some(3));
        assert_eq!(s.score, 40.0);

        // "any" still wins when it is the first keyword present
        assert_eq!(required_rank("Any degree, or equivalent"), None);
        assert_eq!(required_rank("Not an MBA-holder"), Some(4));
        assert_eq!(required_rank("Ambassador role"), None);
    }

    #[test]
    fn test_candidate_label_variants() {
        assert_eq!(candidate_rank("Bachelor's"), 3);
        assert_eq!(candidate_rank("bachelors"), 3);
        assert_eq!(candidate_rank("Bachelor of Science"), 3);
        assert_eq!(candidate_rank("Master's"), 4);
        assert_eq!(candidate_rank("Doctorate"), 5);
        assert_eq!(candidate_rank("Ph.D."), 5);
        assert_eq!(candidate_rank("high-school"), 1);

        let s = EducationScorer::new().score("Bachelor's", "Bachelor's degree");
        assert_eq!(s.score, 100.0);
    }

    #[test]
    fn test_mba_satisfies_master() {
        let s = EducationScorer::new().score("mba", "Master's degree");
        assert_eq!(s.score, 100.0);
    }
}
