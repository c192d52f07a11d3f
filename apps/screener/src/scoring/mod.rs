//! Deterministic scoring stages. Nothing here does I/O.

pub mod aggregator;
pub mod education;
pub mod experience;
pub mod skills;

pub use aggregator::{ScoreAggregator, ScoringWeights};
pub use education::EducationScorer;
pub use experience::ExperienceScorer;
pub use skills::{MatchedSkill, MissingSkill, SkillMatcher, SynonymTable};
