//! Session summary: pass rate, average score, decision breakdown and the top N.

use serde::Serialize;
use uuid::Uuid;

use crate::models::screening::{
    Decision, EvaluationRecord, EvaluationStatus, ScreeningSession,
};
use crate::screening::ranking::display_order;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionBreakdown {
    pub shortlisted: u32,
    pub maybe: u32,
    pub rejected: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub evaluation_id: Uuid,
    pub candidate_id: Uuid,
    pub rank: u32,
    pub overall_score: f64,
    pub decision: Option<Decision>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session: ScreeningSession,
    pub progress_pct: f64,
    pub duration_seconds: Option<f64>,
    pub completed_count: u32,
    pub passed_count: u32,
    /// Mean overall score of completed evaluations, two decimals.
    pub average_score: Option<f64>,
    pub decisions: DecisionBreakdown,
    pub top_candidates: Vec<RankedCandidate>,
}

pub fn summarize(session: ScreeningSession, units: &[EvaluationRecord]) -> SessionSummary {
    let completed: Vec<&EvaluationRecord> = units
        .iter()
        .filter(|u| u.status == EvaluationStatus::Completed)
        .collect();

    let threshold = session.pass_threshold;
    let passed_count = completed.iter().filter(|u| u.passed(threshold)).count() as u32;

    let scores: Vec<f64> = completed.iter().filter_map(|u| u.overall_score()).collect();
    let average_score = (!scores.is_empty())
        .then(|| (scores.iter().sum::<f64>() / scores.len() as f64 * 100.0).round() / 100.0);

    let mut decisions = DecisionBreakdown::default();
    for decision in completed.iter().filter_map(|u| u.decision()) {
        match decision {
            Decision::Shortlisted => decisions.shortlisted += 1,
            Decision::Maybe => decisions.maybe += 1,
            Decision::Rejected => decisions.rejected += 1,
        }
    }

    let mut ranked: Vec<&EvaluationRecord> = completed
        .iter()
        .copied()
        .filter(|u| u.rank.is_some())
        .collect();
    ranked.sort_by(|a, b| display_order(a, b));

    let top_candidates = ranked
        .into_iter()
        .take(session.top_n_candidates as usize)
        .filter_map(|u| {
            Some(RankedCandidate {
                evaluation_id: u.id,
                candidate_id: u.candidate_id,
                rank: u.rank?,
                overall_score: u.overall_score()?,
                decision: u.decision(),
                passed: u.passed(threshold),
            })
        })
        .collect();

    SessionSummary {
        progress_pct: session.progress_pct(),
        duration_seconds: session.duration_seconds(),
        completed_count: completed.len() as u32,
        passed_count,
        average_score,
        decisions,
        top_candidates,
        session,
    }
}
