//! Ranking: dense 1..K ordering of the completed evaluations in one session.
//!
//! Descending overall score; equal scores keep creation order (`seq`). Anything
//! not completed gets no rank. Pure and deterministic, so re-ranking an
//! unchanged session reproduces the same numbers.

use std::cmp::Ordering;

use uuid::Uuid;

use crate::models::screening::{EvaluationRecord, EvaluationStatus};

pub fn compute_ranks(units: &[EvaluationRecord]) -> Vec<(Uuid, Option<u32>)> {
    let mut completed: Vec<(&EvaluationRecord, f64)> = units
        .iter()
        .filter(|u| u.status == EvaluationStatus::Completed)
        .filter_map(|u| u.overall_score().map(|s| (u, s)))
        .collect();

    completed.sort_by(|(a, score_a), (b, score_b)| {
        score_b
            .total_cmp(score_a)
            .then_with(|| a.seq.cmp(&b.seq))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut ranks: Vec<(Uuid, Option<u32>)> = completed
        .iter()
        .enumerate()
        .map(|(i, (u, _))| (u.id, Some(i as u32 + 1)))
        .collect();

    let unranked: Vec<(Uuid, Option<u32>)> = units
        .iter()
        .filter(|u| !ranks.iter().any(|(id, _)| *id == u.id))
        .map(|u| (u.id, None))
        .collect();
    ranks.extend(unranked);
    ranks
}

/// Orders records for display: ranked first by rank, then the rest by creation order.
pub fn display_order(a: &EvaluationRecord, b: &EvaluationRecord) -> Ordering {
    match (a.rank, b.rank) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.seq.cmp(&b.seq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::screening::ScoreBreakdown;

    fn unit(seq: i64, status: EvaluationStatus, score: Option<f64>) -> EvaluationRecord {
        let mut u = EvaluationRecord::pending(Uuid::nil(), Uuid::nil(), Uuid::new_v4(), seq);
        u.status = status;
        u.scores = score.map(|overall| ScoreBreakdown {
            overall,
            skill: 0.0,
            experience: 0.0,
            education: 0.0,
            fit: 0.0,
            semantic_similarity: 0.0,
        });
        u
    }

    fn rank_of(ranks: &[(Uuid, Option<u32>)], id: Uuid) -> Option<u32> {
        ranks.iter().find(|(u, _)| *u == id).and_then(|(_, r)| *r)
    }

    #[test]
    fn test_ties_broken_by_creation_order() {
        let units = vec![
            unit(1, EvaluationStatus::Completed, Some(90.0)),
            unit(2, EvaluationStatus::Completed, Some(90.0)),
            unit(3, EvaluationStatus::Completed, Some(75.0)),
        ];
        let ranks = compute_ranks(&units);
        assert_eq!(rank_of(&ranks, units[0].id), Some(1));
        assert_eq!(rank_of(&ranks, units[1].id), Some(2));
        assert_eq!(rank_of(&ranks, units[2].id), Some(3));
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let units = vec![
            unit(3, EvaluationStatus::Completed, Some(75.0)),
            unit(2, EvaluationStatus::Completed, Some(90.0)),
            unit(1, EvaluationStatus::Completed, Some(90.0)),
        ];
        let ranks = compute_ranks(&units);
        assert_eq!(rank_of(&ranks, units[2].id), Some(1));
        assert_eq!(rank_of(&ranks, units[1].id), Some(2));
        assert_eq!(rank_of(&ranks, units[0].id), Some(3));
    }

    #[test]
    fn test_failed_and_pending_units_unranked_without_gaps() {
        let units = vec![
            unit(1, EvaluationStatus::Completed, Some(60.0)),
            unit(2, EvaluationStatus::Failed, None),
            unit(3, EvaluationStatus::Completed, Some(80.0)),
            unit(4, EvaluationStatus::Pending, None),
        ];
        let ranks = compute_ranks(&units);
        assert_eq!(ranks.len(), 4);
        assert_eq!(rank_of(&ranks, units[2].id), Some(1));
        assert_eq!(rank_of(&ranks, units[0].id), Some(2));
        assert_eq!(rank_of(&ranks, units[1].id), None);
        assert_eq!(rank_of(&ranks, units[3].id), None);
    }

    #[test]
    fn test_reranking_is_idempotent() {
        let mut units = vec![
            unit(1, EvaluationStatus::Completed, Some(90.0)),
            unit(2, EvaluationStatus::Completed, Some(90.0)),
            unit(3, EvaluationStatus::Failed, None),
            unit(4, EvaluationStatus::Completed, Some(75.0)),
        ];
        let first = compute_ranks(&units);
        for u in units.iter_mut() {
            u.rank = rank_of(&first, u.id);
        }
        let second = compute_ranks(&units);
        for u in &units {
            assert_eq!(rank_of(&first, u.id), rank_of(&second, u.id));
        }
    }

    #[test]
    fn test_display_order_puts_ranked_first() {
        let mut a = unit(1, EvaluationStatus::Failed, None);
        let mut b = unit(2, EvaluationStatus::Completed, Some(50.0));
        b.rank = Some(1);
        a.rank = None;
        let mut v = vec![a.clone(), b.clone()];
        v.sort_by(display_order);
        assert_eq!(v[0].id, b.id);
    }
}
