use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::analysis::JobAnalysis;
use crate::errors::AppError;
use crate::models::candidate::{CandidateProfile, CandidateSkill};
use crate::models::job::JobOpening;
use crate::models::screening::{EvaluationRecord, ScreeningSession};
use crate::scoring::aggregator::ScoringWeights;
use crate::store::ScreeningStore;

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, JobOpening>,
    candidates: HashMap<Uuid, (CandidateProfile, Vec<CandidateSkill>)>,
    sessions: HashMap<Uuid, ScreeningSession>,
    units: HashMap<Uuid, EvaluationRecord>,
    next_seq: i64,
}

impl Inner {
    fn session_mut(&mut self, session_id: Uuid) -> Result<&mut ScreeningSession, AppError> {
        self.sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
    }

    fn next_seq(&mut self) -> i64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// In-process store. Every operation takes the single lock, so counter
/// updates are trivially atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_job(&self, job: JobOpening) {
        self.inner.write().await.jobs.insert(job.id, job);
    }

    pub async fn insert_candidate(&self, candidate: CandidateProfile, skills: Vec<CandidateSkill>) {
        self.inner
            .write()
            .await
            .candidates
            .insert(candidate.id, (candidate, skills));
    }
}

#[async_trait]
impl ScreeningStore for MemoryStore {
    async fn get_job(&self, job_id: Uuid) -> Result<JobOpening, AppError> {
        self.inner
            .read()
            .await
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
    }

    async fn save_job_analysis(&self, job_id: Uuid, analysis: &JobAnalysis) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
        job.skills = analysis.skills.clone();
        job.analyzed = true;
        if job.education_requirement.trim().is_empty() {
            if let Some(level) = &analysis.education_requirement {
                job.education_requirement = level.clone();
            }
        }
        Ok(())
    }

    async fn update_job_weights(&self, job_id: Uuid, weights: ScoringWeights) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
        job.weights = weights;
        Ok(())
    }

    async fn get_candidate(&self, candidate_id: Uuid) -> Result<CandidateProfile, AppError> {
        self.inner
            .read()
            .await
            .candidates
            .get(&candidate_id)
            .map(|(profile, _)| profile.clone())
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
    }

    async fn candidate_skills(&self, candidate_id: Uuid) -> Result<Vec<CandidateSkill>, AppError> {
        self.inner
            .read()
            .await
            .candidates
            .get(&candidate_id)
            .map(|(_, skills)| skills.clone())
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
    }

    async fn create_session(
        &self,
        session: &ScreeningSession,
        candidate_ids: &[Uuid],
    ) -> Result<Vec<EvaluationRecord>, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.jobs.contains_key(&session.job_id) {
            return Err(AppError::NotFound(format!("Job {} not found", session.job_id)));
        }
        if let Some(missing) = candidate_ids.iter().find(|id| !inner.candidates.contains_key(*id)) {
            return Err(AppError::NotFound(format!("Candidate {missing} not found")));
        }

        let units: Vec<EvaluationRecord> = candidate_ids
            .iter()
            .map(|candidate_id| {
                let seq = inner.next_seq();
                EvaluationRecord::pending(session.id, session.job_id, *candidate_id, seq)
            })
            .collect();

        inner.sessions.insert(session.id, session.clone());
        for unit in &units {
            inner.units.insert(unit.id, unit.clone());
        }
        Ok(units)
    }

    async fn get_session(&self, session_id: Uuid) -> Result<ScreeningSession, AppError> {
        self.inner
            .read()
            .await
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
    }

    async fn save_session_state(&self, session: &ScreeningSession) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let stored = inner.session_mut(session.id)?;
        stored.status = session.status;
        stored.error_message = session.error_message.clone();
        stored.started_at = session.started_at;
        stored.completed_at = session.completed_at;
        Ok(())
    }

    async fn increment_progress(&self, session_id: Uuid, failed: bool) -> Result<ScreeningSession, AppError> {
        let mut inner = self.inner.write().await;
        let session = inner.session_mut(session_id)?;
        session.processed_count += 1;
        if failed {
            session.failed_count += 1;
        }
        Ok(session.clone())
    }

    async fn add_session_usage(&self, session_id: Uuid, tokens: u64, cost_usd: f64) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let session = inner.session_mut(session_id)?;
        session.total_tokens_used += tokens;
        session.total_cost_usd += cost_usd;
        Ok(())
    }

    async fn create_retry_unit(&self, failed: &EvaluationRecord) -> Result<EvaluationRecord, AppError> {
        let mut inner = self.inner.write().await;
        inner.session_mut(failed.session_id)?.total_count += 1;
        let seq = inner.next_seq();
        let mut unit = EvaluationRecord::pending(failed.session_id, failed.job_id, failed.candidate_id, seq);
        unit.retry_of = Some(failed.id);
        inner.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn list_units(&self, session_id: Uuid) -> Result<Vec<EvaluationRecord>, AppError> {
        let inner = self.inner.read().await;
        let mut units: Vec<EvaluationRecord> = inner
            .units
            .values()
            .filter(|u| u.session_id == session_id)
            .cloned()
            .collect();
        units.sort_by_key(|u| u.seq);
        Ok(units)
    }

    async fn get_unit(&self, unit_id: Uuid) -> Result<EvaluationRecord, AppError> {
        self.inner
            .read()
            .await
            .units
            .get(&unit_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Evaluation {unit_id} not found")))
    }

    async fn save_unit(&self, unit: &EvaluationRecord) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .units
            .get_mut(&unit.id)
            .ok_or_else(|| AppError::NotFound(format!("Evaluation {} not found", unit.id)))?;
        *stored = unit.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn assign_ranks(&self, session_id: Uuid, ranks: &[(Uuid, Option<u32>)]) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        for (unit_id, rank) in ranks {
            if let Some(unit) = inner.units.get_mut(unit_id) {
                if unit.session_id == session_id {
                    unit.rank = *rank;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::CandidateStatus;

    fn job() -> JobOpening {
        JobOpening {
            id: Uuid::new_v4(),
            title: "Data Engineer".into(),
            description: String::new(),
            responsibilities: String::new(),
            requirements: String::new(),
            nice_to_have: String::new(),
            min_experience_years: 2.0,
            max_experience_years: None,
            education_requirement: String::new(),
            weights: ScoringWeights::default(),
            skills: vec![],
            analyzed: false,
            created_at: Utc::now(),
        }
    }

    fn candidate() -> CandidateProfile {
        CandidateProfile {
            id: Uuid::new_v4(),
            name: "Grace".into(),
            email: None,
            status: CandidateStatus::Parsed,
            total_experience_years: 3.0,
            highest_education: "bachelor".into(),
            work_history: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_session_orders_units() {
        let store = MemoryStore::new();
        let job = job();
        let (a, b) = (candidate(), candidate());
        let (a_id, b_id) = (a.id, b.id);
        store.insert_job(job.clone()).await;
        store.insert_candidate(a, vec![]).await;
        store.insert_candidate(b, vec![]).await;

        let session = ScreeningSession::new(job.id, 2, 70.0, 10);
        store.create_session(&session, &[b_id, a_id]).await.unwrap();

        let units = store.list_units(session.id).await.unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].candidate_id, b_id);
        assert!(units[0].seq < units[1].seq);
    }

    #[tokio::test]
    async fn test_create_session_rejects_unknown_candidate() {
        let store = MemoryStore::new();
        let job = job();
        store.insert_job(job.clone()).await;
        let session = ScreeningSession::new(job.id, 1, 70.0, 10);
        let err = store.create_session(&session, &[Uuid::new_v4()]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let job = job();
        store.insert_job(job.clone()).await;
        let session = ScreeningSession::new(job.id, 50, 70.0, 10);
        store.create_session(&session, &[]).await.unwrap();
        let session_id = session.id;

        let mut handles = Vec::new();
        for i in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_progress(session_id, i % 5 == 0).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let s = store.get_session(session_id).await.unwrap();
        assert_eq!(s.processed_count, 50);
        assert_eq!(s.failed_count, 10);
    }

    #[tokio::test]
    async fn test_save_analysis_keeps_explicit_education() {
        let store = MemoryStore::new();
        let mut j = job();
        j.education_requirement = "Master's preferred".into();
        store.insert_job(j.clone()).await;
        let analysis = JobAnalysis {
            skills: vec![],
            education_requirement: Some("bachelor".into()),
            tokens_used: 10,
        };
        store.save_job_analysis(j.id, &analysis).await.unwrap();
        let saved = store.get_job(j.id).await.unwrap();
        assert!(saved.analyzed);
        assert_eq!(saved.education_requirement, "Master's preferred");
    }
}
