//! Session coordinator: runs every pending evaluation of a session.
//!
//! A run analyzes the job if needed, dispatches pending units through a
//! bounded worker pool, bumps the session counters as each unit settles, then
//! ranks the completed units in one pass and closes the session. At most one
//! run (or retry) per session is active in this process; a second caller gets
//! `Conflict`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::analysis::JobAnalyzer;
use crate::config::ScreeningConfig;
use crate::errors::AppError;
use crate::models::job::JobOpening;
use crate::models::screening::{
    EvaluationRecord, EvaluationStatus, ScreeningSession, SessionStatus, DEFAULT_PASS_THRESHOLD,
    DEFAULT_TOP_N,
};
use crate::scoring::ScoringWeights;
use crate::screening::evaluator::{EvaluationOutcome, Evaluator};
use crate::screening::external::CallPolicy;
use crate::screening::ranking::compute_ranks;
use crate::screening::summary::{summarize, SessionSummary};
use crate::screening::unit::{load_candidate, run_unit};
use crate::store::ScreeningStore;

pub struct SessionCoordinator {
    store: Arc<dyn ScreeningStore>,
    evaluator: Arc<Evaluator>,
    analyzer: Arc<dyn JobAnalyzer>,
    config: ScreeningConfig,
    policy: CallPolicy,
    running: Arc<DashMap<Uuid, CancellationToken>>,
}

/// Removes the session from the active set when the run ends, however it ends.
struct RunGuard {
    running: Arc<DashMap<Uuid, CancellationToken>>,
    session_id: Uuid,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.remove(&self.session_id);
    }
}

impl SessionCoordinator {
    pub fn new(
        store: Arc<dyn ScreeningStore>,
        evaluator: Arc<Evaluator>,
        analyzer: Arc<dyn JobAnalyzer>,
        config: ScreeningConfig,
    ) -> Self {
        let policy = CallPolicy::from_config(&config);
        Self {
            store,
            evaluator,
            analyzer,
            config,
            policy,
            running: Arc::new(DashMap::new()),
        }
    }

    pub fn is_running(&self, session_id: Uuid) -> bool {
        self.running.contains_key(&session_id)
    }

    // ── Session lifecycle ───────────────────────────────────────────────────

    /// Creates a pending session with one pending evaluation per candidate.
    pub async fn create_session(
        &self,
        job_id: Uuid,
        candidate_ids: &[Uuid],
        pass_threshold: Option<f64>,
        top_n: Option<u32>,
    ) -> Result<ScreeningSession, AppError> {
        if candidate_ids.is_empty() {
            return Err(AppError::Validation(
                "At least one candidate is required".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::with_capacity(candidate_ids.len());
        if let Some(dup) = candidate_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(AppError::Validation(format!(
                "Candidate {dup} is listed more than once"
            )));
        }

        let pass_threshold = pass_threshold.unwrap_or(DEFAULT_PASS_THRESHOLD);
        if !pass_threshold.is_finite() || !(0.0..=100.0).contains(&pass_threshold) {
            return Err(AppError::Validation(
                "pass_threshold must be between 0 and 100".to_string(),
            ));
        }
        let top_n = top_n.unwrap_or(DEFAULT_TOP_N);
        if top_n == 0 {
            return Err(AppError::Validation(
                "top_n_candidates must be at least 1".to_string(),
            ));
        }

        let total = u32::try_from(candidate_ids.len())
            .map_err(|_| AppError::Validation("Too many candidates".to_string()))?;
        let session = ScreeningSession::new(job_id, total, pass_threshold, top_n);
        self.store.create_session(&session, candidate_ids).await?;

        info!(session_id = %session.id, job_id = %job_id, candidates = total, "Screening session created");
        Ok(session)
    }

    /// Runs the session to a terminal state. Already finished sessions are
    /// returned untouched.
    pub async fn run_session(&self, session_id: Uuid) -> Result<ScreeningSession, AppError> {
        let session = self.store.get_session(session_id).await?;
        if session.status.is_terminal() {
            debug!(session_id = %session_id, status = %session.status, "Session already finished");
            return Ok(session);
        }

        let token = CancellationToken::new();
        let _guard = self.register(session_id, token.clone())?;
        self.run_registered(session_id, &token).await
    }

    /// Registers the run before returning and drives it on a background task.
    /// A second start while the first is active fails here with `Conflict`
    /// instead of inside the task.
    pub fn start_run(self: &Arc<Self>, session_id: Uuid) -> Result<(), AppError> {
        let token = CancellationToken::new();
        let guard = self.register(session_id, token.clone())?;
        let coordinator = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(err) = coordinator.run_registered(session_id, &token).await {
                error!(session_id = %session_id, error = %err, "Background screening run failed");
            }
        });
        Ok(())
    }

    /// Stops dispatching new units. In-flight units finish and are ranked
    /// before the run marks the session cancelled. A session with no active
    /// run is marked cancelled directly.
    pub async fn cancel(&self, session_id: Uuid) -> Result<ScreeningSession, AppError> {
        let active = self.running.get(&session_id).map(|t| t.value().clone());
        if let Some(token) = active {
            token.cancel();
            info!(session_id = %session_id, "Cancellation requested");
            return self.store.get_session(session_id).await;
        }

        let mut session = self.store.get_session(session_id).await?;
        if session.status.is_terminal() {
            return Ok(session);
        }
        session.transition_to(SessionStatus::Cancelled)?;
        self.store.save_session_state(&session).await?;
        info!(session_id = %session_id, "Session cancelled before running");
        Ok(session)
    }

    /// Re-runs a failed evaluation as a new unit of the same session, then
    /// re-ranks the session. Each failed unit can be retried once.
    pub async fn retry_unit(&self, unit_id: Uuid) -> Result<EvaluationRecord, AppError> {
        let failed = self.store.get_unit(unit_id).await?;
        if failed.status != EvaluationStatus::Failed {
            return Err(AppError::Conflict(format!(
                "Evaluation {unit_id} is {}; only failed evaluations can be retried",
                failed.status
            )));
        }
        let session_id = failed.session_id;
        let _guard = self.register(session_id, CancellationToken::new())?;

        let existing = self.store.list_units(session_id).await?;
        if let Some(retry) = existing.iter().find(|u| u.retry_of == Some(unit_id)) {
            return Err(AppError::Conflict(format!(
                "Evaluation {unit_id} was already retried as {}",
                retry.id
            )));
        }

        let session = self.store.get_session(session_id).await?;
        let (job, analysis_tokens) = self.ensure_analyzed(session.job_id).await?;
        let job_skills = self.store.job_skill_requirements(job.id).await?;

        let unit = self.store.create_retry_unit(&failed).await?;
        info!(session_id = %session_id, unit_id = %unit.id, retry_of = %unit_id, "Retrying evaluation");

        // Until the retry is counted, an error must not leave it pending.
        let result = match run_unit(self.store.as_ref(), &self.evaluator, &job, &job_skills, unit.id).await {
            Ok(result) => result,
            Err(err) => {
                self.settle_abandoned_retry(session_id, unit.id, &err).await;
                return Err(err);
            }
        };
        if let Err(err) = self.store.increment_progress(session_id, result.failed()).await {
            self.settle_abandoned_retry(session_id, unit.id, &err).await;
            return Err(err);
        }
        self.record_usage(session_id, u64::from(analysis_tokens) + u64::from(result.tokens_used))
            .await?;
        self.rank(session_id).await?;

        self.store.get_unit(unit.id).await
    }

    /// Scores one candidate against one job without persisting anything but
    /// the job analysis.
    pub async fn score_one(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
    ) -> Result<EvaluationOutcome, AppError> {
        let (job, _) = self.ensure_analyzed(job_id).await?;
        let job_skills = self.store.job_skill_requirements(job.id).await?;
        let (candidate, candidate_skills) = load_candidate(self.store.as_ref(), candidate_id).await?;
        self.evaluator
            .evaluate(&job, &job_skills, &candidate, &candidate_skills)
            .await
    }

    pub async fn summary(&self, session_id: Uuid) -> Result<SessionSummary, AppError> {
        let session = self.store.get_session(session_id).await?;
        let units = self.store.list_units(session_id).await?;
        Ok(summarize(session, &units))
    }

    pub async fn update_weights(&self, job_id: Uuid, weights: ScoringWeights) -> Result<(), AppError> {
        weights.validate()?;
        self.store.update_job_weights(job_id, weights).await?;
        info!(job_id = %job_id, ?weights, "Scoring weights updated");
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn register(&self, session_id: Uuid, token: CancellationToken) -> Result<RunGuard, AppError> {
        match self.running.entry(session_id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Session {session_id} is already running"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(token);
                Ok(RunGuard {
                    running: self.running.clone(),
                    session_id,
                })
            }
        }
    }

    async fn run_registered(
        &self,
        session_id: Uuid,
        token: &CancellationToken,
    ) -> Result<ScreeningSession, AppError> {
        // Re-read under registration: the session may have closed meanwhile.
        let session = self.store.get_session(session_id).await?;
        if session.status.is_terminal() {
            return Ok(session);
        }
        match self.drive(session, token).await {
            Ok(session) => Ok(session),
            Err(err) => {
                self.fail_session(session_id, &err).await;
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        mut session: ScreeningSession,
        token: &CancellationToken,
    ) -> Result<ScreeningSession, AppError> {
        let session_id = session.id;
        if session.status == SessionStatus::Pending {
            session.transition_to(SessionStatus::Processing)?;
            self.store.save_session_state(&session).await?;
        }
        info!(session_id = %session_id, total = session.total_count, "Screening session started");

        let (job, analysis_tokens) = self.ensure_analyzed(session.job_id).await?;
        let job_skills = Arc::new(self.store.job_skill_requirements(job.id).await?);
        let job = Arc::new(job);

        let units = self.store.list_units(session_id).await?;
        self.recover_interrupted(session_id, &units).await?;

        let pending: Vec<Uuid> = units
            .iter()
            .filter(|u| u.status == EvaluationStatus::Pending)
            .map(|u| u.id)
            .collect();

        let tokens = Arc::new(AtomicU64::new(u64::from(analysis_tokens)));
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks: JoinSet<Result<(), AppError>> = JoinSet::new();
        let mut dispatched = 0usize;

        for unit_id in pending.iter().copied() {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => permit.map_err(anyhow::Error::from)?,
            };

            let store = self.store.clone();
            let evaluator = self.evaluator.clone();
            let job = job.clone();
            let job_skills = job_skills.clone();
            let tokens = tokens.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = run_unit(store.as_ref(), &evaluator, &job, &job_skills, unit_id).await?;
                store.increment_progress(session_id, result.failed()).await?;
                tokens.fetch_add(u64::from(result.tokens_used), Ordering::Relaxed);
                Ok(())
            });
            dispatched += 1;
        }
        if dispatched < pending.len() {
            info!(
                session_id = %session_id,
                skipped = pending.len() - dispatched,
                "Dispatch stopped by cancellation"
            );
        }

        let mut first_error: Option<AppError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(AppError::Conflict(msg))) => warn!(session_id = %session_id, "{msg}"),
                Ok(Err(err)) => {
                    error!(session_id = %session_id, error = %err, "Unit could not be run");
                    first_error.get_or_insert(err);
                }
                Err(join_err) => {
                    error!(session_id = %session_id, error = %join_err, "Unit task aborted");
                    first_error.get_or_insert(AppError::Internal(anyhow::anyhow!(
                        "Evaluation task aborted: {join_err}"
                    )));
                }
            }
        }

        // Spent tokens are recorded even when the run goes on to fail.
        self.record_usage(session_id, tokens.load(Ordering::Relaxed)).await?;
        if let Some(err) = first_error {
            return Err(err);
        }

        self.rank(session_id).await?;

        let mut session = self.store.get_session(session_id).await?;
        let end = if token.is_cancelled() {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Completed
        };
        session.transition_to(end)?;
        self.store.save_session_state(&session).await?;

        info!(
            session_id = %session_id,
            status = %session.status,
            processed = session.processed_count,
            failed = session.failed_count,
            tokens = session.total_tokens_used,
            "Screening session finished"
        );
        Ok(session)
    }

    /// Runs the analyzer once for a job that has not been analyzed yet.
    /// Returns the job as stored afterwards plus the tokens spent.
    async fn ensure_analyzed(&self, job_id: Uuid) -> Result<(JobOpening, u32), AppError> {
        let job = self.store.get_job(job_id).await?;
        if job.analyzed {
            return Ok((job, 0));
        }

        let analysis = self
            .policy
            .timed("job analysis", self.analyzer.analyze(&job))
            .await?;
        self.store.save_job_analysis(job_id, &analysis).await?;
        let job = self.store.get_job(job_id).await?;
        Ok((job, analysis.tokens_used))
    }

    /// Units left in processing by an earlier run that died cannot finish.
    async fn recover_interrupted(
        &self,
        session_id: Uuid,
        units: &[EvaluationRecord],
    ) -> Result<(), AppError> {
        for unit in units.iter().filter(|u| u.status == EvaluationStatus::Processing) {
            let mut unit = unit.clone();
            unit.error_message = Some("Interrupted before completion".to_string());
            unit.rank = None;
            unit.transition_to(EvaluationStatus::Failed)?;
            self.store.save_unit(&unit).await?;
            self.store.increment_progress(session_id, true).await?;
            warn!(session_id = %session_id, unit_id = %unit.id, "Interrupted evaluation marked failed");
        }
        Ok(())
    }

    async fn rank(&self, session_id: Uuid) -> Result<(), AppError> {
        let units = self.store.list_units(session_id).await?;
        let ranks = compute_ranks(&units);
        self.store.assign_ranks(session_id, &ranks).await?;
        debug!(
            session_id = %session_id,
            ranked = ranks.iter().filter(|(_, r)| r.is_some()).count(),
            "Session ranked"
        );
        Ok(())
    }

    async fn record_usage(&self, session_id: Uuid, tokens: u64) -> Result<(), AppError> {
        if tokens == 0 {
            return Ok(());
        }
        let cost = tokens as f64 * self.config.token_cost_usd;
        self.store.add_session_usage(session_id, tokens, cost).await
    }

    /// Fails a retry unit that broke off before being counted and counts it,
    /// so the session's counters still reach its total.
    async fn settle_abandoned_retry(&self, session_id: Uuid, unit_id: Uuid, err: &AppError) {
        error!(session_id = %session_id, unit_id = %unit_id, error = %err, "Retry broke off");
        let mut unit = match self.store.get_unit(unit_id).await {
            Ok(unit) => unit,
            Err(load_err) => {
                error!(unit_id = %unit_id, error = %load_err, "Could not load abandoned retry");
                return;
            }
        };
        if unit.status.can_transition_to(EvaluationStatus::Failed) {
            unit.error_message = Some(err.to_string());
            unit.rank = None;
            if let Err(e) = unit.transition_to(EvaluationStatus::Failed) {
                error!(unit_id = %unit_id, error = %e, "Could not mark retry failed");
                return;
            }
            if let Err(e) = self.store.save_unit(&unit).await {
                error!(unit_id = %unit_id, error = %e, "Could not persist failed retry");
                return;
            }
        }
        let failed = unit.status == EvaluationStatus::Failed;
        if let Err(e) = self.store.increment_progress(session_id, failed).await {
            error!(session_id = %session_id, error = %e, "Could not count abandoned retry");
        }
    }

    async fn fail_session(&self, session_id: Uuid, err: &AppError) {
        error!(session_id = %session_id, error = %err, "Screening session failed");
        let mut session = match self.store.get_session(session_id).await {
            Ok(session) => session,
            Err(load_err) => {
                error!(session_id = %session_id, error = %load_err, "Could not load session to mark it failed");
                return;
            }
        };
        if session.status.is_terminal() {
            return;
        }
        session.error_message = Some(err.to_string());
        if let Err(e) = session.transition_to(SessionStatus::Failed) {
            error!(session_id = %session_id, error = %e, "Could not mark session failed");
            return;
        }
        if let Err(e) = self.store.save_session_state(&session).await {
            error!(session_id = %session_id, error = %e, "Could not persist failed session");
        }
    }
}
