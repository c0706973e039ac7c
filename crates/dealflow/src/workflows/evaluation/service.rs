use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    AnalysisResult, AnalysisStatus, EvaluationId, EvaluationRecord, SubmissionDraft, SubmissionId,
    SubmissionRecord,
};
use super::intake::{IntakeGuard, IntakeViolation};
use super::materializer::materialize_company;
use super::model::{ModelError, ScoreModel};
use super::repository::{
    ClaimOutcome, DealflowRepository, RepositoryError, StatusEvent, StatusPublisher,
};
use super::rubric::{build_prompt, parse_scorecard, RubricConfig, ScoreParseError};

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_submission_id() -> SubmissionId {
    let id = SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SubmissionId(format!("sub-{id:06}"))
}

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("eval-{id:06}"))
}

/// Service composing the intake guard, repository, scoring model, and
/// status feed. One instance is shared across all requests; each
/// evaluation run is independent and owns no state beyond the claimed row.
pub struct EvaluationOrchestrator<R, P> {
    guard: IntakeGuard,
    repository: Arc<R>,
    feed: Arc<P>,
    model: Arc<dyn ScoreModel>,
    rubric: RubricConfig,
}

/// Result of an evaluate trigger. A busy row is not an error; the trigger
/// is short-circuited before the model is called.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluateOutcome {
    Completed(EvaluationRecord),
    Busy(AnalysisStatus),
}

impl<R, P> EvaluationOrchestrator<R, P>
where
    R: DealflowRepository + 'static,
    P: StatusPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        feed: Arc<P>,
        model: Arc<dyn ScoreModel>,
        rubric: RubricConfig,
    ) -> Self {
        Self {
            guard: IntakeGuard::new(),
            repository,
            feed,
            model,
            rubric,
        }
    }

    /// Persist a validated draft with status `pending` and return the
    /// stored record. Malformed input is rejected synchronously; no
    /// partial rows are created.
    pub fn submit(&self, draft: SubmissionDraft) -> Result<SubmissionRecord, OrchestratorError> {
        let draft = self.guard.sanitize(draft)?;
        let now = Utc::now();
        let record = SubmissionRecord {
            submission_id: next_submission_id(),
            draft,
            status: AnalysisStatus::Pending,
            analysis_result: None,
            failure_reason: None,
            company_id: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_submission(record)?;
        info!(
            submission = %stored.submission_id.0,
            startup = %stored.draft.startup_name,
            "submission accepted"
        );
        Ok(stored)
    }

    /// Run one evaluation: claim the row, score it, persist the evaluation,
    /// materialize the company, and fan out each transition. Any failure
    /// after the claim marks the row `failed` with the captured message;
    /// retry is a user-initiated re-trigger of this same entry point.
    pub async fn evaluate(
        &self,
        id: &SubmissionId,
    ) -> Result<EvaluateOutcome, OrchestratorError> {
        let record = self
            .repository
            .fetch_submission(id)?
            .ok_or(RepositoryError::NotFound)?;

        let claimed = match self.repository.claim_processing(id)? {
            ClaimOutcome::Claimed(claimed) => claimed,
            ClaimOutcome::Busy(status) => {
                info!(submission = %id.0, status = status.label(), "evaluation trigger short-circuited");
                return Ok(EvaluateOutcome::Busy(status));
            }
        };

        self.publish_event(StatusEvent {
            submission_id: claimed.submission_id.clone(),
            startup_name: claimed.draft.startup_name.clone(),
            previous: record.status,
            status: AnalysisStatus::Processing,
            company_id: claimed.company_id.clone(),
        });

        match self.run_scoring(&claimed).await {
            Ok(evaluation) => Ok(EvaluateOutcome::Completed(evaluation)),
            Err(err) => {
                let message = err.to_string();
                warn!(submission = %id.0, error = %message, "evaluation failed");
                match self.repository.fail_submission(id, &message) {
                    Ok(failed) => {
                        self.publish_event(StatusEvent {
                            submission_id: failed.submission_id.clone(),
                            startup_name: failed.draft.startup_name.clone(),
                            previous: AnalysisStatus::Processing,
                            status: AnalysisStatus::Failed,
                            company_id: failed.company_id.clone(),
                        });
                    }
                    Err(persist) => {
                        warn!(submission = %id.0, error = %persist, "could not record failure");
                    }
                }
                Err(err)
            }
        }
    }

    async fn run_scoring(
        &self,
        record: &SubmissionRecord,
    ) -> Result<EvaluationRecord, OrchestratorError> {
        let prompt = build_prompt(&record.draft, &self.rubric);
        let raw = self.model.generate(&prompt).await?;
        let card = parse_scorecard(&raw, &self.rubric)?;

        let evaluation = self.repository.append_evaluation(EvaluationRecord {
            evaluation_id: next_evaluation_id(),
            submission_id: record.submission_id.clone(),
            scorecard: card.clone(),
            model: self.model.tag(),
            created_at: Utc::now(),
        })?;

        let company_id = materialize_company(self.repository.as_ref(), record, &card)?;
        let completed = self
            .repository
            .complete_submission(&record.submission_id, AnalysisResult::V1(card))?;

        self.publish_event(StatusEvent {
            submission_id: completed.submission_id.clone(),
            startup_name: completed.draft.startup_name.clone(),
            previous: AnalysisStatus::Processing,
            status: AnalysisStatus::Completed,
            company_id: Some(company_id.clone()),
        });

        info!(
            submission = %record.submission_id.0,
            company = %company_id.0,
            model = %evaluation.model,
            "evaluation completed"
        );
        Ok(evaluation)
    }

    /// Fanout is best effort: a dropped event must not change the run's
    /// outcome or the row's status. Polling clients recover from the
    /// snapshot endpoints.
    fn publish_event(&self, event: StatusEvent) {
        if let Err(err) = self.feed.publish(event) {
            warn!(error = %err, "status event dropped");
        }
    }

    pub fn get(&self, id: &SubmissionId) -> Result<SubmissionRecord, OrchestratorError> {
        let record = self
            .repository
            .fetch_submission(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn list(&self) -> Result<Vec<SubmissionRecord>, OrchestratorError> {
        Ok(self.repository.list_submissions()?)
    }

    pub fn history(&self, id: &SubmissionId) -> Result<Vec<EvaluationRecord>, OrchestratorError> {
        self.repository
            .fetch_submission(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(self.repository.evaluations_for(id)?)
    }

    pub fn company(
        &self,
        id: &super::domain::CompanyId,
    ) -> Result<super::domain::CompanyRecord, OrchestratorError> {
        let record = self
            .repository
            .fetch_company(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn companies(&self) -> Result<Vec<super::domain::CompanyRecord>, OrchestratorError> {
        Ok(self.repository.list_companies()?)
    }
}

/// Error raised by the evaluation orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Parse(#[from] ScoreParseError),
}
