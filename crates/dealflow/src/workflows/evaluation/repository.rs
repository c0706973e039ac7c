use serde::Serialize;
use tokio::sync::broadcast;

use super::domain::{
    AnalysisResult, AnalysisStatus, CompanyId, CompanyRecord, EvaluationRecord, SubmissionId,
    SubmissionRecord,
};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of the conditional pending|failed -> processing transition.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// The row was transitioned to `processing`; the claimant owns the run.
    Claimed(SubmissionRecord),
    /// The row was already `processing` or `completed`; no transition made.
    Busy(AnalysisStatus),
}

/// Storage abstraction over submissions, evaluation history, and companies
/// so the orchestrator can be exercised in isolation.
pub trait DealflowRepository: Send + Sync {
    fn insert_submission(
        &self,
        record: SubmissionRecord,
    ) -> Result<SubmissionRecord, RepositoryError>;
    fn fetch_submission(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<SubmissionRecord>, RepositoryError>;
    /// Full current state for polling clients; a missed push event
    /// self-heals within one polling interval.
    fn list_submissions(&self) -> Result<Vec<SubmissionRecord>, RepositoryError>;
    /// Single conditional transition `pending | failed -> processing`
    /// performed atomically with respect to other claimants, so two
    /// concurrent triggers cannot both own an evaluation run.
    fn claim_processing(&self, id: &SubmissionId) -> Result<ClaimOutcome, RepositoryError>;
    fn complete_submission(
        &self,
        id: &SubmissionId,
        result: AnalysisResult,
    ) -> Result<SubmissionRecord, RepositoryError>;
    fn fail_submission(
        &self,
        id: &SubmissionId,
        reason: &str,
    ) -> Result<SubmissionRecord, RepositoryError>;
    fn link_company(
        &self,
        id: &SubmissionId,
        company_id: &CompanyId,
    ) -> Result<(), RepositoryError>;

    /// Append-only history: re-evaluation inserts a new row.
    fn append_evaluation(
        &self,
        record: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError>;
    fn evaluations_for(
        &self,
        id: &SubmissionId,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError>;

    fn insert_company(&self, record: CompanyRecord) -> Result<CompanyRecord, RepositoryError>;
    fn update_company(&self, record: CompanyRecord) -> Result<(), RepositoryError>;
    fn fetch_company(&self, id: &CompanyId) -> Result<Option<CompanyRecord>, RepositoryError>;
    fn list_companies(&self) -> Result<Vec<CompanyRecord>, RepositoryError>;
}

/// Change notification describing one status transition. Carries enough
/// payload for subscribers to react without an extra fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    pub submission_id: SubmissionId,
    pub startup_name: String,
    pub previous: AnalysisStatus,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

/// Status feed dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("status feed unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing the outbound status fanout hook.
pub trait StatusPublisher: Send + Sync {
    fn publish(&self, event: StatusEvent) -> Result<(), FeedError>;
}

/// Broadcast-backed status feed. Delivery is best effort: events sent with
/// no connected subscriber are dropped, and lagging receivers lose the
/// oldest events; clients recover through the polling endpoints.
pub struct StatusFeed {
    sender: broadcast::Sender<StatusEvent>,
}

impl StatusFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

impl StatusPublisher for StatusFeed {
    fn publish(&self, event: StatusEvent) -> Result<(), FeedError> {
        // send errs only when no receiver is connected; that is not a fault
        // on a best-effort channel.
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: AnalysisStatus) -> StatusEvent {
        StatusEvent {
            submission_id: SubmissionId("sub-000001".to_string()),
            startup_name: "Acme".to_string(),
            previous: AnalysisStatus::Pending,
            status,
            company_id: None,
        }
    }

    #[tokio::test]
    async fn feed_delivers_events_in_publish_order() {
        let feed = StatusFeed::default();
        let mut receiver = feed.subscribe();

        feed.publish(event(AnalysisStatus::Processing)).expect("publish");
        feed.publish(event(AnalysisStatus::Completed)).expect("publish");

        assert_eq!(
            receiver.recv().await.expect("first event").status,
            AnalysisStatus::Processing
        );
        assert_eq!(
            receiver.recv().await.expect("second event").status,
            AnalysisStatus::Completed
        );
    }

    #[test]
    fn publishing_without_subscribers_is_not_an_error() {
        let feed = StatusFeed::default();
        assert!(feed.publish(event(AnalysisStatus::Processing)).is_ok());
    }
}
