use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use dealflow::config::ModelConfig;
use dealflow::workflows::evaluation::{
    AnalysisResult, AnalysisStatus, ClaimOutcome, CompanyId, CompanyRecord, DealflowRepository,
    DeterministicScoreModel, EvaluationRecord, HttpScoreModel, RepositoryError, RubricConfig,
    ScoreModel, SubmissionId, SubmissionRecord,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct Store {
    submissions: HashMap<SubmissionId, SubmissionRecord>,
    evaluations: Vec<EvaluationRecord>,
    companies: HashMap<CompanyId, CompanyRecord>,
}

/// Process-local repository. All mutations run under a single mutex, which
/// is what makes the claim transition atomic with respect to other
/// claimants.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDealflowRepository {
    store: Arc<Mutex<Store>>,
}

impl DealflowRepository for InMemoryDealflowRepository {
    fn insert_submission(
        &self,
        record: SubmissionRecord,
    ) -> Result<SubmissionRecord, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        if store.submissions.contains_key(&record.submission_id) {
            return Err(RepositoryError::Conflict);
        }
        store
            .submissions
            .insert(record.submission_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_submission(
        &self,
        id: &SubmissionId,
    ) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let store = self.store.lock().expect("repository mutex poisoned");
        Ok(store.submissions.get(id).cloned())
    }

    fn list_submissions(&self) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let store = self.store.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = store.submissions.values().cloned().collect();
        records.sort_by(|a, b| a.submission_id.0.cmp(&b.submission_id.0));
        Ok(records)
    }

    fn claim_processing(&self, id: &SubmissionId) -> Result<ClaimOutcome, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        let record = store
            .submissions
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if !record.status.can_trigger() {
            return Ok(ClaimOutcome::Busy(record.status));
        }
        record.status = AnalysisStatus::Processing;
        record.failure_reason = None;
        record.updated_at = Utc::now();
        Ok(ClaimOutcome::Claimed(record.clone()))
    }

    fn complete_submission(
        &self,
        id: &SubmissionId,
        result: AnalysisResult,
    ) -> Result<SubmissionRecord, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        let record = store
            .submissions
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        record.status = AnalysisStatus::Completed;
        record.analysis_result = Some(result);
        record.failure_reason = None;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn fail_submission(
        &self,
        id: &SubmissionId,
        reason: &str,
    ) -> Result<SubmissionRecord, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        let record = store
            .submissions
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        record.status = AnalysisStatus::Failed;
        record.analysis_result = None;
        record.failure_reason = Some(reason.to_string());
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn link_company(
        &self,
        id: &SubmissionId,
        company_id: &CompanyId,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        let record = store
            .submissions
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        record.company_id = Some(company_id.clone());
        record.updated_at = Utc::now();
        Ok(())
    }

    fn append_evaluation(
        &self,
        record: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        store.evaluations.push(record.clone());
        Ok(record)
    }

    fn evaluations_for(
        &self,
        id: &SubmissionId,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        let store = self.store.lock().expect("repository mutex poisoned");
        Ok(store
            .evaluations
            .iter()
            .filter(|evaluation| &evaluation.submission_id == id)
            .cloned()
            .collect())
    }

    fn insert_company(&self, record: CompanyRecord) -> Result<CompanyRecord, RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        if store.companies.contains_key(&record.company_id) {
            return Err(RepositoryError::Conflict);
        }
        store
            .companies
            .insert(record.company_id.clone(), record.clone());
        Ok(record)
    }

    fn update_company(&self, record: CompanyRecord) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().expect("repository mutex poisoned");
        if store.companies.contains_key(&record.company_id) {
            store.companies.insert(record.company_id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch_company(&self, id: &CompanyId) -> Result<Option<CompanyRecord>, RepositoryError> {
        let store = self.store.lock().expect("repository mutex poisoned");
        Ok(store.companies.get(id).cloned())
    }

    fn list_companies(&self) -> Result<Vec<CompanyRecord>, RepositoryError> {
        let store = self.store.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = store.companies.values().cloned().collect();
        records.sort_by(|a, b| a.company_id.0.cmp(&b.company_id.0));
        Ok(records)
    }
}

pub(crate) fn default_rubric_config() -> RubricConfig {
    RubricConfig::default()
}

/// Pick the scorer: the HTTP model when a credential is configured, the
/// deterministic offline scorer otherwise.
pub(crate) fn build_score_model(config: &ModelConfig) -> Arc<dyn ScoreModel> {
    match HttpScoreModel::from_config(config) {
        Some(model) => Arc::new(model),
        None => Arc::new(DeterministicScoreModel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealflow::workflows::evaluation::SubmissionDraft;

    fn record(id: &str) -> SubmissionRecord {
        let now = Utc::now();
        SubmissionRecord {
            submission_id: SubmissionId(id.to_string()),
            draft: SubmissionDraft {
                startup_name: "Acme".to_string(),
                founder_name: "Jordan Vale".to_string(),
                contact_email: "jordan@acme.dev".to_string(),
                problem_statement: "X".to_string(),
                solution: String::new(),
                market: String::new(),
                team: String::new(),
                traction: String::new(),
                industry: None,
                deck_reference: None,
                auto_analyze: false,
            },
            status: AnalysisStatus::Pending,
            analysis_result: None,
            failure_reason: None,
            company_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn claim_is_granted_once_until_resolution() {
        let repository = InMemoryDealflowRepository::default();
        let id = SubmissionId("sub-claim".to_string());
        repository
            .insert_submission(record("sub-claim"))
            .expect("insert");

        assert!(matches!(
            repository.claim_processing(&id).expect("first claim"),
            ClaimOutcome::Claimed(_)
        ));
        assert!(matches!(
            repository.claim_processing(&id).expect("second claim"),
            ClaimOutcome::Busy(AnalysisStatus::Processing)
        ));

        repository.fail_submission(&id, "boom").expect("fail");
        assert!(matches!(
            repository.claim_processing(&id).expect("retry claim"),
            ClaimOutcome::Claimed(_)
        ));
    }

    #[test]
    fn duplicate_submission_insert_conflicts() {
        let repository = InMemoryDealflowRepository::default();
        repository
            .insert_submission(record("sub-dup"))
            .expect("insert");
        assert!(matches!(
            repository.insert_submission(record("sub-dup")),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn failure_reason_cleared_on_reclaim() {
        let repository = InMemoryDealflowRepository::default();
        let id = SubmissionId("sub-reset".to_string());
        repository
            .insert_submission(record("sub-reset"))
            .expect("insert");
        repository.claim_processing(&id).expect("claim");
        repository
            .fail_submission(&id, "provider unreachable")
            .expect("fail");

        let failed = repository
            .fetch_submission(&id)
            .expect("fetch")
            .expect("present");
        assert_eq!(
            failed.failure_reason.as_deref(),
            Some("provider unreachable")
        );

        repository.claim_processing(&id).expect("reclaim");
        let claimed = repository
            .fetch_submission(&id)
            .expect("fetch")
            .expect("present");
        assert!(claimed.failure_reason.is_none());
        assert_eq!(claimed.status, AnalysisStatus::Processing);
    }
}
