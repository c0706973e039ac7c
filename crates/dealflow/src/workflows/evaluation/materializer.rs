use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::domain::{CompanyId, CompanyRecord, ScoreCard, SubmissionRecord};
use super::repository::{DealflowRepository, RepositoryError};
use super::rubric::SCORE_NEUTRAL;

/// Source tag stamped onto companies created by this pipeline.
pub const COMPANY_SOURCE: &str = "dealflow_intake";

static COMPANY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_company_id() -> CompanyId {
    let id = COMPANY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CompanyId(format!("co-{id:06}"))
}

/// Create or refresh the durable company record for a completed scorecard.
///
/// Idempotent by construction: a submission that already carries a
/// `company_id` routes to an update-in-place, so re-running materialization
/// never produces a second company for the same submission.
pub fn materialize_company<R: DealflowRepository + ?Sized>(
    repository: &R,
    submission: &SubmissionRecord,
    card: &ScoreCard,
) -> Result<CompanyId, RepositoryError> {
    let now = Utc::now();
    let overall_score = card.overall_average.unwrap_or(f64::from(SCORE_NEUTRAL));

    if let Some(company_id) = &submission.company_id {
        match repository.fetch_company(company_id)? {
            Some(mut company) => {
                company.overall_score = overall_score;
                company.report_summary = card.analysis_summary.clone();
                company.updated_at = now;
                repository.update_company(company)?;
            }
            // Linked but missing company row; re-insert under the same id
            // so the back-reference on the submission stays valid.
            None => {
                repository.insert_company(company_from(
                    company_id.clone(),
                    submission,
                    card,
                    overall_score,
                ))?;
            }
        }
        return Ok(company_id.clone());
    }

    let company_id = next_company_id();
    repository.insert_company(company_from(
        company_id.clone(),
        submission,
        card,
        overall_score,
    ))?;
    repository.link_company(&submission.submission_id, &company_id)?;
    Ok(company_id)
}

fn company_from(
    company_id: CompanyId,
    submission: &SubmissionRecord,
    card: &ScoreCard,
    overall_score: f64,
) -> CompanyRecord {
    let now = Utc::now();
    CompanyRecord {
        company_id,
        submission_id: submission.submission_id.clone(),
        name: submission.draft.startup_name.clone(),
        industry: submission
            .draft
            .industry
            .clone()
            .unwrap_or_else(|| "unspecified".to_string()),
        source: COMPANY_SOURCE.to_string(),
        overall_score,
        report_summary: card.analysis_summary.clone(),
        created_at: now,
        updated_at: now,
    }
}
