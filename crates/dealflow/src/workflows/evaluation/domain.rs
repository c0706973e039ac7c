use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted pitches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

/// Identifier wrapper for materialized companies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

/// Identifier wrapper for individual evaluation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

/// Applicant-supplied intake form. Content fields are free text; the guard
/// in [`super::intake`] requires at least one of them to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub startup_name: String,
    #[serde(default)]
    pub founder_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub problem_statement: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub traction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_reference: Option<String>,
    /// When set, intake schedules the orchestrator fire-and-forget instead
    /// of waiting for an explicit evaluate trigger.
    #[serde(default)]
    pub auto_analyze: bool,
}

impl SubmissionDraft {
    /// Content fields in rubric order.
    pub fn content_fields(&self) -> [(&'static str, &str); 5] {
        [
            ("problem_statement", self.problem_statement.as_str()),
            ("solution", self.solution.as_str()),
            ("market", self.market.as_str()),
            ("team", self.team.as_str()),
            ("traction", self.traction.as_str()),
        ]
    }
}

/// Analysis lifecycle tracked on every submission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    /// Only `pending` and `failed` rows may start a new orchestrator run.
    pub const fn can_trigger(self) -> bool {
        matches!(self, AnalysisStatus::Pending | AnalysisStatus::Failed)
    }
}

/// Structured scoring output for one evaluation run. Every score lies in
/// the closed interval [`super::rubric::SCORE_MIN`, `super::rubric::SCORE_MAX`];
/// out-of-range or non-numeric model output is clamped, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub existence_score: u8,
    pub market_score: u8,
    pub solution_score: u8,
    pub team_score: u8,
    pub traction_score: u8,
    pub analysis_summary: String,
    pub recommendations: String,
    pub overall_average: Option<f64>,
}

impl ScoreCard {
    pub fn scores(&self) -> [u8; 5] {
        [
            self.existence_score,
            self.market_score,
            self.solution_score,
            self.team_score,
            self.traction_score,
        ]
    }
}

/// Versioned wrapper around the stored analysis payload so historical rows
/// keep deserializing as the scorecard shape evolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum AnalysisResult {
    #[serde(rename = "v1")]
    V1(ScoreCard),
}

impl AnalysisResult {
    pub fn scorecard(&self) -> &ScoreCard {
        match self {
            AnalysisResult::V1(card) => card,
        }
    }
}

/// Repository record for one submission. Never deleted; retained as the
/// audit trail even after the company is materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub submission_id: SubmissionId,
    pub draft: SubmissionDraft,
    pub status: AnalysisStatus,
    pub analysis_result: Option<AnalysisResult>,
    pub failure_reason: Option<String>,
    pub company_id: Option<CompanyId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn status_view(&self) -> SubmissionStatusView {
        SubmissionStatusView {
            submission_id: self.submission_id.clone(),
            startup_name: self.draft.startup_name.clone(),
            status: self.status.label(),
            overall_average: self
                .analysis_result
                .as_ref()
                .and_then(|result| result.scorecard().overall_average),
            company_id: self.company_id.clone(),
            failure_reason: self.failure_reason.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Sanitized snapshot exposed to polling clients.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStatusView {
    pub submission_id: SubmissionId,
    pub startup_name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only history row for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub evaluation_id: EvaluationId,
    pub submission_id: SubmissionId,
    pub scorecard: ScoreCard,
    /// Which scorer produced the card, e.g. `http:gpt-4o-mini` or
    /// `deterministic`.
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// Durable entity surfaced to dashboards after the first successful
/// evaluation. At most one per submission; `overall_score` always mirrors
/// the most recent completed evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_id: CompanyId,
    pub submission_id: SubmissionId,
    pub name: String,
    pub industry: String,
    pub source: String,
    pub overall_score: f64,
    pub report_summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
