//! Submission intake, AI-assisted scoring, company materialization, and
//! status fanout for the dealflow evaluation pipeline.
//!
//! Data flows one direction: intake persists a pending submission, the
//! orchestrator claims it, scores it through a [`model::ScoreModel`], the
//! materializer creates or refreshes the durable company record, and every
//! status transition is published on the status feed. Push delivery is best
//! effort; the list/snapshot endpoints are the polling fallback.

pub mod domain;
pub mod intake;
pub mod materializer;
pub mod model;
pub mod repository;
pub mod router;
pub mod rubric;
pub mod service;

pub use domain::{
    AnalysisResult, AnalysisStatus, CompanyId, CompanyRecord, EvaluationId, EvaluationRecord,
    ScoreCard, SubmissionDraft, SubmissionId, SubmissionRecord, SubmissionStatusView,
};
pub use intake::{IntakeGuard, IntakeViolation};
pub use materializer::materialize_company;
pub use model::{DeterministicScoreModel, HttpScoreModel, ModelError, ScoreModel};
pub use repository::{
    ClaimOutcome, DealflowRepository, FeedError, RepositoryError, StatusEvent, StatusFeed,
    StatusPublisher,
};
pub use router::evaluation_router;
pub use rubric::{RubricConfig, RubricPrompt, ScoreParseError};
pub use service::{EvaluateOutcome, EvaluationOrchestrator, OrchestratorError};
