use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::rubric::RubricPrompt;
use crate::config::ModelConfig;

/// Errors raised by the scoring model seam.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model transport error: {0}")]
    Transport(String),
    #[error("model endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("model reply carried no content")]
    EmptyReply,
}

/// Seam between the orchestrator and whichever scorer is configured.
/// Implementations return the raw reply text; parsing and clamping live in
/// the rubric module so every scorer goes through the same path.
#[async_trait]
pub trait ScoreModel: Send + Sync {
    async fn generate(&self, prompt: &RubricPrompt) -> Result<String, ModelError>;

    /// Stable tag stored on evaluation rows for observability.
    fn tag(&self) -> String;
}

/// HTTP client for an OpenAI-style chat-completions endpoint, constrained
/// to JSON output.
pub struct HttpScoreModel {
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpScoreModel {
    pub fn new(endpoint: String, model: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            endpoint,
            model,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Build from configuration; `None` when no credential is present.
    pub fn from_config(config: &ModelConfig) -> Option<Self> {
        config.api_key.as_ref().map(|key| {
            Self::new(
                config.endpoint.clone(),
                config.model.clone(),
                key.clone(),
                config.timeout_secs,
            )
        })
    }
}

#[async_trait]
impl ScoreModel for HttpScoreModel {
    async fn generate(&self, prompt: &RubricPrompt) -> Result<String, ModelError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| ModelError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| ModelError::Transport(err.to_string()))?;

        payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ModelError::EmptyReply)
    }

    fn tag(&self) -> String {
        format!("http:{}", self.model)
    }
}

/// Offline scorer used when no model credential is configured. Scores are
/// drawn from a PRNG seeded by hashing the submission content, so the same
/// content always yields the same scorecard and the rest of the pipeline
/// stays exercisable without a live provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicScoreModel;

#[async_trait]
impl ScoreModel for DeterministicScoreModel {
    async fn generate(&self, prompt: &RubricPrompt) -> Result<String, ModelError> {
        let mut hasher = DefaultHasher::new();
        prompt.user.hash(&mut hasher);
        let mut rng = SeededScores::new(hasher.finish());

        let payload = json!({
            "existence_score": rng.next_score(),
            "market_score": rng.next_score(),
            "solution_score": rng.next_score(),
            "team_score": rng.next_score(),
            "traction_score": rng.next_score(),
            "analysis_summary":
                "Offline heuristic review: scores derived from submission \
                 content without a live model credential.",
            "recommendations":
                "Configure APP_MODEL_API_KEY to obtain a model-backed analysis.",
        });

        Ok(payload.to_string())
    }

    fn tag(&self) -> String {
        "deterministic".to_string()
    }
}

/// Minimal splitmix-style generator; quality does not matter here, only
/// determinism for a given seed.
struct SeededScores {
    state: u64,
}

impl SeededScores {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9e37_79b9_7f4a_7c15,
        }
    }

    fn next_score(&mut self) -> u8 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let span = u64::from(super::rubric::SCORE_MAX - super::rubric::SCORE_MIN) + 1;
        super::rubric::SCORE_MIN + ((self.state >> 33) % span) as u8
    }
}
