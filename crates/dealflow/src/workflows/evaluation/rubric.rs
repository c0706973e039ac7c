use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{ScoreCard, SubmissionDraft};

pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 20;
/// Neutral midpoint used when a score field is missing or non-numeric. A
/// single bad field must not void an otherwise-useful analysis.
pub const SCORE_NEUTRAL: u8 = 10;

const CRITERIA: [&str; 5] = [
    "existence_score",
    "market_score",
    "solution_score",
    "team_score",
    "traction_score",
];

/// Rubric bounds applied to every per-criterion score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricConfig {
    pub score_min: u8,
    pub score_max: u8,
    pub neutral_score: u8,
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            score_min: SCORE_MIN,
            score_max: SCORE_MAX,
            neutral_score: SCORE_NEUTRAL,
        }
    }
}

/// System rubric plus the serialized submission, sent as-is to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubricPrompt {
    pub system: String,
    pub user: String,
}

/// Build the fixed evaluation prompt embedding the submission content
/// verbatim. The system message pins the response to a JSON object with
/// the named integer and text fields so parsing stays deterministic.
pub fn build_prompt(draft: &SubmissionDraft, config: &RubricConfig) -> RubricPrompt {
    let system = format!(
        "You are an investment analyst scoring startup pitch submissions. \
         Score each criterion as an integer between {min} and {max}: \
         existence_score (is the problem real and worth solving), \
         market_score (market size and timing), \
         solution_score (product strength and differentiation), \
         team_score (founders' ability to execute), \
         traction_score (evidence of momentum). \
         Respond with a single JSON object containing exactly those five \
         integer fields plus two strings: analysis_summary and \
         recommendations. Do not wrap the JSON in markdown.",
        min = config.score_min,
        max = config.score_max,
    );

    let mut user = format!(
        "Startup: {}\nFounder: {}\nIndustry: {}\n",
        draft.startup_name,
        draft.founder_name,
        draft.industry.as_deref().unwrap_or("unspecified"),
    );
    for (field, value) in draft.content_fields() {
        if !value.is_empty() {
            user.push_str(field);
            user.push_str(": ");
            user.push_str(value);
            user.push('\n');
        }
    }

    RubricPrompt { system, user }
}

/// Raised when the model reply cannot be coerced into a scorecard even
/// after the secondary parse strategies.
#[derive(Debug, thiserror::Error)]
pub enum ScoreParseError {
    #[error("model reply is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("model reply is not a JSON object")]
    NotAnObject,
}

/// Parse a raw model reply into a clamped scorecard. Tries the text as-is,
/// then with markdown code fences stripped, then the outermost brace slice.
pub fn parse_scorecard(raw: &str, config: &RubricConfig) -> Result<ScoreCard, ScoreParseError> {
    let value = parse_json_with_fallbacks(raw)?;
    let object = value.as_object().ok_or(ScoreParseError::NotAnObject)?;

    let mut scores = [config.neutral_score; 5];
    for (slot, field) in scores.iter_mut().zip(CRITERIA) {
        *slot = clamp_score(object.get(field), config);
    }

    let text = |field: &str| {
        object
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let sum: u32 = scores.iter().map(|score| u32::from(*score)).sum();
    let average = sum as f64 / scores.len() as f64;

    Ok(ScoreCard {
        existence_score: scores[0],
        market_score: scores[1],
        solution_score: scores[2],
        team_score: scores[3],
        traction_score: scores[4],
        analysis_summary: text("analysis_summary"),
        recommendations: text("recommendations"),
        overall_average: Some((average * 10.0).round() / 10.0),
    })
}

fn parse_json_with_fallbacks(raw: &str) -> Result<Value, ScoreParseError> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let unfenced = strip_code_fences(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(ScoreParseError::InvalidJson(truncate(trimmed, 160)))
}

fn strip_code_fences(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

fn truncate(raw: &str, limit: usize) -> String {
    if raw.len() <= limit {
        raw.to_string()
    } else {
        let mut cut = limit;
        while !raw.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &raw[..cut])
    }
}

/// Clamp one raw field into the rubric bounds. Numbers (and numeric
/// strings) are rounded and clamped; anything else falls back to the
/// neutral score.
fn clamp_score(value: Option<&Value>, config: &RubricConfig) -> u8 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(number) if number.is_finite() => {
            let rounded = number.round();
            let bounded = rounded
                .max(f64::from(config.score_min))
                .min(f64::from(config.score_max));
            bounded as u8
        }
        _ => config.neutral_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> RubricConfig {
        RubricConfig::default()
    }

    #[test]
    fn parses_clean_json_reply() {
        let raw = json!({
            "existence_score": 17,
            "market_score": 14,
            "solution_score": 12,
            "team_score": 15,
            "traction_score": 8,
            "analysis_summary": "Strong problem, early traction.",
            "recommendations": "Validate pricing with design partners.",
        })
        .to_string();

        let card = parse_scorecard(&raw, &config()).expect("parses");
        assert_eq!(card.scores(), [17, 14, 12, 15, 8]);
        assert_eq!(card.overall_average, Some(13.2));
        assert_eq!(card.analysis_summary, "Strong problem, early traction.");
    }

    #[test]
    fn strips_markdown_fences_before_parsing() {
        let raw = "```json\n{\"existence_score\": 11, \"market_score\": 11, \
                   \"solution_score\": 11, \"team_score\": 11, \"traction_score\": 11, \
                   \"analysis_summary\": \"ok\", \"recommendations\": \"ok\"}\n```";
        let card = parse_scorecard(raw, &config()).expect("parses fenced reply");
        assert_eq!(card.scores(), [11; 5]);
    }

    #[test]
    fn recovers_object_embedded_in_prose() {
        let raw = "Here is the evaluation you asked for:\n{\"existence_score\": 9, \
                   \"market_score\": 9, \"solution_score\": 9, \"team_score\": 9, \
                   \"traction_score\": 9}\nLet me know if you need anything else.";
        let card = parse_scorecard(raw, &config()).expect("parses embedded object");
        assert_eq!(card.scores(), [9; 5]);
    }

    #[test]
    fn clamps_out_of_range_and_defaults_bad_fields() {
        let raw = json!({
            "existence_score": 99,
            "market_score": -4,
            "solution_score": "not a number",
            "traction_score": 12.6,
            "analysis_summary": 42,
        })
        .to_string();

        let card = parse_scorecard(&raw, &config()).expect("parses");
        assert_eq!(card.existence_score, 20);
        assert_eq!(card.market_score, 1);
        assert_eq!(card.solution_score, SCORE_NEUTRAL);
        assert_eq!(card.team_score, SCORE_NEUTRAL);
        assert_eq!(card.traction_score, 13);
        assert_eq!(card.analysis_summary, "");
        for score in card.scores() {
            assert!((SCORE_MIN..=SCORE_MAX).contains(&score));
        }
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let raw = json!({ "existence_score": "17" }).to_string();
        let card = parse_scorecard(&raw, &config()).expect("parses");
        assert_eq!(card.existence_score, 17);
    }

    #[test]
    fn unparsable_reply_is_an_error() {
        let err = parse_scorecard("the startup looks great, ten out of ten", &config())
            .expect_err("free text must not parse");
        assert!(matches!(err, ScoreParseError::InvalidJson(_)));

        let err = parse_scorecard("[1, 2, 3]", &config()).expect_err("arrays rejected");
        assert!(matches!(err, ScoreParseError::NotAnObject));
    }

    #[test]
    fn prompt_embeds_submission_content_verbatim() {
        let draft = SubmissionDraft {
            startup_name: "Acme".to_string(),
            founder_name: "Jordan Vale".to_string(),
            contact_email: "jordan@acme.dev".to_string(),
            problem_statement: "X".to_string(),
            solution: String::new(),
            market: "SMB logistics".to_string(),
            team: String::new(),
            traction: String::new(),
            industry: Some("Logistics".to_string()),
            deck_reference: None,
            auto_analyze: false,
        };

        let prompt = build_prompt(&draft, &config());
        assert!(prompt.system.contains("between 1 and 20"));
        assert!(prompt.user.contains("Startup: Acme"));
        assert!(prompt.user.contains("problem_statement: X"));
        assert!(prompt.user.contains("market: SMB logistics"));
        assert!(!prompt.user.contains("solution:"));
    }
}
