use super::domain::SubmissionDraft;

/// Validation errors raised by the intake guard. Violations are surfaced
/// synchronously and no submission row is created.
#[derive(Debug, thiserror::Error)]
pub enum IntakeViolation {
    #[error("startup name is required")]
    MissingStartupName,
    #[error("contact email is required")]
    MissingContactEmail,
    #[error("contact email '{0}' is not a deliverable address")]
    MalformedContactEmail(String),
    #[error("at least one content field (problem_statement, solution, market, team, traction) is required")]
    EmptyContent,
}

/// Synchronous intake validation. Rejects malformed drafts before any row
/// is written and normalizes surrounding whitespace on accepted ones.
#[derive(Debug, Default, Clone)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn sanitize(&self, draft: SubmissionDraft) -> Result<SubmissionDraft, IntakeViolation> {
        let draft = trim_draft(draft);

        if draft.startup_name.is_empty() {
            return Err(IntakeViolation::MissingStartupName);
        }
        if draft.contact_email.is_empty() {
            return Err(IntakeViolation::MissingContactEmail);
        }
        if !email_is_plausible(&draft.contact_email) {
            return Err(IntakeViolation::MalformedContactEmail(
                draft.contact_email.clone(),
            ));
        }
        if draft
            .content_fields()
            .iter()
            .all(|(_, value)| value.is_empty())
        {
            return Err(IntakeViolation::EmptyContent);
        }

        Ok(draft)
    }
}

fn trim_draft(mut draft: SubmissionDraft) -> SubmissionDraft {
    let trim = |value: &mut String| {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    };

    trim(&mut draft.startup_name);
    trim(&mut draft.founder_name);
    trim(&mut draft.contact_email);
    trim(&mut draft.problem_statement);
    trim(&mut draft.solution);
    trim(&mut draft.market);
    trim(&mut draft.team);
    trim(&mut draft.traction);

    draft.industry = draft
        .industry
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    draft.deck_reference = draft
        .deck_reference
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    draft
}

/// Lightweight deliverability check: non-empty local and domain parts
/// around a single `@`, no embedded whitespace.
fn email_is_plausible(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
