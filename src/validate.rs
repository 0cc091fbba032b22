use once_cell::sync::Lazy;
use regex::Regex;

static USER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{15,20}$").expect("static user id pattern"));

pub const CONFIRMATION_LITERAL: &str = "CONFIRM";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid user id: expected 15-20 digits")]
    InvalidUserId,
    #[error("reason must be at least {min} characters long")]
    ReasonTooShort { min: usize },
    #[error("evidence link is required")]
    MissingEvidence,
    #[error("evidence link must be at least {min} characters long")]
    EvidenceTooShort { min: usize },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("type CONFIRM to confirm this action")]
    ConfirmationRequired,
    #[error("webhook url must be an http(s) url")]
    InvalidUrl,
}

pub fn user_id(raw: &str) -> Result<&str, ValidationError> {
    if USER_ID_RE.is_match(raw) {
        Ok(raw)
    } else {
        Err(ValidationError::InvalidUserId)
    }
}

pub fn reason(raw: &str, min: usize) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() < min {
        return Err(ValidationError::ReasonTooShort { min });
    }
    Ok(trimmed.to_string())
}

/// Optional proof on the direct flow; blank input means "no proof".
pub fn optional_proof(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string)
}

/// Mandatory evidence on the staff flow.
pub fn evidence(raw: &str, min: usize) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingEvidence);
    }
    if trimmed.chars().count() < min {
        return Err(ValidationError::EvidenceTooShort { min });
    }
    Ok(trimmed.to_string())
}

pub fn required(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn confirmation(token: &str) -> Result<(), ValidationError> {
    if token == CONFIRMATION_LITERAL {
        Ok(())
    } else {
        Err(ValidationError::ConfirmationRequired)
    }
}

pub fn webhook_url(raw: &str) -> Result<String, ValidationError> {
    let url = reqwest::Url::parse(raw.trim()).map_err(|_| ValidationError::InvalidUrl)?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url.to_string()),
        _ => Err(ValidationError::InvalidUrl),
    }
}
