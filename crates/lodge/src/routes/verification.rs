//! Code issuance and validation endpoints.

use axum::{Json, extract::State};
use lodge_common::{IssueRequest, IssueResponse, ValidateRequest, ValidateResponse};

use super::ApiError;
use crate::state::AppState;
use crate::verification::{fingerprint, normalize_subject};

/// Issue a code for an email and hand it to the delivery sink.
///
/// Delivery problems are logged, not reported: the guest can ask for a new
/// code, and the response must not reveal anything about the address.
pub async fn issue_code(
    State(state): State<AppState>,
    Json(payload): Json<IssueRequest>,
) -> Result<Json<IssueResponse>, ApiError> {
    let subject = normalize_subject(&payload.email)?;
    let issued = state.issuer.issue(&subject)?;

    if let Err(e) = state
        .sink
        .deliver(&subject, &issued.code, issued.expires_at)
        .await
    {
        tracing::warn!(
            subject = %fingerprint(&subject),
            error = %e,
            "Verification code delivery failed"
        );
    }

    Ok(Json(IssueResponse {
        sent: true,
        expires_at: issued.expires_at.timestamp(),
        expires_in_secs: issued.expires_in_secs(issued.issued_at),
    }))
}

/// Check a submitted code. Only success or failure is disclosed.
pub async fn validate_code(
    State(state): State<AppState>,
    Json(payload): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let subject = normalize_subject(&payload.email)?;
    let outcome = state.validator.validate(&subject, payload.code.trim())?;

    if !outcome.is_success() {
        tracing::info!(
            subject = %fingerprint(&subject),
            outcome = %outcome,
            "Verification code rejected"
        );
    }

    Ok(Json(ValidateResponse {
        success: outcome.is_success(),
    }))
}
