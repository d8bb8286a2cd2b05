//! Core types shared across Lodge components.

use serde::{Deserialize, Serialize};

/// Result of checking a submitted code against the pending entry for a subject.
///
/// All four are expected outcomes; infrastructure failures are reported
/// separately through [`crate::LodgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// No pending code for the subject (never issued, consumed, or swept)
    NotFound,
    /// Code differs from the pending one; the entry is kept for a retry
    Mismatch,
    /// Code matched but was past its expiry; the entry was removed
    Expired,
    /// Code matched before expiry; the entry was consumed
    Consumed,
}

impl ValidationOutcome {
    /// Only a consumed code counts as a successful verification
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Consumed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Mismatch => "mismatch",
            Self::Expired => "expired",
            Self::Consumed => "consumed",
        }
    }
}

impl std::fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an issue request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Email address the code is scoped to
    pub email: String,
}

/// Returned once a code has been issued and handed to delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueResponse {
    pub sent: bool,
    /// Expiry timestamp (Unix epoch seconds)
    pub expires_at: i64,
    pub expires_in_secs: u64,
}

/// Body of a validate request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub email: String,
    pub code: String,
}

/// Validation result as seen by callers.
///
/// The specific outcome is deliberately withheld; callers show a generic
/// "invalid code" message on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub success: bool,
}

/// Metrics snapshot for monitoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Codes currently pending in the store
    pub pending_codes: usize,

    /// Codes issued since startup
    pub issued: u64,

    /// Codes successfully redeemed
    pub consumed: u64,

    /// Submissions that did not match the pending code
    pub mismatched: u64,

    /// Matching submissions that arrived after expiry
    pub expired: u64,

    /// Submissions with no pending code
    pub not_found: u64,

    /// Entries removed by the background sweep
    pub swept: u64,
}
