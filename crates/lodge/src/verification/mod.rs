//! Email verification codes.
//!
//! Codes are issued per subject (a normalized email address), held in an
//! in-memory sharded store, checked and consumed by the validator, and
//! evicted by a background sweeper once expired. Nothing here survives a
//! process restart.

mod issuer;
mod store;
mod subject;
mod sweeper;
mod validator;

pub use issuer::CodeIssuer;
pub use store::{EntryAction, VerificationStore};
pub use subject::{fingerprint, normalize_subject};
pub use sweeper::sweeper_worker;
pub use validator::CodeValidator;

use chrono::{DateTime, Utc};
use lodge_common::{MetricsSnapshot, ValidationOutcome};
use std::sync::atomic::{AtomicU64, Ordering};

/// The pending code for one subject
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationEntry {
    /// Normalized subject (email) the code is scoped to
    pub subject_key: String,
    /// Six-digit numeric code
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationEntry {
    /// True once `now` is strictly past the expiry
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl std::fmt::Debug for VerificationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationEntry")
            .field("subject", &fingerprint(&self.subject_key))
            .field("code", &"******")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Runtime counters
#[derive(Default)]
pub struct VerificationStats {
    pub issued: AtomicU64,
    pub consumed: AtomicU64,
    pub mismatched: AtomicU64,
    pub expired: AtomicU64,
    pub not_found: AtomicU64,
    pub swept: AtomicU64,
}

impl VerificationStats {
    pub fn record_outcome(&self, outcome: ValidationOutcome) {
        let counter = match outcome {
            ValidationOutcome::Consumed => &self.consumed,
            ValidationOutcome::Mismatch => &self.mismatched,
            ValidationOutcome::Expired => &self.expired,
            ValidationOutcome::NotFound => &self.not_found,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get statistics snapshot
    pub fn snapshot(&self, pending_codes: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            pending_codes,
            issued: self.issued.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            mismatched: self.mismatched.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }
}
