//! Verification code issuance.

use chrono::{DateTime, Duration, Utc};
use lodge_common::constants::{CODE_LENGTH, CODE_MAX, CODE_MIN};
use lodge_common::{LodgeError, SharedClock};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::{VerificationEntry, VerificationStats, VerificationStore, fingerprint};

/// A freshly issued code, ready to hand to a delivery channel
#[derive(Clone)]
pub struct IssuedCode {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedCode {
    /// Seconds of validity left, as of `now`
    pub fn expires_in_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}

/// Generate a uniformly random six-digit code in `[100000, 999999]`
pub fn generate_code() -> String {
    let value = rand::rng().random_range(CODE_MIN..=CODE_MAX);
    format!("{:0width$}", value, width = CODE_LENGTH)
}

/// Issues codes and records them in the store
pub struct CodeIssuer {
    store: Arc<VerificationStore>,
    clock: SharedClock,
    stats: Arc<VerificationStats>,
    /// Validity applied by [`issue`](Self::issue)
    default_ttl: Duration,
}

impl CodeIssuer {
    pub fn new(
        store: Arc<VerificationStore>,
        clock: SharedClock,
        stats: Arc<VerificationStats>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            stats,
            default_ttl,
        }
    }

    /// Issue a code for `subject` with the configured validity
    pub fn issue(&self, subject: &str) -> Result<IssuedCode, LodgeError> {
        self.issue_with_expiry(subject, self.default_ttl)
    }

    /// Issue a code for `subject`, valid for `expiry`.
    ///
    /// Any code still pending for the subject is replaced.
    pub fn issue_with_expiry(
        &self,
        subject: &str,
        expiry: Duration,
    ) -> Result<IssuedCode, LodgeError> {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(expiry).ok_or_else(|| {
            LodgeError::Internal(format!("code expiry of {}s is out of range", expiry.num_seconds()))
        })?;
        let issued = IssuedCode {
            code: generate_code(),
            issued_at: now,
            expires_at,
        };

        let replaced = self.store.put(VerificationEntry {
            subject_key: subject.to_string(),
            code: issued.code.clone(),
            issued_at: issued.issued_at,
            expires_at: issued.expires_at,
        })?;

        self.stats.issued.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            subject = %fingerprint(subject),
            expires_at = %issued.expires_at,
            replaced = replaced.is_some(),
            "Issued verification code"
        );

        Ok(issued)
    }
}
