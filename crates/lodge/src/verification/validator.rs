//! Verification code validation.

use constant_time_eq::constant_time_eq;
use lodge_common::{LodgeError, SharedClock, ValidationOutcome};
use std::sync::Arc;

use super::{EntryAction, VerificationStats, VerificationStore, fingerprint};

/// Checks submitted codes against the store
pub struct CodeValidator {
    store: Arc<VerificationStore>,
    clock: SharedClock,
    stats: Arc<VerificationStats>,
}

impl CodeValidator {
    pub fn new(
        store: Arc<VerificationStore>,
        clock: SharedClock,
        stats: Arc<VerificationStats>,
    ) -> Self {
        Self {
            store,
            clock,
            stats,
        }
    }

    /// Validate `submitted` against the code pending for `subject`.
    ///
    /// Checks run in order under the subject's lock:
    /// 1. no entry: `NotFound`
    /// 2. code differs: `Mismatch`, entry kept so the guest can retry
    /// 3. past expiry: entry removed, `Expired`
    /// 4. otherwise: entry removed, `Consumed`
    ///
    /// Only store failures are errors.
    pub fn validate(
        &self,
        subject: &str,
        submitted: &str,
    ) -> Result<ValidationOutcome, LodgeError> {
        let now = self.clock.now();

        let outcome = self.store.inspect(subject, |entry| match entry {
            None => (ValidationOutcome::NotFound, EntryAction::Keep),
            Some(entry) if !constant_time_eq(entry.code.as_bytes(), submitted.as_bytes()) => {
                (ValidationOutcome::Mismatch, EntryAction::Keep)
            }
            Some(entry) if entry.is_expired_at(now) => {
                (ValidationOutcome::Expired, EntryAction::Remove)
            }
            Some(_) => (ValidationOutcome::Consumed, EntryAction::Remove),
        })?;

        self.stats.record_outcome(outcome);

        tracing::debug!(
            subject = %fingerprint(subject),
            outcome = %outcome,
            "Validated verification code"
        );

        Ok(outcome)
    }
}
