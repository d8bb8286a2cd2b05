//! Hand-off of issued codes to a delivery channel.
//!
//! Lodge does not send email itself. A [`CodeSink`] receives each issued code
//! and is responsible for getting it to the guest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lodge_common::LodgeError;

use crate::verification::fingerprint;

/// Destination for issued codes
#[async_trait]
pub trait CodeSink: Send + Sync {
    /// Deliver `code` to `subject`
    async fn deliver(
        &self,
        subject: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), LodgeError>;
}

/// Development sink: writes the code to the debug log instead of sending it
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl CodeSink for LogSink {
    async fn deliver(
        &self,
        subject: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), LodgeError> {
        tracing::info!(
            subject = %fingerprint(subject),
            expires_at = %expires_at,
            "📨 Verification code ready for delivery"
        );
        // The code redeems the subject's verification; keep it out of normal logs
        tracing::debug!(subject = %fingerprint(subject), code = %code, "Verification code");
        Ok(())
    }
}
