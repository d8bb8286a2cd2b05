//! Application state and shared resources.

use lodge_common::{LodgeError, MetricsSnapshot, SharedClock, SystemClock};
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::delivery::CodeSink;
use crate::verification::{CodeIssuer, CodeValidator, VerificationStats, VerificationStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Time source shared by issuance, validation and sweeping
    pub clock: SharedClock,

    /// Pending verification codes
    pub store: Arc<VerificationStore>,

    /// Code issuer
    pub issuer: Arc<CodeIssuer>,

    /// Code validator
    pub validator: Arc<CodeValidator>,

    /// Delivery channel for issued codes
    pub sink: Arc<dyn CodeSink>,

    /// Runtime counters
    pub stats: Arc<VerificationStats>,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Create application state on the system clock
    pub fn new(config: AppConfig, sink: Arc<dyn CodeSink>) -> Result<Self, LodgeError> {
        Self::with_clock(config, sink, Arc::new(SystemClock))
    }

    /// Create application state on an explicit clock
    pub fn with_clock(
        config: AppConfig,
        sink: Arc<dyn CodeSink>,
        clock: SharedClock,
    ) -> Result<Self, LodgeError> {
        let code_ttl = config.verification.code_ttl()?;
        let store = Arc::new(VerificationStore::new(config.verification.shards));
        let stats = Arc::new(VerificationStats::default());

        let issuer = Arc::new(CodeIssuer::new(
            store.clone(),
            clock.clone(),
            stats.clone(),
            code_ttl,
        ));
        let validator = Arc::new(CodeValidator::new(store.clone(), clock.clone(), stats.clone()));

        Ok(Self {
            config,
            clock,
            store,
            issuer,
            validator,
            sink,
            stats,
            started_at: Instant::now(),
        })
    }

    /// Current counters plus the pending-code count
    pub fn metrics(&self) -> Result<MetricsSnapshot, LodgeError> {
        Ok(self.stats.snapshot(self.store.len()?))
    }
}
