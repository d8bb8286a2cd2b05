//! Client-side verification session with failed-attempt lockout.
//!
//! The limiter gates every submission: while locked the verifier is never
//! called, whatever code is entered. Lockout state lives only in this
//! process and is gone when the session ends.

use anyhow::Result;
use async_trait::async_trait;
use lodge_common::{AttemptLimiter, LimiterState, LodgeError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::countdown::{Countdown, LockoutView};

/// Something that can check a code against the service
#[async_trait]
pub trait CodeVerifier: Send + Sync {
    /// `Ok(true)` only when the code was consumed
    async fn verify(&self, email: &str, code: &str) -> Result<bool>;
}

/// Result of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    Accepted,
    /// Wrong, expired or unknown code; `attempts_left` more failures are
    /// tolerated before the session locks
    Rejected { attempts_left: u32 },
    LockedOut { remaining_secs: u64 },
}

pub struct VerificationSession<V> {
    verifier: V,
    email: String,
    limiter: Arc<Mutex<AttemptLimiter>>,
    countdown: Option<Countdown>,
    tick: Duration,
}

impl<V: CodeVerifier> VerificationSession<V> {
    pub fn new(
        verifier: V,
        email: impl Into<String>,
        limiter: AttemptLimiter,
        tick: Duration,
    ) -> Self {
        Self {
            verifier,
            email: email.into(),
            limiter: Arc::new(Mutex::new(limiter)),
            countdown: None,
            tick,
        }
    }

    fn limiter(&self) -> MutexGuard<'_, AttemptLimiter> {
        self.limiter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LimiterState {
        self.limiter().tick()
    }

    /// Submit a code.
    ///
    /// Transport errors are returned as errors and do not count as failures.
    pub async fn submit(&mut self, code: &str) -> Result<SubmitResult> {
        let gate = self.limiter().check();
        if let Err(LodgeError::LockedOut { remaining_secs }) = gate {
            debug!(remaining_secs, "Submission rejected while locked out");
            return Ok(SubmitResult::LockedOut { remaining_secs });
        }
        gate?;

        if self.verifier.verify(&self.email, code).await? {
            self.limiter().record_success();
            info!("Verification succeeded");
            return Ok(SubmitResult::Accepted);
        }

        let state = self.limiter().record_failure();
        match state {
            LimiterState::Active => {
                let limiter = self.limiter();
                let attempts_left = limiter
                    .config()
                    .max_failures
                    .saturating_sub(limiter.failure_count());
                Ok(SubmitResult::Rejected { attempts_left })
            }
            LimiterState::Locked => {
                let remaining_secs = self.limiter().remaining_secs();
                info!(remaining_secs, "Too many failed attempts, locking session");
                self.start_countdown();
                Ok(SubmitResult::LockedOut { remaining_secs })
            }
        }
    }

    fn start_countdown(&mut self) {
        if let Some(previous) = self.countdown.take() {
            previous.cancel();
        }
        self.countdown = Some(Countdown::start(self.limiter.clone(), self.tick));
    }

    /// Block until the lockout lifts, reporting every countdown update.
    ///
    /// Returns immediately when the session is not locked.
    pub async fn wait_for_unlock(&mut self, mut on_tick: impl FnMut(LockoutView)) {
        let Some(mut countdown) = self.countdown.take() else {
            return;
        };

        let mut rx = countdown.subscribe();
        loop {
            let view = *rx.borrow_and_update();
            on_tick(view);
            if view.state == LimiterState::Active || rx.changed().await.is_err() {
                break;
            }
        }

        countdown.wait().await;
    }

    /// End the session, stopping any countdown and clearing lockout state
    pub fn end(&mut self) {
        self.countdown = None;
        self.limiter().reset();
    }
}
