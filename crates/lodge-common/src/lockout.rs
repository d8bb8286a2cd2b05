//! Per-session failed-attempt lockout.
//!
//! State machine with two states:
//! ```text
//!            failure (count <= max)
//!              ┌──────┐
//!              ▼      │
//!           ACTIVE ───┘ ── failure (count > max) ──► LOCKED
//!              ▲                                       │
//!              └──── deadline reached (count = 0) ─────┘
//! ```
//! Remaining lockout time is always derived from the absolute deadline, so a
//! late or skipped tick never desynchronizes the countdown.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::SharedClock;
use crate::constants::{LOCKOUT_DURATION_SECS, MAX_FAILED_ATTEMPTS, MAX_LOCKOUT_SECS};
use crate::error::LodgeError;

/// Lockout state of a verification session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimiterState {
    /// Submissions allowed
    Active,
    /// Submissions rejected until the deadline passes
    Locked,
}

/// Failure bookkeeping for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptState {
    pub failure_count: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Lockout tuning
#[derive(Debug, Clone, Copy)]
pub struct LimiterConfig {
    /// Failures tolerated; the next failure locks the session
    pub max_failures: u32,
    /// How long a lockout lasts
    pub lockout: Duration,
}

impl LimiterConfig {
    /// Build a config from a lockout length in seconds, rejecting lengths
    /// outside `1..=MAX_LOCKOUT_SECS`
    pub fn from_secs(max_failures: u32, lockout_secs: u64) -> Result<Self, LodgeError> {
        if !(1..=MAX_LOCKOUT_SECS).contains(&lockout_secs) {
            return Err(LodgeError::Config(format!(
                "lockout must be between 1 and {MAX_LOCKOUT_SECS} seconds, got {lockout_secs}"
            )));
        }
        let lockout = i64::try_from(lockout_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| LodgeError::Config(format!("lockout of {lockout_secs}s is out of range")))?;

        Ok(Self {
            max_failures,
            lockout,
        })
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_failures: MAX_FAILED_ATTEMPTS,
            lockout: Duration::seconds(LOCKOUT_DURATION_SECS as i64),
        }
    }
}

/// Counts consecutive failures and enforces a timed lockout
#[derive(Debug)]
pub struct AttemptLimiter {
    config: LimiterConfig,
    clock: SharedClock,
    state: AttemptState,
}

impl AttemptLimiter {
    pub fn new(config: LimiterConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            state: AttemptState::default(),
        }
    }

    pub fn with_defaults(clock: SharedClock) -> Self {
        Self::new(LimiterConfig::default(), clock)
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Current bookkeeping, without advancing the state machine
    pub fn attempt_state(&self) -> AttemptState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.state.failure_count
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.state.locked_until
    }

    /// State as of the last transition; call [`tick`](Self::tick) to expire
    /// a finished lockout first.
    pub fn state(&self) -> LimiterState {
        if self.state.locked_until.is_some() {
            LimiterState::Locked
        } else {
            LimiterState::Active
        }
    }

    /// `max(0, deadline - now)`, or zero when not locked
    pub fn remaining(&self) -> Duration {
        match self.state.locked_until {
            Some(deadline) => (deadline - self.clock.now()).max(Duration::zero()),
            None => Duration::zero(),
        }
    }

    /// Remaining lockout in whole seconds, rounded up for display
    pub fn remaining_secs(&self) -> u64 {
        let millis = self.remaining().num_milliseconds().max(0) as u64;
        millis.div_ceil(1000)
    }

    /// Recompute the lockout against the clock.
    ///
    /// Leaves `Locked` once the deadline has passed, clearing the failure
    /// count.
    pub fn tick(&mut self) -> LimiterState {
        if let Some(deadline) = self.state.locked_until {
            if self.clock.now() >= deadline {
                self.state = AttemptState::default();
            }
        }
        self.state()
    }

    /// Gate a submission. Fails with [`LodgeError::LockedOut`] while locked,
    /// whatever the code being submitted.
    pub fn check(&mut self) -> Result<(), LodgeError> {
        match self.tick() {
            LimiterState::Active => Ok(()),
            LimiterState::Locked => Err(LodgeError::LockedOut {
                remaining_secs: self.remaining_secs(),
            }),
        }
    }

    /// Record a failed validation.
    ///
    /// Failures reported while locked are ignored; input is disabled then.
    pub fn record_failure(&mut self) -> LimiterState {
        if self.tick() == LimiterState::Locked {
            return LimiterState::Locked;
        }

        self.state.failure_count += 1;
        if self.state.failure_count > self.config.max_failures {
            let deadline = self
                .clock
                .now()
                .checked_add_signed(self.config.lockout)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            self.state.locked_until = Some(deadline);
        }

        self.state()
    }

    /// Record a successful validation.
    ///
    /// Clears the failure count but never lifts a lockout early.
    pub fn record_success(&mut self) {
        self.state.failure_count = 0;
    }

    /// Return to the initial state (session ended)
    pub fn reset(&mut self) {
        self.state = AttemptState::default();
    }
}
