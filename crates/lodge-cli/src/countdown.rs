//! Lockout countdown task.
//!
//! Re-evaluates the limiter on a fixed tick and publishes the remaining time
//! until the lockout lifts. The task owns a cancellation token; dropping the
//! [`Countdown`] cancels it, so a session that starts a new lockout or ends
//! never leaves a stale timer running.

use lodge_common::{AttemptLimiter, LimiterState};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What the prompt shows while locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutView {
    pub state: LimiterState,
    pub remaining_secs: u64,
}

pub struct Countdown {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    view: watch::Receiver<LockoutView>,
}

impl Countdown {
    /// Spawn a countdown over `limiter`, ticking every `tick`
    pub fn start(limiter: Arc<Mutex<AttemptLimiter>>, tick: Duration) -> Self {
        let token = CancellationToken::new();
        let (tx, view) = watch::channel(observe(&limiter));
        let handle = tokio::spawn(run(limiter, tick, tx, token.clone()));

        Self {
            token,
            handle: Some(handle),
            view,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LockoutView> {
        self.view.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the task to stop (lockout lifted or cancelled)
    pub async fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Lockout countdown task failed");
            }
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn observe(limiter: &Mutex<AttemptLimiter>) -> LockoutView {
    let mut limiter = limiter.lock().unwrap_or_else(PoisonError::into_inner);
    let state = limiter.tick();
    LockoutView {
        state,
        remaining_secs: limiter.remaining_secs(),
    }
}

async fn run(
    limiter: Arc<Mutex<AttemptLimiter>>,
    tick: Duration,
    tx: watch::Sender<LockoutView>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                debug!("Lockout countdown cancelled");
                break;
            }
            _ = ticker.tick() => {
                let view = observe(&limiter);
                tx.send_replace(view);
                if view.state == LimiterState::Active {
                    debug!("Lockout lifted");
                    break;
                }
            }
        }
    }
}
