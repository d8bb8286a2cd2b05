//! # Lodge Common
//!
//! Shared types, traits, and utilities used across Lodge components.
//!
//! ## Modules
//! - `types` - Wire types and the validation outcome
//! - `error` - Common error types
//! - `constants` - Shared configuration constants
//! - `clock` - Injectable time source
//! - `lockout` - Per-session failed-attempt limiter

pub mod clock;
pub mod constants;
pub mod error;
pub mod lockout;
pub mod types;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::LodgeError;
pub use lockout::{AttemptLimiter, AttemptState, LimiterConfig, LimiterState};
pub use types::*;
