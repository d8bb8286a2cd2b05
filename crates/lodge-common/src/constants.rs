//! Shared constants for Lodge components.

/// Default Lodge HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8888";

/// Default server URL used by the client
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8888";

/// Number of digits in a verification code
pub const CODE_LENGTH: usize = 6;

/// Smallest code value (inclusive); keeps every code at six digits
pub const CODE_MIN: u32 = 100_000;

/// Largest code value (inclusive)
pub const CODE_MAX: u32 = 999_999;

/// Verification code validity (5 minutes)
pub const CODE_TTL_SECS: u64 = 300;

/// Longest code validity the service accepts (one day)
pub const MAX_CODE_TTL_SECS: u64 = 86_400;

/// Interval between expired-code sweeps
pub const SWEEP_INTERVAL_SECS: u64 = 60;

/// Number of independently locked store shards
pub const STORE_SHARDS: usize = 16;

/// Failures tolerated before a session locks (the next one locks it)
pub const MAX_FAILED_ATTEMPTS: u32 = 3;

/// Lockout duration in seconds
pub const LOCKOUT_DURATION_SECS: u64 = 60;

/// Longest lockout a session accepts (one day)
pub const MAX_LOCKOUT_SECS: u64 = 86_400;

/// Lockout countdown refresh interval
pub const LOCKOUT_TICK_SECS: u64 = 1;

/// HTTP routes exposed by the service
pub mod routes {
    /// Issue a code: POST
    pub const ISSUE: &str = "/verification/codes";

    /// Validate a code: POST
    pub const VALIDATE: &str = "/verification/validate";
}
