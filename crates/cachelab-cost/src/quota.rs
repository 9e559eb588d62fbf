//! Tokens-per-minute (TPM) quota accounting.
//!
//! Bedrock charges quota for output tokens at a burndown multiple. At
//! request start the full `max_tokens` is reserved; once the request
//! completes, actual consumption is settled.

use serde::{Deserialize, Serialize};

/// Output burndown rate for Claude Sonnet 4.5 and newer.
pub const OUTPUT_BURNDOWN_RATE: i64 = 5;

/// Quota reserved when a request starts: `input + max_tokens * burndown`.
pub fn tpm_reservation(input_tokens: i64, max_tokens: i64, burndown_rate: i64) -> i64 {
    input_tokens + max_tokens * burndown_rate
}

/// Quota consumed once a request completes: `input + cache_write + output * burndown`.
///
/// Cache reads do not count against TPM.
pub fn tpm_actual(
    input_tokens: i64,
    output_tokens: i64,
    cache_write_tokens: i64,
    burndown_rate: i64,
) -> i64 {
    input_tokens + cache_write_tokens + output_tokens * burndown_rate
}

/// Reservation vs. settled quota for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpmUsage {
    pub reserved: i64,
    pub actual: i64,
}

impl TpmUsage {
    pub fn new(
        input_tokens: i64,
        max_tokens: i64,
        output_tokens: i64,
        cache_write_tokens: i64,
        burndown_rate: i64,
    ) -> Self {
        Self {
            reserved: tpm_reservation(input_tokens, max_tokens, burndown_rate),
            actual: tpm_actual(input_tokens, output_tokens, cache_write_tokens, burndown_rate),
        }
    }

    /// Quota reserved but not consumed.
    pub fn released(&self) -> i64 {
        self.reserved - self.actual
    }
}
