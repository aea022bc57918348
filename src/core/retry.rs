// Bounded retry loop: retries grouped into rounds, each extra round gated by the user

use crate::error::{AvError, Result};

/// Rounds used by the direct HTTP download flow
pub const DIRECT_MAX_ROUNDS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_rounds: u32,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 3)
    }
}

impl RetryPolicy {
    /// Zero values are clamped to one so at least one attempt is made
    pub fn new(max_rounds: u32, max_retries: u32) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            max_retries: max_retries.max(1),
        }
    }

    pub fn direct() -> Self {
        Self::new(DIRECT_MAX_ROUNDS, 3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded { round: u32, retry: u32 },
    /// User chose not to start another round
    Declined { round: u32 },
    /// Every round failed
    Exhausted { rounds: u32 },
}

impl RetryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }
}

/// The side effects of a download attempt cycle
pub trait RoundDriver {
    fn attempt(&mut self, round: u32, retry: u32) -> Result<()>;

    /// Called when the first retry of a round reports an unavailable format.
    /// Returns `Ok(true)` when a replacement format was chosen and downloaded.
    fn recover_format(&mut self, _error: &AvError) -> Result<bool> {
        Ok(false)
    }

    /// Asked after a failed round that is not the last one
    fn continue_after_round(&mut self, round: u32) -> Result<bool>;
}

/// Runs `driver` under `policy`
///
/// Errors from individual attempts are logged and retried. `AvError::Cancelled` ends the
/// loop immediately and is returned to the caller, as are errors from the round prompt.
pub fn run_rounds<D: RoundDriver + ?Sized>(
    policy: RetryPolicy,
    driver: &mut D,
) -> Result<RetryOutcome> {
    for round in 1..=policy.max_rounds {
        for retry in 1..=policy.max_retries {
            log::debug!(
                "round {}/{}, attempt {}/{}",
                round,
                policy.max_rounds,
                retry,
                policy.max_retries
            );

            let error = match driver.attempt(round, retry) {
                Ok(()) => return Ok(RetryOutcome::Succeeded { round, retry }),
                Err(AvError::Cancelled) => return Err(AvError::Cancelled),
                Err(e) => e,
            };

            if retry == 1 && error.is_format_unavailable() {
                match driver.recover_format(&error) {
                    Ok(true) => return Ok(RetryOutcome::Succeeded { round, retry }),
                    Ok(false) => {}
                    Err(AvError::Cancelled) => return Err(AvError::Cancelled),
                    Err(e) => log::warn!("Format recovery failed: {}", e),
                }
            }

            log::warn!("Attempt {} of round {} failed: {}", retry, round, error);
        }

        if round < policy.max_rounds && !driver.continue_after_round(round)? {
            return Ok(RetryOutcome::Declined { round });
        }
    }

    Ok(RetryOutcome::Exhausted {
        rounds: policy.max_rounds,
    })
}
