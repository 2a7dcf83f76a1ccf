//! Exponential backoff around whole-request transport failures

use crate::config::BackoffPolicy;
use std::fmt::Display;

/// Run `op` until it succeeds or `policy.max_tries` attempts have failed
///
/// Only errors returned by `op` are retried, so callers decide what counts
/// as transient: HTTP error statuses must be returned as `Ok`.
pub fn with_backoff<T, E, F>(policy: &BackoffPolicy, what: &str, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Result<T, E>,
{
    let max_tries = policy.max_tries.max(1);
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_tries => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:.1}s",
                    what,
                    attempt,
                    max_tries,
                    e,
                    delay.as_secs_f64()
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
            Err(e) => {
                log::error!("{} failed after {} attempts: {}", what, attempt, e);
                return Err(e);
            }
        }
    }
}
