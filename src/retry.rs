//! Bounded retries with exponential backoff.
//!
//! The retrier does not classify failures: every error from the operation is retried the same
//! way. Callers filter out non-retryable conditions before entering the loop.

// self
use crate::{_prelude::*, obs};

/// Retry policy: one initial attempt plus up to `max_retries` retries.
///
/// The delay before retry `k` (1-indexed) is `base_delay * 2^(k-1)`, so the defaults sleep
/// 1s, 2s, then 4s across four total attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
	/// Retries performed after the initial attempt.
	pub max_retries: u32,
	/// Delay before the first retry.
	pub base_delay: StdDuration,
}
impl Backoff {
	/// Default number of retries after the initial attempt.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default delay before the first retry.
	pub const DEFAULT_BASE_DELAY: StdDuration = StdDuration::from_secs(1);

	/// Creates a policy with explicit bounds.
	pub const fn new(max_retries: u32, base_delay: StdDuration) -> Self {
		Self { max_retries, base_delay }
	}

	/// Total number of attempts, including the first.
	pub const fn max_attempts(&self) -> u32 {
		self.max_retries.saturating_add(1)
	}

	/// Delay slept before retry `retry` (1-indexed).
	pub fn delay_for(&self, retry: u32) -> StdDuration {
		let factor = 1_u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);

		self.base_delay.saturating_mul(factor)
	}

	/// Runs `operation` until it succeeds or the attempts are exhausted.
	///
	/// The closure receives the 1-indexed attempt number. Attempts run strictly one after
	/// another; the last observed error is returned inside [`RetryError`].
	pub async fn retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
	where
		E: StdError + 'static,
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let mut attempt = 1;

		loop {
			match operation(attempt).await {
				Ok(value) => return Ok(value),
				Err(source) if attempt >= self.max_attempts() =>
					return Err(RetryError { attempts: attempt, source }),
				Err(_) => {
					let delay = self.delay_for(attempt);

					obs::event!(
						debug,
						attempt,
						delay_ms = delay.as_millis() as u64,
						"Attempt failed; retrying after backoff."
					);

					tokio::time::sleep(delay).await;

					attempt += 1;
				},
			}
		}
	}
}
impl Default for Backoff {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_BASE_DELAY)
	}
}

/// Returned when every attempt failed.
#[derive(Debug, ThisError)]
#[error("Operation failed after {attempts} attempts.")]
pub struct RetryError<E>
where
	E: StdError + 'static,
{
	/// Number of attempts performed.
	pub attempts: u32,
	/// Error reported by the final attempt.
	#[source]
	pub source: E,
}
