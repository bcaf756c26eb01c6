// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSnapshot {
	/// Exchanges sent to the provider, retries included.
	pub attempts: u64,
	/// Refresh passes that ended with a persisted record.
	pub successes: u64,
	/// Refresh passes that exhausted their retries or failed to persist.
	pub failures: u64,
}

/// Per-session refresh counters.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	exchanges: AtomicU64,
	refreshed: AtomicU64,
	failed: AtomicU64,
}
impl RefreshMetrics {
	/// Reads all counters.
	pub fn snapshot(&self) -> RefreshSnapshot {
		RefreshSnapshot {
			attempts: self.attempts(),
			successes: self.refreshed.load(Ordering::Relaxed),
			failures: self.failed.load(Ordering::Relaxed),
		}
	}

	/// Exchanges sent so far.
	pub fn attempts(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_pass<T, E>(&self, result: &Result<T, E>) {
		let counter = if result.is_ok() { &self.refreshed } else { &self.failed };

		counter.fetch_add(1, Ordering::Relaxed);
	}
}
