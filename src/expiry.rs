//! Expiry policy and the clock it is evaluated against.

// self
use crate::_prelude::*;

/// Safety margin applied before an access token's real expiry.
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::minutes(5);

/// Source of the current instant, injectable for tests.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Decides whether a token expiring at `expiry` is unusable at `now`.
///
/// An unknown expiry counts as expired; otherwise the token is expired once
/// `expiry <= now + buffer`. A buffer that pushes the limit past the representable range
/// counts as expired.
pub fn is_expired_at(
	expiry: Option<OffsetDateTime>,
	buffer: Duration,
	now: OffsetDateTime,
) -> bool {
	match expiry {
		Some(instant) => now.checked_add(buffer).is_none_or(|limit| instant <= limit),
		None => true,
	}
}

/// [`is_expired_at`] evaluated against the system clock.
pub fn is_expired(expiry: Option<OffsetDateTime>, buffer: Duration) -> bool {
	is_expired_at(expiry, buffer, SystemClock.now())
}
