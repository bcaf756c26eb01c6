//! Observability helpers for session flows.
//!
//! # Feature Flags
//!
//! - `tracing` (default) emits spans named `oauth2_session.flow` with `flow` and `stage` fields,
//!   plus debug/info/warn events for cache hits, retries, refreshes, and revoke failures.
//! - `metrics` increments the `oauth2_session_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event when the `tracing` feature is enabled; compiles to nothing otherwise.
macro_rules! event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!(target: "oauth2_session", $($arg)+);
		}
	};
}
pub(crate) use event;

/// Session flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Loading a stored record or falling back to consent.
	Acquire,
	/// Interactive consent for a fresh token bundle.
	InitialAuthentication,
	/// Refresh token exchange.
	Refresh,
	/// Explicit sign-in.
	SignIn,
	/// Explicit sign-out.
	SignOut,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Acquire => "acquire",
			FlowKind::InitialAuthentication => "initial_authentication",
			FlowKind::Refresh => "refresh",
			FlowKind::SignIn => "sign_in",
			FlowKind::SignOut => "sign_out",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Maps a flow result onto its terminal outcome.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		match result {
			Ok(_) => FlowOutcome::Success,
			Err(_) => FlowOutcome::Failure,
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
