//! Ensure-fresh: refreshes a stale cached client through the backoff retrier.
//!
//! The refreshed record is written to the store before it replaces the cached one. A failed
//! write leaves the cache stale, so memory never runs ahead of what is persisted.

mod metrics;

pub use metrics::{RefreshMetrics, RefreshSnapshot};

// self
use crate::{
	_prelude::*,
	error::AuthenticationError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	retry::RetryError,
	session::{AuthorizedClient, Session},
};

impl Session {
	/// Refreshes `client` in place when its access token is inside the expiry buffer.
	pub(super) async fn ensure_fresh(&self, client: &mut AuthorizedClient) -> Result<()> {
		const KIND: FlowKind = FlowKind::Refresh;

		if !client.record.is_expired_at(self.config.expiry_buffer, self.clock.now()) {
			obs::event!(debug, account = %self.account, "Cached access token is fresh.");

			return Ok(());
		}

		let Some(refresh_token) = client.record.refresh_token.clone() else {
			obs::event!(
				warn,
				account = %self.account,
				"Access token expired and no refresh token is stored."
			);

			return Err(AuthenticationError::TokenExpired.into());
		};

		let span = FlowSpan::new(KIND, "ensure_fresh", &self.account);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async {
				let registration = &client.registration;
				let bundle = self
					.config
					.backoff
					.retry(|_attempt| {
						self.refresh_metrics.record_exchange();

						self.provider.refresh(registration, &refresh_token)
					})
					.await
					.map_err(|RetryError { attempts, source }| {
						AuthenticationError::RefreshExhausted { attempts, source }
					})?;
				let updated = client.record.refreshed(bundle);

				self.store.write_token(&updated, &self.account).await?;

				client.record = updated;

				obs::event!(info, account = %self.account, "Access token refreshed.");

				Ok(())
			})
			.await;

		self.refresh_metrics.record_pass(&result);
		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}
}
