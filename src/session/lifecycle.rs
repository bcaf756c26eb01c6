//! Explicit sign-in, forced re-consent, and sign-out.

// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::RevocableToken,
	session::{AuthorizedClient, Session},
};

impl Session {
	/// Drops the cached client and acquires again.
	///
	/// A stored record is reused, so this reloads from the store rather than forcing consent;
	/// see [`Session::reauthenticate`] for that.
	pub async fn sign_in(&self) -> Result<AuthorizedClient> {
		const KIND: FlowKind = FlowKind::SignIn;

		let span = FlowSpan::new(KIND, "sign_in", &self.account);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let mut slot = self.slot.lock().await;

				*slot = None;

				self.fresh_client_locked(&mut slot).await
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Deletes the stored record, then signs in, which always runs interactive consent.
	pub async fn reauthenticate(&self) -> Result<AuthorizedClient> {
		const KIND: FlowKind = FlowKind::SignIn;

		let span = FlowSpan::new(KIND, "reauthenticate", &self.account);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<AuthorizedClient> = span
			.instrument(async {
				let mut slot = self.slot.lock().await;

				*slot = None;

				self.store.delete_token(&self.account).await?;
				self.fresh_client_locked(&mut slot).await
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Revokes the current credential when possible, clears the cache, and deletes the stored
	/// record.
	///
	/// Revocation is best effort: its failure is logged and does not stop the sign-out. Only a
	/// failed delete is reported, and the cache is already empty by then.
	pub async fn sign_out(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::SignOut;

		let span = FlowSpan::new(KIND, "sign_out", &self.account);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async {
				let mut slot = self.slot.lock().await;
				let client = match slot.take() {
					Some(client) => Some(client),
					None => self.stored_client_for_revoke().await,
				};

				if let Some(client) = client {
					self.revoke_best_effort(&client).await;
				}

				self.store.delete_token(&self.account).await?;

				obs::event!(info, account = %self.account, "Signed out.");

				Ok(())
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	async fn stored_client_for_revoke(&self) -> Option<AuthorizedClient> {
		let loaded: Result<Option<AuthorizedClient>> = async {
			let Some(record) = self.store.read_token(&self.account).await? else {
				return Ok(None);
			};
			let registration = self.store.read_registration().await?;

			Ok(Some(AuthorizedClient { registration, record }))
		}
		.await;

		loaded.unwrap_or_else(|e| {
			obs::event!(
				warn,
				account = %self.account,
				error = %e,
				"Stored credential could not be loaded for revocation."
			);

			None
		})
	}

	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	async fn revoke_best_effort(&self, client: &AuthorizedClient) {
		let token = match (&client.record.access_token, &client.record.refresh_token) {
			(Some(access), _) => RevocableToken::Access(access.clone()),
			(None, Some(refresh)) => RevocableToken::Refresh(refresh.clone()),
			(None, None) => return,
		};

		obs::event!(
			debug,
			account = %self.account,
			token = token.kind(),
			"Revoking credential."
		);

		if let Err(e) = self.provider.revoke(&client.registration, token).await {
			obs::event!(
				warn,
				account = %self.account,
				error = %e,
				"Revocation failed; continuing sign-out."
			);
		}
	}
}
