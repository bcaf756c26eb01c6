//! OAuth 2.0 credential sessions: run the interactive consent flow once, keep the resulting
//! token record in an owner-only store, and hand out fresh bearer credentials on every call
//! while refreshes happen behind a single-flight guard with exponential backoff.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod consent;
pub mod error;
pub mod expiry;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod retry;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::Result;
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
