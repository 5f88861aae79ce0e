//! Ship HL7v2 message files into a Cloud Healthcare HL7v2 store.
//!
//! Credentials are resolved once per client, ingest calls are paced by a shared rate limiter,
//! and a message only counts as delivered once its acknowledgement classifies as accepted.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod ack;
pub mod auth;
#[cfg(feature = "cli")] pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod limit;
pub mod obs;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{StaticTokenSource, TokenSource},
		config::ClientConfig,
		http::ReqwestHttpClient,
		store::MessageStoreClient,
	};

	/// Bearer token handed out by [`build_test_store_client`].
	pub const TEST_ACCESS_TOKEN: &str = "test-access-token";

	/// Builds a client configuration pointing at `base_url` (typically an `httpmock` server).
	pub fn test_client_config(base_url: &str, rate_limit: i64) -> ClientConfig {
		let endpoint = Url::parse(&format!("{}/v1/", base_url.trim_end_matches('/')))
			.expect("Mock endpoint should parse as a URL.");

		ClientConfig::new("p", "l", "d", "s").with_rate_limit(rate_limit).with_endpoint(endpoint)
	}

	/// Constructs a [`MessageStoreClient`] that authenticates with a static token and talks to
	/// the mock server at `base_url`.
	pub fn build_test_store_client(base_url: &str) -> MessageStoreClient {
		let tokens: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new(TEST_ACCESS_TOKEN));

		MessageStoreClient::with_token_source(
			test_client_config(base_url, 0),
			ReqwestHttpClient::default(),
			tokens,
		)
		.expect("Test store client should build successfully.")
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(feature = "cli")] use color_eyre as _;
#[cfg(test)] use {color_eyre as _, httpmock as _};
