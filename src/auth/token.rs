//! Bearer tokens minted by [`TokenSource`](crate::auth::TokenSource) backends.

// self
use crate::_prelude::*;

/// Redacted bearer secret that keeps token material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerSecret(String);
impl BearerSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for BearerSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("BearerSecret").field(&"<redacted>").finish()
	}
}
impl Display for BearerSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access token plus the instant it stops being valid.
///
/// Tokens without an expiry (pre-issued static tokens) never need a refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer secret attached to API requests.
	pub secret: BearerSecret,
	/// Expiry instant, when the issuer reported one.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Creates a token that never expires.
	pub fn new(secret: impl Into<String>) -> Self {
		Self { secret: BearerSecret::new(secret), expires_at: None }
	}

	/// Creates a token that expires `lifetime` after `issued_at`.
	///
	/// A lifetime that lands outside the representable date range is treated as no expiry.
	pub fn issued(secret: impl Into<String>, issued_at: OffsetDateTime, lifetime: Duration) -> Self {
		Self { secret: BearerSecret::new(secret), expires_at: issued_at.checked_add(lifetime) }
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|at| instant >= at)
	}

	/// Returns `true` if the token expires within `window` of `instant`.
	pub fn expires_within(&self, instant: OffsetDateTime, window: Duration) -> bool {
		self.expires_at.is_some_and(|at| at - instant <= window)
	}

	/// Formats the `Authorization` header value.
	pub fn authorization(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
