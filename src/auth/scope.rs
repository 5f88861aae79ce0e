//! OAuth scopes requested when minting tokens.

// std
use std::collections::BTreeSet;
// self
use crate::_prelude::*;

/// Scope granting access to the Cloud Healthcare API.
pub const CLOUD_HEALTHCARE_SCOPE: &str = "https://www.googleapis.com/auth/cloud-healthcare";

/// A scope string that cannot be sent to a token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Scope `{0}` is empty or contains whitespace.")]
pub struct InvalidScope(pub String);

/// Sorted, deduplicated scopes.
///
/// Backends render the set in whatever shape their endpoint expects: space separated inside
/// a JWT claim, comma separated in a metadata server query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Builds a set, rejecting blank entries and entries with embedded whitespace.
	pub fn new<I>(scopes: I) -> Result<Self, InvalidScope>
	where
		I: IntoIterator,
		I::Item: Into<String>,
	{
		let unique = scopes
			.into_iter()
			.map(Into::into)
			.map(|scope: String| {
				if scope.is_empty() || scope.contains(char::is_whitespace) {
					Err(InvalidScope(scope))
				} else {
					Ok(scope)
				}
			})
			.collect::<Result<BTreeSet<_>, _>>()?;

		Ok(Self(unique.into_iter().collect()))
	}

	/// The Cloud Healthcare scope alone.
	pub fn healthcare() -> Self {
		Self(Arc::from([CLOUD_HEALTHCARE_SCOPE.to_owned()]))
	}

	/// Number of scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// `true` when no scope is requested.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Membership test.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|candidate| candidate == scope)
	}

	/// Scopes in sorted order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Space separated form used by OAuth request bodies and JWT claims.
	pub fn normalized(&self) -> String {
		self.joined(' ')
	}

	/// Scopes joined by `delimiter`.
	pub fn joined(&self, delimiter: char) -> String {
		let mut buf = [0; 4];

		self.0.join(&*delimiter.encode_utf8(&mut buf))
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}
