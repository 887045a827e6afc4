//! Identity records owned by the identity provider, plus the classification and
//! username-decomposition rules the resolver builds on.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

/// Attribute name the identity provider sets on records that carry federated linkage.
pub const IDENTITIES_ATTRIBUTE: &str = "identities";

/// Tenant/namespace scope for a pool of identities.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(String);
impl PoolId {
	/// Creates a new pool identifier.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}
}
impl Deref for PoolId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for PoolId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for PoolId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<&str> for PoolId {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}
impl Debug for PoolId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Pool({})", self.0)
	}
}
impl Display for PoolId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// User record as returned by the identity provider's administrative API.
///
/// The gateway never creates these directly; it only reads them to decide whether a new
/// sign-up attempt may materialize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Unique username within the pool; encodes provenance (`<provider>_<subject>` for
	/// federated identities, an opaque native identifier otherwise).
	pub username: String,
	/// Claim name to value mapping as stored by the provider.
	#[serde(default)]
	pub attributes: BTreeMap<String, String>,
}
impl Identity {
	/// Builds an identity with no attributes.
	pub fn new(username: impl Into<String>) -> Self {
		Self { username: username.into(), attributes: BTreeMap::new() }
	}

	/// Adds an attribute.
	pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(name.into(), value.into());

		self
	}

	/// Returns `true` when the record carries the provider's federated-linkage attribute.
	pub fn has_linked_identities(&self) -> bool {
		self.attributes.contains_key(IDENTITIES_ATTRIBUTE)
	}
}

/// Classification of an existing identity, derived from its username and attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityClass {
	/// Created directly with a password against the identity provider.
	Native,
	/// Created through a third-party authentication provider.
	Federated,
}

/// Classifies an identity against the given federated-provider prefixes.
///
/// An identity is federated when its username starts with `<prefix>_` for any known
/// prefix (matched case-insensitively) or when it carries the `identities` attribute.
pub fn classify(identity: &Identity, provider_prefixes: &[String]) -> IdentityClass {
	if identity.has_linked_identities() {
		return IdentityClass::Federated;
	}
	if provider_prefixes.iter().any(|prefix| has_provider_prefix(&identity.username, prefix)) {
		return IdentityClass::Federated;
	}

	IdentityClass::Native
}

fn has_provider_prefix(username: &str, prefix: &str) -> bool {
	let Some(head) = username.get(..prefix.len()) else {
		return false;
	};

	head.eq_ignore_ascii_case(prefix) && username[prefix.len()..].starts_with('_')
}

/// Provider name and subject id decomposed from a federated username.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederatedUsername {
	/// Provider name with the provider's expected casing (first letter upper).
	pub provider: String,
	/// Provider-side subject identifier; remaining underscore segments rejoined.
	pub subject: String,
}
impl FederatedUsername {
	/// Splits a federated username of the form `<provider>_<subject>`.
	///
	/// The subject keeps any further underscores intact (`facebook_99_88` yields subject
	/// `99_88`). A username without an underscore decomposes to an empty subject, matching
	/// the provider's own split semantics.
	pub fn parse(username: &str) -> Self {
		let (provider_raw, subject) = match username.split_once('_') {
			Some((provider_raw, subject)) => (provider_raw, subject),
			None => (username, ""),
		};

		Self { provider: capitalize(provider_raw), subject: subject.to_owned() }
	}
}

/// Capitalizes the first character, leaving the rest unchanged (`google` -> `Google`).
pub fn capitalize(value: &str) -> String {
	let mut chars = value.chars();

	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}
