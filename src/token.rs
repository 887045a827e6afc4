//! Bearer-token verification against the pool's published key set.
//!
//! [`TokenVerifier::verify`] parses the token header to find the signing key id, resolves
//! the matching public key through [`KeySetCache`], and validates the RS256 signature,
//! expiry, and audience before handing back the decoded [`Claims`]. Nothing here retries;
//! key-set caching is an optimization, not a retry policy.

pub mod keyset;

pub use keyset::KeySetCache;

// crates.io
use jsonwebtoken::{Algorithm, Validation, errors::ErrorKind};
// self
use crate::_prelude::*;

/// Verified claims extracted from a token payload.
///
/// Unrecognized claims pass through untouched in [`extra`](Claims::extra) so downstream
/// handlers can read provider-specific values (e.g. `cognito:username`).
#[derive(Clone, Debug, Deserialize)]
pub struct Claims {
	/// Stable subject identifier.
	pub sub: String,
	/// Email address, when the token carries one.
	#[serde(default)]
	pub email: Option<String>,
	/// Display name, when the token carries one.
	#[serde(default)]
	pub name: Option<String>,
	/// Avatar URL, when the token carries one.
	#[serde(default)]
	pub picture: Option<String>,
	/// Passthrough of all claims not captured above.
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}

/// Verification failures surfaced to the API caller as an unauthorized response.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum VerificationError {
	/// The token's `exp` claim lies in the past.
	#[error("Token has expired.")]
	Expired,
	/// The token is malformed, its signature does not verify, or its signing key id is
	/// unknown to the pool's key set.
	#[error("Invalid token: {reason}.")]
	MalformedOrInvalidSignature {
		/// Human-readable reason string.
		reason: String,
	},
	/// The token's audience does not match the configured app client.
	#[error("Token audience does not match the configured app client.")]
	AudienceMismatch,
	/// The pool's published key set could not be fetched or parsed.
	#[error("Signing key set is unavailable: {reason}.")]
	KeySetUnavailable {
		/// Human-readable reason string.
		reason: String,
	},
}
impl VerificationError {
	fn from_decode(e: jsonwebtoken::errors::Error) -> Self {
		match e.kind() {
			ErrorKind::ExpiredSignature => Self::Expired,
			ErrorKind::InvalidAudience => Self::AudienceMismatch,
			_ => Self::MalformedOrInvalidSignature { reason: e.to_string() },
		}
	}
}

/// Validates inbound bearer tokens and extracts their claims.
///
/// Created once per process and shared across concurrent requests; the only internal
/// state is the read-through [`KeySetCache`].
#[derive(Debug)]
pub struct TokenVerifier {
	keys: KeySetCache,
	audience: String,
}
impl TokenVerifier {
	/// Builds a verifier over the given key-set cache, accepting tokens whose audience
	/// equals `audience` (the app client id).
	pub fn new(keys: KeySetCache, audience: impl Into<String>) -> Self {
		Self { keys, audience: audience.into() }
	}

	/// Verifies a bearer token and returns its claims.
	pub async fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
		let header =
			jsonwebtoken::decode_header(token).map_err(VerificationError::from_decode)?;
		let kid = header.kid.ok_or_else(|| VerificationError::MalformedOrInvalidSignature {
			reason: "token header carries no key id".into(),
		})?;
		let key = self.keys.decoding_key(&kid).await?;
		let mut validation = Validation::new(Algorithm::RS256);

		validation.set_audience(&[&self.audience]);

		let decoded = jsonwebtoken::decode::<Claims>(token, key.as_ref(), &validation)
			.map_err(VerificationError::from_decode)?;

		Ok(decoded.claims)
	}
}
