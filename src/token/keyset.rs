//! Read-through cache for the pool's published JSON Web Key set.

// std
use std::collections::HashMap;
// crates.io
use jsonwebtoken::{DecodingKey, jwk::JwkSet};
// self
use crate::{_prelude::*, token::VerificationError};

type KeyMap = HashMap<String, Arc<DecodingKey>>;

/// Caches the pool's public signing keys by key id.
///
/// Keys are immutable once published for their key id, so entries never expire; the set
/// is re-fetched only when a token references an unknown key id (e.g. after the provider
/// rotates keys). A single in-flight refresh is enforced so concurrent cache misses do
/// not stampede the key-set endpoint.
pub struct KeySetCache {
	client: ReqwestClient,
	url: Url,
	keys: RwLock<KeyMap>,
	refresh: AsyncMutex<()>,
}
impl KeySetCache {
	/// Builds a cache that fetches the key set from `url` with the shared HTTP client.
	pub fn new(client: ReqwestClient, url: Url) -> Self {
		Self { client, url, keys: RwLock::new(HashMap::new()), refresh: AsyncMutex::new(()) }
	}

	/// Resolves the decoding key for `kid`, refreshing the cached set on a miss.
	///
	/// A key id that remains unknown after a refresh is reported as an invalid token, not
	/// as a key-set outage.
	pub async fn decoding_key(&self, kid: &str) -> Result<Arc<DecodingKey>, VerificationError> {
		if let Some(key) = self.keys.read().get(kid) {
			return Ok(key.clone());
		}

		let _refresh = self.refresh.lock().await;

		// Another task may have refreshed while this one waited on the guard.
		if let Some(key) = self.keys.read().get(kid) {
			return Ok(key.clone());
		}

		let fetched = self.fetch().await?;

		tracing::info!(url = %self.url, keys = fetched.len(), "Refreshed signing key set.");

		let key = fetched.get(kid).cloned();

		*self.keys.write() = fetched;

		key.ok_or_else(|| VerificationError::MalformedOrInvalidSignature {
			reason: format!("unknown signing key id `{kid}`"),
		})
	}

	async fn fetch(&self) -> Result<KeyMap, VerificationError> {
		let response = self
			.client
			.get(self.url.clone())
			.send()
			.await
			.map_err(|e| VerificationError::KeySetUnavailable { reason: e.to_string() })?;
		let status = response.status();

		if !status.is_success() {
			return Err(VerificationError::KeySetUnavailable {
				reason: format!("key-set endpoint returned HTTP {}", status.as_u16()),
			});
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| VerificationError::KeySetUnavailable { reason: e.to_string() })?;
		let mut deserializer = serde_json::Deserializer::from_slice(&body);
		let jwks: JwkSet = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| VerificationError::KeySetUnavailable { reason: e.to_string() })?;
		let mut keys = KeyMap::new();

		for jwk in &jwks.keys {
			let Some(kid) = jwk.common.key_id.clone() else {
				continue;
			};

			// Keys of unsupported families are skipped rather than failing the whole set.
			match DecodingKey::from_jwk(jwk) {
				Ok(key) => {
					keys.insert(kid, Arc::new(key));
				},
				Err(e) => {
					tracing::warn!(kid = %kid, error = %e, "Skipping unusable key in key set.");
				},
			}
		}

		Ok(keys)
	}
}
impl Debug for KeySetCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeySetCache")
			.field("url", &self.url.as_str())
			.field("cached_keys", &self.keys.read().len())
			.finish_non_exhaustive()
	}
}
