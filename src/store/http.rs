//! JSON-over-HTTP [`IdentityStore`] implementation backed by the identity provider's
//! administrative API.

// self
use crate::{
	_prelude::*,
	identity::{Identity, PoolId},
	store::{IdentityStore, ProviderLink, StoreError, StoreFuture},
};

/// Administrative client speaking a small JSON protocol:
///
/// - `GET {base}/pools/{pool}/identities?email=<email>` returns the identities sharing an
///   email, in the backend's order.
/// - `POST {base}/pools/{pool}/identities/{destination}/links` creates a provider link;
///   `409 Conflict` signals the link already exists.
#[derive(Clone, Debug)]
pub struct HttpIdentityStore {
	client: ReqwestClient,
	base: Url,
}
impl HttpIdentityStore {
	/// Builds a store client from a shared HTTP client and the admin API base URL.
	pub fn new(client: ReqwestClient, base: Url) -> Self {
		Self { client, base }
	}

	fn identities_url(&self, pool: &PoolId) -> Result<Url, StoreError> {
		self.base
			.join(&format!("pools/{pool}/identities"))
			.map_err(|e| StoreError::Backend { message: e.to_string() })
	}

	fn links_url(&self, pool: &PoolId, destination: &str) -> Result<Url, StoreError> {
		self.base
			.join(&format!("pools/{pool}/identities/{destination}/links"))
			.map_err(|e| StoreError::Backend { message: e.to_string() })
	}

	async fn list(&self, pool: &PoolId, email: &str) -> Result<Vec<Identity>, StoreError> {
		let url = self.identities_url(pool)?;
		let response = self
			.client
			.get(url)
			.query(&[("email", email)])
			.send()
			.await
			.map_err(|e| StoreError::Lookup { message: e.to_string() })?;
		let status = response.status();

		if !status.is_success() {
			return Err(StoreError::Lookup {
				message: format!("admin API returned HTTP {}", status.as_u16()),
			});
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| StoreError::Lookup { message: e.to_string() })?;
		let mut deserializer = serde_json::Deserializer::from_slice(&body);
		let listed: ListIdentitiesResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| StoreError::Lookup { message: e.to_string() })?;

		Ok(listed.identities)
	}

	async fn link(&self, pool: &PoolId, link: &ProviderLink) -> Result<(), StoreError> {
		let url = self.links_url(pool, &link.destination_username)?;
		let payload = CreateLinkRequest {
			provider_name: &link.provider_name,
			provider_subject: &link.provider_subject,
		};
		let response = self
			.client
			.post(url)
			.json(&payload)
			.send()
			.await
			.map_err(|e| StoreError::Backend { message: e.to_string() })?;
		let status = response.status();

		if status == reqwest::StatusCode::CONFLICT {
			return Err(StoreError::AlreadyLinked);
		}
		if !status.is_success() {
			return Err(StoreError::Backend {
				message: format!("admin API returned HTTP {}", status.as_u16()),
			});
		}

		Ok(())
	}
}
impl IdentityStore for HttpIdentityStore {
	fn list_by_email<'a>(
		&'a self,
		pool: &'a PoolId,
		email: &'a str,
	) -> StoreFuture<'a, Vec<Identity>> {
		Box::pin(self.list(pool, email))
	}

	fn link_provider<'a>(
		&'a self,
		pool: &'a PoolId,
		link: &'a ProviderLink,
	) -> StoreFuture<'a, ()> {
		Box::pin(self.link(pool, link))
	}
}

#[derive(Debug, Deserialize)]
struct ListIdentitiesResponse {
	#[serde(default)]
	identities: Vec<Identity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLinkRequest<'a> {
	provider_name: &'a str,
	provider_subject: &'a str,
}
