//! Thread-safe in-memory [`IdentityStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	identity::{self, Identity, PoolId},
	store::{IdentityStore, ProviderLink, StoreError, StoreFuture},
};

type PoolEntries = Arc<RwLock<Vec<(PoolId, Identity)>>>;
type LinkEntries = Arc<RwLock<Vec<(PoolId, ProviderLink)>>>;

/// In-process store that keeps identities in insertion order, mirroring the
/// provider-returned ordering the resolver's tie-break rule depends on.
#[derive(Clone, Debug, Default)]
pub struct MemoryIdentityStore {
	identities: PoolEntries,
	links: LinkEntries,
}
impl MemoryIdentityStore {
	/// Registers an identity in the given pool; later insertions list later.
	pub fn insert(&self, pool: &PoolId, identity: Identity) {
		self.identities.write().push((pool.clone(), identity));
	}

	/// Returns the links recorded so far for the given pool.
	pub fn links(&self, pool: &PoolId) -> Vec<ProviderLink> {
		self.links
			.read()
			.iter()
			.filter(|(entry_pool, _)| entry_pool == pool)
			.map(|(_, link)| link.clone())
			.collect()
	}

	fn list_now(entries: PoolEntries, pool: PoolId, email: String) -> Vec<Identity> {
		entries
			.read()
			.iter()
			.filter(|(entry_pool, identity)| {
				*entry_pool == pool
					&& identity
						.attributes
						.get("email")
						.is_some_and(|value| value.eq_ignore_ascii_case(&email))
			})
			.map(|(_, identity)| identity.clone())
			.collect()
	}

	fn link_now(
		identities: PoolEntries,
		links: LinkEntries,
		pool: PoolId,
		link: ProviderLink,
	) -> Result<(), StoreError> {
		let mut guard = links.write();

		if guard.iter().any(|(entry_pool, entry)| *entry_pool == pool && *entry == link) {
			return Err(StoreError::AlreadyLinked);
		}

		guard.push((pool.clone(), link.clone()));

		// The destination record now carries federated linkage, exactly as the provider
		// reflects a successful admin link.
		let mut identities = identities.write();

		if let Some((_, identity)) = identities
			.iter_mut()
			.find(|(entry_pool, identity)| {
				*entry_pool == pool && identity.username == link.destination_username
			}) {
			identity.attributes.insert(
				identity::IDENTITIES_ATTRIBUTE.into(),
				format!("[{{\"providerName\":\"{}\"}}]", link.provider_name),
			);
		}

		Ok(())
	}
}
impl IdentityStore for MemoryIdentityStore {
	fn list_by_email<'a>(
		&'a self,
		pool: &'a PoolId,
		email: &'a str,
	) -> StoreFuture<'a, Vec<Identity>> {
		let entries = self.identities.clone();
		let pool = pool.clone();
		let email = email.to_owned();

		Box::pin(async move { Ok(Self::list_now(entries, pool, email)) })
	}

	fn link_provider<'a>(
		&'a self,
		pool: &'a PoolId,
		link: &'a ProviderLink,
	) -> StoreFuture<'a, ()> {
		let identities = self.identities.clone();
		let links = self.links.clone();
		let pool = pool.clone();
		let link = link.clone();

		Box::pin(async move { Self::link_now(identities, links, pool, link) })
	}
}
