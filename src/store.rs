//! Identity-store contracts and built-in implementations.
//!
//! The identity provider's administrative API is the single source of truth for user
//! records. This module abstracts the two operations the resolver needs (listing
//! identities by email and linking a federated provider to an existing record) behind an
//! object-safe trait so the decision logic stays independent of any transport.

pub mod http;
pub mod memory;

pub use http::HttpIdentityStore;
pub use memory::MemoryIdentityStore;

// self
use crate::{
	_prelude::*,
	identity::{Identity, PoolId},
};

/// Boxed future returned by [`IdentityStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Administrative access to the identity provider's user records.
///
/// Implementations must preserve the backend's ordering in
/// [`list_by_email`](IdentityStore::list_by_email); the resolver's tie-break rule is
/// "first match wins" in store-returned order.
pub trait IdentityStore
where
	Self: Send + Sync,
{
	/// Lists the identities whose `email` attribute equals the given (lowercased) email.
	fn list_by_email<'a>(
		&'a self,
		pool: &'a PoolId,
		email: &'a str,
	) -> StoreFuture<'a, Vec<Identity>>;

	/// Links a federated provider identity to an existing destination record.
	///
	/// Yields [`StoreError::AlreadyLinked`] when the identical link already exists, so the
	/// resolver can treat the idempotency race as success-continuation.
	fn link_provider<'a>(
		&'a self,
		pool: &'a PoolId,
		link: &'a ProviderLink,
	) -> StoreFuture<'a, ()>;
}

/// Source/destination pair for an administrative link operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLink {
	/// Username of the existing (native) record the provider identity is linked to.
	pub destination_username: String,
	/// Provider name with the provider's expected casing (e.g. `Google`).
	pub provider_name: String,
	/// Provider-side subject identifier.
	pub provider_subject: String,
}

/// Error type produced by [`IdentityStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// The requested link already exists; safe to treat as success-continuation.
	#[error("Provider identity is already linked to the destination record.")]
	AlreadyLinked,
	/// Listing identities failed (network/permission); the resolver fails open on this.
	#[error("Identity lookup failed: {message}.")]
	Lookup {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the link operation; fatal to the resolver.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
