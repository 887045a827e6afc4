//! Account-link resolution for the identity provider's pre-sign-up hook.
//!
//! The resolver runs synchronously before the provider creates a new user record. Given
//! the candidate's email and the trigger source, it decides whether creation proceeds
//! ([`LinkDirective::Allow`]), is rejected with a user-facing message
//! ([`LinkDirective::Block`]), or is aborted after linking the incoming federated
//! identity to an existing native record ([`LinkDirective::LinkAndAbort`]). The hook
//! executes in an at-least-once-delivery context, so the link side effect tolerates
//! replays: an already-existing link falls through to allowing creation instead of
//! failing.

// self
use crate::{
	_prelude::*,
	identity::{self, FederatedUsername, IdentityClass, PoolId},
	store::{IdentityStore, ProviderLink, StoreError},
};

/// Marker prefix on messages produced when sign-up is aborted because linking succeeded.
pub const LINKED_MARKER: &str = "ACCOUNT_LINKED";
/// Marker prefix on messages produced when sign-up is blocked by an existing account.
pub const EXISTS_MARKER: &str = "ACCOUNT_EXISTS";

const DEFAULT_PROVIDER_PREFIXES: [&str; 2] = ["google", "facebook"];

/// Provider trigger that caused a sign-up attempt.
///
/// Serde names match the identity provider's wire values so the hook event deserializes
/// directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
	/// Native email/password sign-up.
	#[serde(rename = "PreSignUp_SignUp")]
	NativeSignUp,
	/// Federated sign-up through an external authentication provider.
	#[serde(rename = "PreSignUp_ExternalProvider")]
	ExternalProviderSignUp,
	/// Administrator-created user.
	#[serde(rename = "PreSignUp_AdminCreateUser")]
	AdminCreateUser,
	/// Any trigger this gateway does not handle; passed through untouched.
	#[serde(other)]
	Unknown,
}

/// One sign-up attempt, transient for the duration of a single resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUpEvent {
	/// Pool the candidate would be created in.
	pub pool_id: PoolId,
	/// Trigger that caused the attempt.
	pub trigger_source: TriggerSource,
	/// Candidate username (provider-prefixed for federated attempts).
	pub username: String,
	/// Candidate attributes, including `email`.
	pub attributes: BTreeMap<String, String>,
}
impl SignUpEvent {
	/// Returns the candidate's email, lowercased for comparison, if present and non-empty.
	pub fn email(&self) -> Option<String> {
		self.attributes
			.get("email")
			.filter(|value| !value.is_empty())
			.map(|value| value.to_lowercase())
	}
}

/// Resolution outcome controlling whether the identity provider proceeds with creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkDirective {
	/// Let creation proceed, optionally auto-confirming the new identity.
	Allow {
		/// Auto-confirm the new user so no confirmation step is required.
		auto_confirm: bool,
		/// Mark the email attribute as verified.
		auto_verify_email: bool,
	},
	/// Abort creation and surface the message to the end user.
	Block {
		/// User-facing rejection message, prefixed with [`EXISTS_MARKER`].
		message: String,
	},
	/// Linking succeeded; abort this attempt so the user re-authenticates into the
	/// now-linked account.
	LinkAndAbort {
		/// Username of the native record the provider identity was linked to.
		destination: String,
		/// Capitalized provider name.
		provider: String,
		/// Provider-side subject identifier.
		subject: String,
		/// User-facing message, prefixed with [`LINKED_MARKER`].
		message: String,
	},
}
impl LinkDirective {
	/// Plain allowance with no auto-confirmation flags.
	pub const fn allow() -> Self {
		Self::Allow { auto_confirm: false, auto_verify_email: false }
	}

	/// Allowance for a fresh federated identity: auto-confirm and auto-verify email.
	pub const fn allow_confirmed() -> Self {
		Self::Allow { auto_confirm: true, auto_verify_email: true }
	}
}

/// Decides whether a sign-up attempt may create a new identity.
///
/// Stateless per invocation; the identity store is the only collaborator and is shared
/// read-mostly across concurrent resolutions.
pub struct AccountLinkResolver {
	store: Arc<dyn IdentityStore>,
	provider_prefixes: Vec<String>,
}
impl AccountLinkResolver {
	/// Builds a resolver over the given identity store with the default federated-provider
	/// prefixes (`google`, `facebook`).
	pub fn new(store: Arc<dyn IdentityStore>) -> Self {
		Self {
			store,
			provider_prefixes: DEFAULT_PROVIDER_PREFIXES.map(str::to_owned).to_vec(),
		}
	}

	/// Replaces the federated-provider prefix list used for classification.
	pub fn with_provider_prefixes(
		mut self,
		prefixes: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.provider_prefixes = prefixes.into_iter().map(Into::into).collect();

		self
	}

	/// Resolves one sign-up event into a [`LinkDirective`].
	///
	/// Only a fatal failure of the administrative link operation surfaces as an error;
	/// lookup failures fail open toward allowing creation, and an already-existing link
	/// falls through to [`LinkDirective::allow`].
	pub async fn resolve(&self, event: &SignUpEvent) -> Result<LinkDirective> {
		let Some(email) = event.email() else {
			tracing::info!(username = %event.username, "No email provided; skipping account linking.");

			return Ok(LinkDirective::allow());
		};

		match event.trigger_source {
			TriggerSource::ExternalProviderSignUp =>
				self.resolve_external(event, &email).await,
			TriggerSource::NativeSignUp => Ok(self.resolve_native(event, &email).await),
			TriggerSource::AdminCreateUser | TriggerSource::Unknown =>
				Ok(LinkDirective::allow()),
		}
	}

	async fn resolve_external(&self, event: &SignUpEvent, email: &str) -> Result<LinkDirective> {
		let parsed = FederatedUsername::parse(&event.username);
		let existing = self.existing_identities(&event.pool_id, email).await;
		let Some(native) = existing
			.iter()
			.find(|identity| {
				identity::classify(identity, &self.provider_prefixes) == IdentityClass::Native
			})
		else {
			// No native match; other federated identities may coexist unlinked.
			return Ok(LinkDirective::allow_confirmed());
		};
		let link = ProviderLink {
			destination_username: native.username.clone(),
			provider_name: parsed.provider.clone(),
			provider_subject: parsed.subject.clone(),
		};

		match self.store.link_provider(&event.pool_id, &link).await {
			Ok(()) => {
				tracing::info!(
					destination = %native.username,
					provider = %parsed.provider,
					"Linked provider identity to existing native record.",
				);

				Ok(LinkDirective::LinkAndAbort {
					destination: native.username.clone(),
					provider: parsed.provider.clone(),
					subject: parsed.subject,
					message: linked_message(&parsed.provider),
				})
			},
			Err(StoreError::AlreadyLinked) => {
				// Idempotency race: a concurrent attempt or provider retry linked first.
				tracing::warn!(
					destination = %native.username,
					provider = %parsed.provider,
					"Provider identity already linked; continuing with sign-up.",
				);

				Ok(LinkDirective::allow())
			},
			Err(source) => {
				tracing::error!(
					destination = %native.username,
					error = %source,
					"Account link operation failed.",
				);

				Err(Error::AccountLink { source })
			},
		}
	}

	async fn resolve_native(&self, event: &SignUpEvent, email: &str) -> LinkDirective {
		let existing = self.existing_identities(&event.pool_id, email).await;
		// First identity in store-returned order decides.
		let Some(first) = existing.first() else {
			return LinkDirective::allow();
		};

		match identity::classify(first, &self.provider_prefixes) {
			IdentityClass::Federated => LinkDirective::Block {
				message: federated_block_message(provider_display(&first.username).as_deref()),
			},
			IdentityClass::Native =>
				LinkDirective::Block { message: native_block_message() },
		}
	}

	async fn existing_identities(&self, pool: &PoolId, email: &str) -> Vec<crate::identity::Identity> {
		match self.store.list_by_email(pool, email).await {
			Ok(identities) => identities,
			Err(e) => {
				// Fail open: a degraded lookup must not block legitimate sign-ups.
				tracing::warn!(error = %e, "Identity lookup failed; treating as no existing identities.");

				Vec::new()
			},
		}
	}
}
impl Debug for AccountLinkResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccountLinkResolver")
			.field("provider_prefixes", &self.provider_prefixes)
			.finish_non_exhaustive()
	}
}

fn linked_message(provider: &str) -> String {
	format!(
		"{LINKED_MARKER}: Your {provider} account has been linked to your existing account. Please sign in again.",
	)
}

fn federated_block_message(provider: Option<&str>) -> String {
	match provider {
		Some(provider) => format!(
			"{EXISTS_MARKER}: An account with this email already exists. Please sign in with {provider} instead.",
		),
		None => format!(
			"{EXISTS_MARKER}: An account with this email already exists. Please sign in with your original sign-in method.",
		),
	}
}

fn native_block_message() -> String {
	format!(
		"{EXISTS_MARKER}: An account with this email already exists. Please sign in with your email and password.",
	)
}

fn provider_display(username: &str) -> Option<String> {
	match username.split_once('_') {
		Some((provider_raw, _)) if !provider_raw.is_empty() =>
			Some(identity::capitalize(provider_raw)),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		identity::Identity,
		store::{MemoryIdentityStore, StoreFuture},
	};

	const POOL: &str = "us-east-1_TestPool";
	const EMAIL: &str = "User@Example.com";

	fn event(trigger_source: TriggerSource, username: &str) -> SignUpEvent {
		SignUpEvent {
			pool_id: PoolId::new(POOL),
			trigger_source,
			username: username.into(),
			attributes: BTreeMap::from_iter([("email".to_owned(), EMAIL.to_owned())]),
		}
	}

	fn resolver_with(identities: &[Identity]) -> (AccountLinkResolver, Arc<MemoryIdentityStore>) {
		let store = Arc::new(MemoryIdentityStore::default());
		let pool = PoolId::new(POOL);

		for identity in identities {
			store.insert(&pool, identity.clone());
		}

		(AccountLinkResolver::new(store.clone()), store)
	}

	fn native_identity(username: &str) -> Identity {
		Identity::new(username).with_attribute("email", "user@example.com")
	}

	fn federated_identity(username: &str) -> Identity {
		Identity::new(username).with_attribute("email", "user@example.com")
	}

	#[tokio::test]
	async fn external_sign_up_without_existing_identities_allows_confirmed() {
		let (resolver, _) = resolver_with(&[]);
		let directive = resolver
			.resolve(&event(TriggerSource::ExternalProviderSignUp, "google_abc123"))
			.await
			.expect("Resolution should succeed with an empty pool.");

		assert_eq!(directive, LinkDirective::allow_confirmed());
	}

	#[tokio::test]
	async fn external_sign_up_links_to_first_native_identity() {
		let (resolver, store) = resolver_with(&[
			federated_identity("facebook_77"),
			native_identity("native-a"),
			native_identity("native-b"),
		]);
		let directive = resolver
			.resolve(&event(TriggerSource::ExternalProviderSignUp, "google_abc123"))
			.await
			.expect("Resolution should succeed when linking works.");

		match directive {
			LinkDirective::LinkAndAbort { destination, provider, subject, message } => {
				assert_eq!(destination, "native-a", "First native identity must win.");
				assert_eq!(provider, "Google");
				assert_eq!(subject, "abc123");
				assert!(message.starts_with(LINKED_MARKER));
			},
			other => panic!("Unexpected directive: {other:?}."),
		}

		let links = store.links(&PoolId::new(POOL));

		assert_eq!(links.len(), 1);
		assert_eq!(links[0].destination_username, "native-a");
	}

	#[tokio::test]
	async fn external_sign_up_with_only_federated_identities_allows_confirmed() {
		let (resolver, _) =
			resolver_with(&[federated_identity("facebook_77"), federated_identity("google_88")]);
		let directive = resolver
			.resolve(&event(TriggerSource::ExternalProviderSignUp, "google_abc123"))
			.await
			.expect("Resolution should succeed without a native match.");

		assert_eq!(directive, LinkDirective::allow_confirmed());
	}

	#[tokio::test]
	async fn second_resolution_falls_through_to_allow() {
		let (resolver, _) = resolver_with(&[native_identity("native-a")]);
		let attempt = event(TriggerSource::ExternalProviderSignUp, "google_abc123");
		let first = resolver
			.resolve(&attempt)
			.await
			.expect("First resolution should link and abort.");

		assert!(matches!(first, LinkDirective::LinkAndAbort { .. }));

		// The provider redelivers the event. The destination now carries federated
		// linkage, so no native match remains and creation proceeds.
		let second = resolver
			.resolve(&attempt)
			.await
			.expect("Second resolution should tolerate the existing link.");

		assert_eq!(second, LinkDirective::allow_confirmed());
	}

	struct RacedLinkStore;
	impl IdentityStore for RacedLinkStore {
		fn list_by_email<'a>(
			&'a self,
			_pool: &'a PoolId,
			_email: &'a str,
		) -> StoreFuture<'a, Vec<Identity>> {
			Box::pin(async {
				Ok(vec![Identity::new("native-a")
					.with_attribute("email", "user@example.com")])
			})
		}

		fn link_provider<'a>(
			&'a self,
			_pool: &'a PoolId,
			_link: &'a crate::store::ProviderLink,
		) -> StoreFuture<'a, ()> {
			Box::pin(async { Err(StoreError::AlreadyLinked) })
		}
	}

	#[tokio::test]
	async fn already_linked_race_falls_through_to_allow() {
		// A stale read still lists the native record without linkage, but a concurrent
		// attempt won the link; this attempt continues into creation without flags.
		let resolver = AccountLinkResolver::new(Arc::new(RacedLinkStore));
		let directive = resolver
			.resolve(&event(TriggerSource::ExternalProviderSignUp, "google_abc123"))
			.await
			.expect("An already-linked race must not fail resolution.");

		assert_eq!(directive, LinkDirective::allow());
	}

	#[tokio::test]
	async fn native_sign_up_without_existing_identities_allows() {
		let (resolver, _) = resolver_with(&[]);
		let directive = resolver
			.resolve(&event(TriggerSource::NativeSignUp, "candidate"))
			.await
			.expect("Resolution should succeed with an empty pool.");

		assert_eq!(directive, LinkDirective::allow());
	}

	#[tokio::test]
	async fn native_sign_up_blocks_on_existing_federated_identity() {
		let (resolver, _) = resolver_with(&[federated_identity("google_abc123")]);
		let directive = resolver
			.resolve(&event(TriggerSource::NativeSignUp, "candidate"))
			.await
			.expect("Resolution should succeed and block.");

		match directive {
			LinkDirective::Block { message } => {
				assert!(message.starts_with(EXISTS_MARKER));
				assert!(message.contains("Google"), "Block message must name the provider.");
			},
			other => panic!("Unexpected directive: {other:?}."),
		}
	}

	#[tokio::test]
	async fn native_sign_up_blocks_on_existing_native_identity() {
		let (resolver, _) = resolver_with(&[native_identity("existing")]);
		let directive = resolver
			.resolve(&event(TriggerSource::NativeSignUp, "candidate"))
			.await
			.expect("Resolution should succeed and block.");

		match directive {
			LinkDirective::Block { message } => {
				assert!(message.starts_with(EXISTS_MARKER));
				assert!(message.contains("email and password"));
			},
			other => panic!("Unexpected directive: {other:?}."),
		}
	}

	#[tokio::test]
	async fn admin_created_users_skip_the_lookup() {
		let (resolver, _) = resolver_with(&[native_identity("existing")]);
		let directive = resolver
			.resolve(&event(TriggerSource::AdminCreateUser, "candidate"))
			.await
			.expect("Admin-created users should resolve without a lookup.");

		assert_eq!(directive, LinkDirective::allow());
	}

	#[tokio::test]
	async fn missing_email_skips_linking_entirely() {
		let (resolver, _) = resolver_with(&[native_identity("existing")]);
		let mut attempt = event(TriggerSource::ExternalProviderSignUp, "google_abc123");

		attempt.attributes.remove("email");

		let directive = resolver
			.resolve(&attempt)
			.await
			.expect("Resolution should succeed without an email.");

		assert_eq!(directive, LinkDirective::allow());
	}

	struct OutageStore;
	impl IdentityStore for OutageStore {
		fn list_by_email<'a>(
			&'a self,
			_pool: &'a PoolId,
			_email: &'a str,
		) -> StoreFuture<'a, Vec<Identity>> {
			Box::pin(async {
				Err(StoreError::Lookup { message: "connection reset".into() })
			})
		}

		fn link_provider<'a>(
			&'a self,
			_pool: &'a PoolId,
			_link: &'a crate::store::ProviderLink,
		) -> StoreFuture<'a, ()> {
			Box::pin(async { Err(StoreError::Backend { message: "unreachable".into() }) })
		}
	}

	#[tokio::test]
	async fn lookup_outage_fails_open() {
		let resolver = AccountLinkResolver::new(Arc::new(OutageStore));
		let directive = resolver
			.resolve(&event(TriggerSource::NativeSignUp, "candidate"))
			.await
			.expect("A degraded lookup must not fail resolution.");

		assert_eq!(directive, LinkDirective::allow());
	}

	struct BrokenLinkStore;
	impl IdentityStore for BrokenLinkStore {
		fn list_by_email<'a>(
			&'a self,
			_pool: &'a PoolId,
			_email: &'a str,
		) -> StoreFuture<'a, Vec<Identity>> {
			Box::pin(async {
				Ok(vec![Identity::new("native-a")
					.with_attribute("email", "user@example.com")])
			})
		}

		fn link_provider<'a>(
			&'a self,
			_pool: &'a PoolId,
			_link: &'a crate::store::ProviderLink,
		) -> StoreFuture<'a, ()> {
			Box::pin(async { Err(StoreError::Backend { message: "permission denied".into() }) })
		}
	}

	#[tokio::test]
	async fn fatal_link_failure_propagates() {
		let resolver = AccountLinkResolver::new(Arc::new(BrokenLinkStore));
		let err = resolver
			.resolve(&event(TriggerSource::ExternalProviderSignUp, "google_abc123"))
			.await
			.expect_err("A non-idempotency link failure must propagate.");

		assert!(matches!(err, Error::AccountLink { .. }));
	}

	#[tokio::test]
	async fn custom_prefixes_extend_classification() {
		let store = Arc::new(MemoryIdentityStore::default());
		let pool = PoolId::new(POOL);

		store.insert(
			&pool,
			Identity::new("github_42").with_attribute("email", "user@example.com"),
		);

		let resolver = AccountLinkResolver::new(store)
			.with_provider_prefixes(["google", "facebook", "github"]);
		let directive = resolver
			.resolve(&event(TriggerSource::NativeSignUp, "candidate"))
			.await
			.expect("Resolution should succeed and block.");

		match directive {
			LinkDirective::Block { message } => assert!(message.contains("Github")),
			other => panic!("Unexpected directive: {other:?}."),
		}
	}

	#[test]
	fn trigger_source_uses_provider_wire_names() {
		let parsed: TriggerSource = serde_json::from_str("\"PreSignUp_ExternalProvider\"")
			.expect("Wire name should deserialize.");

		assert_eq!(parsed, TriggerSource::ExternalProviderSignUp);

		let parsed: TriggerSource = serde_json::from_str("\"PreSignUp_SomethingNew\"")
			.expect("Unknown trigger sources should fall back to the catch-all.");

		assert_eq!(parsed, TriggerSource::Unknown);
	}
}
