//! Pre-sign-up hook interface invoked synchronously by the identity provider.
//!
//! The provider delivers a [`HookEvent`] immediately before creating a user record and
//! interprets the return value: the (possibly mutated) event permits creation, while an
//! error aborts the flow and surfaces the error's message to the end user. Intentional
//! aborts carry a marker-prefixed message ([`crate::link::LINKED_MARKER`] /
//! [`crate::link::EXISTS_MARKER`]) so callers can format them differently from
//! unexpected internal failures.

// self
use crate::{
	_prelude::*,
	identity::PoolId,
	link::{AccountLinkResolver, LinkDirective, SignUpEvent, TriggerSource},
};

/// Pre-sign-up event in the identity provider's wire shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookEvent {
	/// Hook payload version, passed through untouched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	/// Pool the candidate would be created in.
	pub user_pool_id: String,
	/// Trigger that caused the sign-up attempt.
	pub trigger_source: TriggerSource,
	/// Candidate username.
	pub user_name: String,
	/// Request half of the event.
	pub request: HookRequest,
	/// Response half of the event; mutated before returning.
	#[serde(default)]
	pub response: HookResponse,
}
impl HookEvent {
	/// Projects the wire event into the resolver's [`SignUpEvent`].
	pub fn sign_up_event(&self) -> SignUpEvent {
		SignUpEvent {
			pool_id: PoolId::new(&self.user_pool_id),
			trigger_source: self.trigger_source,
			username: self.user_name.clone(),
			attributes: self.request.user_attributes.clone(),
		}
	}
}

/// Request half of a [`HookEvent`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookRequest {
	/// Candidate attributes, including `email`.
	#[serde(default)]
	pub user_attributes: BTreeMap<String, String>,
}

/// Response half of a [`HookEvent`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResponse {
	/// Auto-confirm the new user so no confirmation step is required.
	#[serde(default)]
	pub auto_confirm_user: bool,
	/// Mark the email attribute as verified.
	#[serde(default)]
	pub auto_verify_email: bool,
}

/// Failure signaled back to the identity provider to abort sign-up.
#[derive(Debug, ThisError)]
pub enum HookError {
	/// Intentional abort (duplicate blocked or account linked); the message is meant for
	/// the end user and carries a marker prefix.
	#[error("{message}")]
	Rejected {
		/// User-facing message.
		message: String,
	},
	/// Unexpected internal failure; sign-up fails without a linking message.
	#[error(transparent)]
	Internal(#[from] Error),
}
impl HookError {
	/// Returns `true` for intentional aborts whose message targets the end user.
	pub const fn is_intentional(&self) -> bool {
		matches!(self, Self::Rejected { .. })
	}
}

/// Runs the account-link resolution for one pre-sign-up event.
///
/// [`LinkDirective::Allow`] merges its auto-confirmation flags into the event's response
/// half and permits creation; any other directive aborts with the directive's message.
pub async fn handle_pre_sign_up(
	resolver: &AccountLinkResolver,
	mut event: HookEvent,
) -> Result<HookEvent, HookError> {
	let directive = resolver.resolve(&event.sign_up_event()).await?;

	match directive {
		LinkDirective::Allow { auto_confirm, auto_verify_email } => {
			event.response.auto_confirm_user |= auto_confirm;
			event.response.auto_verify_email |= auto_verify_email;

			Ok(event)
		},
		LinkDirective::Block { message } => Err(HookError::Rejected { message }),
		LinkDirective::LinkAndAbort { message, .. } => Err(HookError::Rejected { message }),
	}
}
