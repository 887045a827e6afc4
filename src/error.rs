//! Gateway-level error types shared across the verifier, resolver, and stores.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Bearer-token verification failure.
	#[error(transparent)]
	Verification(#[from] crate::token::VerificationError),
	/// The identity provider's administrative link operation failed fatally.
	///
	/// Non-fatal outcomes (idempotency races, degraded lookups) never surface here; the
	/// resolver swallows them and falls through to allowing sign-up.
	#[error("Account link operation failed.")]
	AccountLink {
		/// Underlying store failure.
		#[source]
		source: crate::store::StoreError,
	},
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required environment variable is absent or empty.
	#[error("Missing required environment variable `{name}`.")]
	MissingVar {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable is present but cannot be parsed.
	#[error("Invalid value for environment variable `{name}`.")]
	InvalidVar {
		/// Variable name.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a parsing failure for the named variable inside [`ConfigError`].
	pub fn invalid_var(
		name: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::InvalidVar { name, source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn account_link_error_exposes_store_source() {
		let store_error = StoreError::Backend { message: "admin API unreachable".into() };
		let error = Error::AccountLink { source: store_error };
		let source = StdError::source(&error)
			.expect("Gateway error should expose the original store error as its source.");

		assert!(source.to_string().contains("admin API unreachable"));
	}
}
