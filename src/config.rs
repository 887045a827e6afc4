//! Environment-sourced gateway configuration.

// std
use std::net::SocketAddr;
// self
use crate::{_prelude::*, error::ConfigError};

const REGION_VAR: &str = "COGNITO_REGION";
const USER_POOL_ID_VAR: &str = "COGNITO_USER_POOL_ID";
const APP_CLIENT_ID_VAR: &str = "COGNITO_APP_CLIENT_ID";
const JWKS_URL_VAR: &str = "COGNITO_JWKS_URL";
const CORS_ORIGINS_VAR: &str = "CORS_ALLOWED_ORIGINS";
const LISTEN_ADDR_VAR: &str = "LISTEN_ADDR";

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Gateway configuration assembled from the process environment.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
	/// Identity-provider region.
	pub region: String,
	/// User-pool identifier (tenant scope).
	pub user_pool_id: String,
	/// App-client identifier; the audience accepted on inbound tokens.
	pub app_client_id: String,
	/// Published key-set endpoint, derived from region + pool unless overridden.
	pub key_set_url: Url,
	/// Origins allowed by the CORS layer.
	pub cors_origins: Vec<String>,
	/// Socket address the API binds to.
	pub listen_addr: SocketAddr,
}
impl GatewayConfig {
	/// Reads the configuration from the process environment, failing fast on missing or
	/// unparsable values.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through the given lookup function.
	///
	/// Empty values are treated as absent, matching shell exports of the form `VAR=`.
	pub fn from_lookup(
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<Self, ConfigError> {
		let get = |name: &'static str| lookup(name).filter(|value| !value.is_empty());
		let region = get(REGION_VAR).unwrap_or_else(|| DEFAULT_REGION.into());
		let user_pool_id =
			get(USER_POOL_ID_VAR).ok_or(ConfigError::MissingVar { name: USER_POOL_ID_VAR })?;
		let app_client_id =
			get(APP_CLIENT_ID_VAR).ok_or(ConfigError::MissingVar { name: APP_CLIENT_ID_VAR })?;
		let key_set_url = match get(JWKS_URL_VAR) {
			Some(raw) =>
				raw.parse().map_err(|e| ConfigError::invalid_var(JWKS_URL_VAR, e))?,
			None => derive_key_set_url(&region, &user_pool_id)?,
		};
		let cors_origins = get(CORS_ORIGINS_VAR)
			.unwrap_or_else(|| DEFAULT_CORS_ORIGIN.into())
			.split(',')
			.map(|origin| origin.trim().to_owned())
			.filter(|origin| !origin.is_empty())
			.collect();
		let listen_addr = get(LISTEN_ADDR_VAR)
			.unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into())
			.parse()
			.map_err(|e| ConfigError::invalid_var(LISTEN_ADDR_VAR, e))?;

		Ok(Self { region, user_pool_id, app_client_id, key_set_url, cors_origins, listen_addr })
	}
}

fn derive_key_set_url(region: &str, user_pool_id: &str) -> Result<Url, ConfigError> {
	format!(
		"https://cognito-idp.{region}.amazonaws.com/{user_pool_id}/.well-known/jwks.json",
	)
	.parse()
	.map_err(|e| ConfigError::invalid_var(USER_POOL_ID_VAR, e))
}
