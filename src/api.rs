//! HTTP surface: public health/root routes plus bearer-protected claim projections.

// crates.io
use axum::{
	Json, Router,
	extract::FromRequestParts,
	http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
	response::{IntoResponse, Response},
	routing::get,
};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	token::{Claims, TokenVerifier, VerificationError},
};

/// Shared state injected into every protected route.
#[derive(Clone)]
pub struct ApiState {
	/// Process-wide token verifier.
	pub verifier: Arc<TokenVerifier>,
}

/// Builds the gateway router over the given state.
pub fn router(state: ApiState) -> Router {
	Router::new()
		.route("/", get(root))
		.route("/api/health", get(health))
		.route("/api/profile", get(profile))
		.route("/api/protected", get(protected))
		.with_state(state)
}

/// Builds the CORS layer for the configured origins.
///
/// Credentials are allowed, so methods and headers mirror the request instead of using
/// wildcards (tower-http rejects wildcard grants alongside credentials).
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
	let origins = origins
		.iter()
		.map(|origin| origin.parse::<HeaderValue>())
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| ConfigError::invalid_var("CORS_ALLOWED_ORIGINS", e))?;

	Ok(CorsLayer::new()
		.allow_origin(origins)
		.allow_methods(AllowMethods::mirror_request())
		.allow_headers(AllowHeaders::mirror_request())
		.allow_credentials(true))
}

/// Verified claims extracted from the request's bearer token.
#[derive(Clone, Debug)]
pub struct AuthClaims(pub Claims);
impl FromRequestParts<ApiState> for AuthClaims {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &ApiState,
	) -> Result<Self, Self::Rejection> {
		let token = bearer_token(&parts.headers).ok_or_else(ApiError::not_authenticated)?;
		let claims = state.verifier.verify(token).await?;

		Ok(Self(claims))
	}
}

/// Error response rendered as `{"detail": ...}`, matching the gateway's JSON error shape.
#[derive(Clone, Debug)]
pub struct ApiError {
	status: StatusCode,
	detail: String,
}
impl ApiError {
	fn not_authenticated() -> Self {
		Self { status: StatusCode::UNAUTHORIZED, detail: "Not authenticated".into() }
	}
}
impl From<VerificationError> for ApiError {
	fn from(e: VerificationError) -> Self {
		let detail = match e {
			VerificationError::Expired => "Token has expired".into(),
			VerificationError::MalformedOrInvalidSignature { reason } =>
				format!("Invalid token: {reason}"),
			VerificationError::AudienceMismatch => "Invalid token: audience mismatch".into(),
			VerificationError::KeySetUnavailable { reason } =>
				format!("Could not validate credentials: {reason}"),
		};

		Self { status: StatusCode::UNAUTHORIZED, detail }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(ErrorBody { detail: self.detail })).into_response()
	}
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.split_once(' ')?;

	if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
		return None;
	}

	Some(token)
}

async fn root() -> Json<MessageBody> {
	Json(MessageBody { message: "Auth gateway API is running".into() })
}

async fn health() -> Json<HealthBody> {
	Json(HealthBody { status: "healthy" })
}

async fn profile(AuthClaims(claims): AuthClaims) -> Json<ProfileBody> {
	// The provider puts the record's username in a passthrough claim; use it when the
	// token carries no display name.
	let name = claims.name.clone().or_else(|| {
		claims
			.extra
			.get("cognito:username")
			.and_then(serde_json::Value::as_str)
			.map(str::to_owned)
	});

	Json(ProfileBody {
		sub: claims.sub,
		email: claims.email.unwrap_or_default(),
		name,
		picture: claims.picture,
	})
}

async fn protected(AuthClaims(claims): AuthClaims) -> Json<ProtectedBody> {
	Json(ProtectedBody {
		message: "This is a protected route".into(),
		user_id: claims.sub,
		email: claims.email.unwrap_or_default(),
	})
}

#[derive(Serialize)]
struct ErrorBody {
	detail: String,
}

#[derive(Serialize)]
struct MessageBody {
	message: String,
}

#[derive(Serialize)]
struct HealthBody {
	status: &'static str,
}

#[derive(Serialize)]
struct ProfileBody {
	sub: String,
	email: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	picture: Option<String>,
}

#[derive(Serialize)]
struct ProtectedBody {
	message: String,
	user_id: String,
	email: String,
}
