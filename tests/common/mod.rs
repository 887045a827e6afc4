//! Shared signing fixtures for the integration tests.

#![allow(dead_code)]

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use time::OffsetDateTime;

/// RSA private key used to sign test tokens; [`jwks_json`] publishes the matching public
/// key.
pub const PRIVATE_KEY_PEM: &str = include_str!("../fixtures/jwt_rsa.pem");
/// Key id advertised both in signed token headers and in the published key set.
pub const KID: &str = "test-key-1";
/// App client id accepted as the token audience.
pub const AUDIENCE: &str = "client-123";

const MODULUS: &str = "sr5U5MScfH3gguy3SmFwClAZp1K811YcCrhtbnjGhRFShpFf_b5Q_gP0Mq4mkLoJWOxAib0b9q5jl3NI0VRGHVZReTkVCyCdiNIkCr3TDjM91FLSWFpOS1VdXenyZdyM7wOG8esyEKFwGiKhWM_E50PP7a_ixYGJ0fgzRb1gffh7BqwJPk92_AT2k6HvdEMK53Bao4L7pjDqZvPD4idAZKToS7nA0WtsJQ57V-f0dwNyTG3e6xt3a48DY0M24VueqehS5nf3z0rKOpQg6TsKXaygrcMuqPHez8udi_9vXBjqgxyBdbb9khpRYiaBg7BToB4_CwAh2q6mZEAj-KaaTw";
const EXPONENT: &str = "AQAB";

/// Key-set document the mocked endpoint serves, containing the single fixture key.
pub fn jwks_json() -> Value {
	json!({ "keys": [jwk_json(KID)] })
}

/// One public-key entry under the given key id.
pub fn jwk_json(kid: &str) -> Value {
	json!({
		"kty": "RSA",
		"alg": "RS256",
		"use": "sig",
		"kid": kid,
		"n": MODULUS,
		"e": EXPONENT,
	})
}

/// Baseline claims for a token that expires `lifetime_secs` from now.
///
/// Pass a value well below `-60` for an expired token; verification applies the usual
/// clock-skew leeway.
pub fn claims(aud: &str, lifetime_secs: i64) -> Value {
	json!({
		"sub": "user-1",
		"email": "user@example.com",
		"aud": aud,
		"exp": OffsetDateTime::now_utc().unix_timestamp() + lifetime_secs,
	})
}

/// Signs `claims` with the fixture key under the given key id.
pub fn sign_token(kid: &str, claims: &Value) -> String {
	let mut header = Header::new(Algorithm::RS256);

	header.kid = Some(kid.into());

	let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM.as_bytes())
		.expect("Fixture RSA key should parse.");

	jsonwebtoken::encode(&header, claims, &key).expect("Test token should sign successfully.")
}
