//! Gateway server binary: loads configuration, wires the verifier, and serves the API.

// std
use std::{process, sync::Arc};
// crates.io
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
// self
use cognito_gateway::{
	api::{self, ApiState},
	config::GatewayConfig,
	token::{KeySetCache, TokenVerifier},
};

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	if let Err(e) = run().await {
		tracing::error!(error = %e, "Gateway failed.");
		process::exit(1);
	}
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
	let config = GatewayConfig::from_env()?;
	let client = reqwest::Client::new();
	let verifier = Arc::new(TokenVerifier::new(
		KeySetCache::new(client, config.key_set_url.clone()),
		&config.app_client_id,
	));
	let app = api::router(ApiState { verifier })
		.layer(api::cors_layer(&config.cors_origins)?)
		.layer(TraceLayer::new_for_http());
	let listener = TcpListener::bind(config.listen_addr).await?;

	tracing::info!(
		addr = %config.listen_addr,
		key_set = %config.key_set_url,
		"Gateway listening.",
	);

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Failed to install the shutdown handler.");
	}
}
