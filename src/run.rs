//! Server entrypoint.
//!
//! - Loads `.env`, installs logging (and OTLP export with the `telemetry` feature).
//! - Loads and validates [`Config`]; a bad configuration stops the process here.
//! - Serves `/fortune` and `/health` until SIGTERM or SIGINT.

use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use x402_paygate::{FacilitatorClient, PaymentGate};

use crate::config::Config;
use crate::fortune::FortuneTeller;
use crate::handlers::{self, AppState};
use crate::util::{SigDown, Telemetry};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let crypto_provider =
        rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider());

    dotenv().ok();

    let telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    if crypto_provider.is_err() {
        tracing::warn!("A rustls crypto provider was already installed");
    }

    let config = Config::load().inspect_err(|e| tracing::error!("Invalid configuration: {e}"))?;

    let facilitator = FacilitatorClient::try_from(config.facilitator_url().as_str())?
        .with_timeout(config.facilitator_timeout());
    let requirements = config.requirements()?;
    let price = config.price();
    tracing::info!(
        network = %price.network,
        asset = %price.asset,
        amount = %price.amount,
        pay_to = %price.pay_to,
        facilitator = %config.facilitator_url(),
        "Payment requirements"
    );

    let gate = PaymentGate::new(
        facilitator,
        FortuneTeller::new(),
        requirements,
        config.gate_options(),
    );
    let state = Arc::new(AppState::new(gate, config.facilitator_url().clone()));
    let http_endpoints = handlers::app(state).layer(telemetry.http_tracing());

    let addr = SocketAddr::new(config.host(), config.port());
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| tracing::error!("Failed to bind to {}: {}", addr, e))?;

    let sig_down = SigDown::try_new()?;
    let axum_cancellation_token = sig_down.cancellation_token();
    let axum_graceful_shutdown = async move { axum_cancellation_token.cancelled().await };
    axum::serve(listener, http_endpoints)
        .with_graceful_shutdown(axum_graceful_shutdown)
        .await?;
    sig_down.recv().await;

    tracing::info!("Server stopped");
    Ok(())
}
