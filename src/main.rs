//! Pay-per-request fortune server.
//!
//! `POST /fortune` answers `402 Payment Required` with an x402 v2 challenge
//! until the client pays, through the configured facilitator, in USDC (or any
//! fungible asset) on Aptos.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `PAY_TO` (required), `FACILITATOR_URL`, `NETWORK`, `ASSET`, `AMOUNT`/`PRICE`
//! - `HOST`, `PORT` control the binding address
//! - `RUST_LOG` filters logs, `OTEL_*` enable OTLP export with the `telemetry` feature

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    x402_fortune::run::run().await
}
