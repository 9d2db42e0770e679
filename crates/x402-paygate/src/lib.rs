//! Payment gate for [x402](https://www.x402.org) v2 resources settled on Aptos.
//!
//! A request for a protected resource goes through [`PaymentGate`]:
//!
//! 1. No `Payment-Signature` header: answer `402` with a `Payment-Required`
//!    challenge built by [`RequirementsBuilder`].
//! 2. Header present: decode it, ask the facilitator to verify and then
//!    settle the payment against the server's own requirements.
//! 3. Settled: ask the [`ResourceHandler`] for the artifact and answer `200`
//!    with a `Payment-Response` receipt.
//!
//! ```rust,no_run
//! use axum::http::{HeaderMap, Uri};
//! use x402_paygate::{FacilitatorClient, GateOptions, PaymentGate, PriceTag, RequirementsBuilder};
//! use x402_paygate::resource::{ResourceError, ResourceHandler};
//! use x402_types::chain::ChainId;
//! use x402_types::networks::{KnownNetworkAptos, USDC};
//!
//! struct Hello;
//!
//! impl ResourceHandler for Hello {
//!     type Artifact = serde_json::Value;
//!     fn deliver(&self) -> Result<Self::Artifact, ResourceError> {
//!         Ok(serde_json::json!({ "hello": "world" }))
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let usdc = USDC::aptos_testnet();
//! let requirements = RequirementsBuilder::try_new(PriceTag {
//!     network: ChainId::aptos_testnet(),
//!     asset: usdc.address.to_string(),
//!     amount: usdc.parse("0.01")?,
//!     pay_to: "0x1".to_string(),
//!     max_timeout_seconds: 600,
//!     sponsored: true,
//! })?;
//! let facilitator = FacilitatorClient::try_from("https://facilitator.x402.rs")?;
//! let gate = PaymentGate::new(facilitator, Hello, requirements, GateOptions::default());
//!
//! let response = gate.handle_request(&HeaderMap::new(), &Uri::from_static("/hello")).await;
//! assert_eq!(response.status(), 402);
//! # Ok(())
//! # }
//! ```

pub mod facilitator;
pub mod facilitator_client;
pub mod paygate;
pub mod requirements;
pub mod resource;

pub use facilitator::Facilitator;
pub use facilitator_client::{FacilitatorClient, FacilitatorClientError};
pub use paygate::{GateOptions, GateState, PaygateError, PaymentGate};
pub use requirements::{PriceTag, RequirementsBuilder, RequirementsError, ResourceInfoBuilder};
pub use resource::{ResourceError, ResourceHandler};
