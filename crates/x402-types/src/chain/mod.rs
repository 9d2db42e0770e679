//! Chain identifiers for x402 payment processing.
//!
//! - [`ChainId`] - A CAIP-2 compliant chain identifier (e.g., `aptos:2` for Aptos testnet)

mod chain_id;

pub use chain_id::*;
