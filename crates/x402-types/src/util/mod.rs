//! Utility types for x402.
//!
//! - [`lit_str`] - Compile-time string literal types
//! - [`money_amount`] - Human-readable currency amount parsing
//! - [`token_amount`] - Positive amounts in atomic token units

pub mod lit_str;
pub mod money_amount;
pub mod token_amount;

pub use money_amount::*;
pub use token_amount::*;
