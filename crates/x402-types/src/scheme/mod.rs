//! Payment scheme types.
//!
//! Only the Aptos `exact` scheme is supported: the client pays exactly the
//! required amount with a single fungible-asset transfer.

pub mod aptos_exact;
