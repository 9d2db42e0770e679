//! Trait defining the verification and settlement interface of an x402 facilitator.
//!
//! The gate only ever talks to a facilitator through this trait, so tests can
//! swap the HTTP [`FacilitatorClient`](crate::FacilitatorClient) for an
//! in-process double.

use std::fmt::{Debug, Display};
use std::sync::Arc;

use x402_types::proto::{SettleResponse, VerifyResponse};
use x402_types::scheme::aptos_exact::{SettleRequest, VerifyRequest};

/// Asynchronous interface of an x402 payment facilitator.
///
/// `Err` stands for a failure to get an answer at all (transport, timeout,
/// malformed response). A negative answer (`isValid: false`,
/// `success: false`) is an `Ok` value.
pub trait Facilitator {
    /// The error type returned by this facilitator.
    type Error: Debug + Display;

    /// Checks a payment payload against the requirements in `request`
    /// without moving any funds.
    fn verify(
        &self,
        request: &VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send;

    /// Submits the payment on-chain and reports the transaction id.
    fn settle(
        &self,
        request: &SettleRequest,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send;
}

impl<T: Facilitator> Facilitator for Arc<T> {
    type Error = T::Error;

    fn verify(
        &self,
        request: &VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send {
        self.as_ref().verify(request)
    }

    fn settle(
        &self,
        request: &SettleRequest,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send {
        self.as_ref().settle(request)
    }
}
