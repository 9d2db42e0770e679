//! The x402 payment gate: a verify-then-settle state machine in front of a
//! protected resource.
//!
//! ```text
//! NoPayment ──► Decoded ──► Verifying ──► Verified ──► Settling ──► Fulfilled
//!     │            │            │                          │
//!     ▼            ▼            ▼                          ▼
//!    402     Rejected(400)  Rejected(402) / Faulted(502)  Rejected(402) / Faulted(502)
//! ```
//!
//! The gate never trusts the requirements a client embeds in its payload:
//! the facilitator is always asked to check the payload against the
//! server's own [`RequirementsBuilder::build`] output.
//!
//! [`PaymentGate::handle_request`] is infallible. Every [`PaygateError`] is
//! turned into an HTTP response at the boundary:
//!
//! | Outcome                          | Status | Headers            |
//! |----------------------------------|--------|--------------------|
//! | No `Payment-Signature`           | 402    | `Payment-Required` |
//! | Malformed payload                | 400    |                    |
//! | Verification/settlement rejected | 402    | `Payment-Required` |
//! | Facilitator unreachable/timeout  | 502    |                    |
//! | Internal fault                   | 500    |                    |
//! | Settled, artifact failed         | 500    | `Payment-Response` |
//! | Settled and delivered            | 200    | `Payment-Response` |

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::fmt::Display;
use std::time::Duration;
use tracing::instrument;
use x402_types::chain::ChainId;
use x402_types::codec::{self, CodecError};
use x402_types::proto::v2::X402Version2;
use x402_types::proto::{SettleResponse, SettlementReceipt, VerifyResponse};
use x402_types::scheme::aptos_exact::{PaymentRequirements, VerifyRequest};

use crate::facilitator::Facilitator;
use crate::requirements::RequirementsBuilder;
use crate::resource::ResourceHandler;

/// `Payment-Signature`: the client's base64-encoded payment payload.
pub const PAYMENT_SIGNATURE: HeaderName = HeaderName::from_static("payment-signature");
/// `Payment-Required`: the base64-encoded 402 challenge.
pub const PAYMENT_REQUIRED: HeaderName = HeaderName::from_static("payment-required");
/// `Payment-Response`: the base64-encoded settlement receipt.
pub const PAYMENT_RESPONSE: HeaderName = HeaderName::from_static("payment-response");

const REQUIREMENTS_MISMATCH: &str = "payment requirements mismatch";

/// Tuning knobs of a [`PaymentGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOptions {
    /// Ask the facilitator to verify before settling. When `false` the gate
    /// settles directly, saving one round trip.
    pub verify_before_settle: bool,
    /// Reject locally a payload whose accepted requirements differ from the
    /// server's, before calling the facilitator.
    pub precheck_requirements: bool,
    /// Upper bound of a single facilitator call. Never longer than the
    /// requirements' `maxTimeoutSeconds`.
    pub facilitator_timeout: Duration,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            verify_before_settle: true,
            precheck_requirements: false,
            facilitator_timeout: Duration::from_secs(30),
        }
    }
}

/// States a request goes through inside the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NoPayment,
    Decoded,
    Verifying,
    Verified,
    Settling,
    Fulfilled,
    Rejected,
    Faulted,
}

impl Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateState::NoPayment => "no_payment",
            GateState::Decoded => "decoded",
            GateState::Verifying => "verifying",
            GateState::Verified => "verified",
            GateState::Settling => "settling",
            GateState::Fulfilled => "fulfilled",
            GateState::Rejected => "rejected",
            GateState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Why a request did not end in a delivered artifact.
#[derive(Debug, thiserror::Error)]
pub enum PaygateError {
    #[error("Payment-Signature header is required")]
    PaymentRequired,
    #[error("Invalid payment payload: {0}")]
    MalformedPayload(#[from] CodecError),
    #[error("Verification failed: {0}")]
    VerificationFailed(String),
    #[error("Settlement failed: {0}")]
    SettlementFailed(String),
    #[error("Facilitator unavailable: {0}")]
    FacilitatorUnreachable(String),
    #[error("Internal fault: {0}")]
    InternalFault(String),
    /// The payment settled, but the artifact could not be produced.
    #[error("Settled payment {} could not be delivered: {details}", receipt.transaction)]
    Undelivered {
        receipt: SettlementReceipt,
        details: String,
    },
}

impl PaygateError {
    /// The terminal state this error leaves the gate in.
    pub fn state(&self) -> GateState {
        match self {
            PaygateError::PaymentRequired => GateState::NoPayment,
            PaygateError::MalformedPayload(_)
            | PaygateError::VerificationFailed(_)
            | PaygateError::SettlementFailed(_) => GateState::Rejected,
            PaygateError::FacilitatorUnreachable(_)
            | PaygateError::InternalFault(_)
            | PaygateError::Undelivered { .. } => GateState::Faulted,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PaygateError::PaymentRequired
            | PaygateError::VerificationFailed(_)
            | PaygateError::SettlementFailed(_) => StatusCode::PAYMENT_REQUIRED,
            PaygateError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            PaygateError::FacilitatorUnreachable(_) => StatusCode::BAD_GATEWAY,
            PaygateError::InternalFault(_) | PaygateError::Undelivered { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Payment gate in front of one resource.
///
/// Shared read-only between requests; wrap it in an `Arc`.
pub struct PaymentGate<F, H> {
    facilitator: F,
    resource: H,
    requirements: RequirementsBuilder,
    options: GateOptions,
}

impl<F, H> PaymentGate<F, H> {
    pub fn new(
        facilitator: F,
        resource: H,
        requirements: RequirementsBuilder,
        options: GateOptions,
    ) -> Self {
        Self {
            facilitator,
            resource,
            requirements,
            options,
        }
    }

    pub fn facilitator(&self) -> &F {
        &self.facilitator
    }

    pub fn requirements(&self) -> &RequirementsBuilder {
        &self.requirements
    }

    pub fn options(&self) -> &GateOptions {
        &self.options
    }

    /// Effective timeout of one facilitator call.
    pub fn call_timeout(&self) -> Duration {
        let max = Duration::from_secs(self.requirements.requirements().max_timeout_seconds);
        self.options.facilitator_timeout.min(max)
    }
}

impl<F, H> PaymentGate<F, H>
where
    F: Facilitator + Sync,
    H: ResourceHandler + Sync,
{
    /// Runs a request through the gate and answers it.
    #[instrument(name = "x402.handle_request", skip_all, fields(uri = %request_uri))]
    pub async fn handle_request(&self, headers: &HeaderMap, request_uri: &Uri) -> Response {
        match self.handle_request_fallible(headers).await {
            Ok(response) => response,
            Err(err) => self.error_into_response(err, request_uri),
        }
    }

    /// Runs a request through the gate, returning failures as [`PaygateError`]
    /// instead of turning them into responses.
    pub async fn handle_request_fallible(
        &self,
        headers: &HeaderMap,
    ) -> Result<Response, PaygateError> {
        let header = extract_payment_header(headers).ok_or(PaygateError::PaymentRequired)?;
        let payload = codec::decode_payload(header)?;
        transition(GateState::Decoded);

        let requirements = self.requirements.build();
        if self.options.precheck_requirements && !accepted_matches(&payload.accepted, &requirements)
        {
            return Err(PaygateError::VerificationFailed(
                REQUIREMENTS_MISMATCH.to_string(),
            ));
        }
        let request = VerifyRequest::new(payload, requirements);

        let verified_payer = if self.options.verify_before_settle {
            transition(GateState::Verifying);
            let verification = self
                .call_facilitator("verify", self.facilitator.verify(&request))
                .await?;
            match verification {
                VerifyResponse::Valid { payer } => {
                    transition(GateState::Verified);
                    payer
                }
                VerifyResponse::Invalid { reason, .. } => {
                    return Err(PaygateError::VerificationFailed(reason));
                }
            }
        } else {
            None
        };

        transition(GateState::Settling);
        let guard = SettlementGuard::arm(
            verified_payer.clone(),
            request.payment_requirements.network.clone(),
        );
        let outcome = self.settle_and_deliver(&request, verified_payer).await;
        guard.disarm();
        outcome
    }

    async fn settle_and_deliver(
        &self,
        request: &VerifyRequest,
        verified_payer: Option<String>,
    ) -> Result<Response, PaygateError> {
        let settlement = self
            .call_facilitator("settle", self.facilitator.settle(request))
            .await
            .inspect_err(|err| {
                tracing::error!(
                    error = %err,
                    payer = ?verified_payer,
                    "Settlement outcome unknown"
                )
            })?;
        let (transaction, settled_payer) = match settlement {
            SettleResponse::Success {
                transaction, payer, ..
            } => (transaction, payer),
            SettleResponse::Error { reason, .. } => {
                return Err(PaygateError::SettlementFailed(reason));
            }
        };
        transition(GateState::Fulfilled);

        let network = request.payment_requirements.network.clone();
        let receipt =
            SettlementReceipt::settled(transaction, network, settled_payer.or(verified_payer));
        tracing::info!(
            transaction = %receipt.transaction,
            payer = ?receipt.payer,
            network = %receipt.network,
            "Payment settled"
        );

        let receipt_header = receipt_header(&receipt).map_err(|details| PaygateError::Undelivered {
            receipt: receipt.clone(),
            details,
        })?;
        let body = self
            .resource
            .deliver()
            .map_err(|err| err.to_string())
            .and_then(|artifact| {
                artifact_body(artifact, &receipt.transaction).map_err(|err| err.to_string())
            })
            .map_err(|details| PaygateError::Undelivered {
                receipt: receipt.clone(),
                details,
            })?;

        Ok((StatusCode::OK, [(PAYMENT_RESPONSE, receipt_header)], Json(body)).into_response())
    }

    /// Awaits a facilitator call under [`PaymentGate::call_timeout`].
    async fn call_facilitator<T, E: Display>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, PaygateError> {
        let timeout = self.call_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(PaygateError::FacilitatorUnreachable(format!(
                "{operation}: {err}"
            ))),
            Err(_) => Err(PaygateError::FacilitatorUnreachable(format!(
                "{operation}: no answer within {}s",
                timeout.as_secs_f64()
            ))),
        }
    }
}

impl<F, H> PaymentGate<F, H> {
    /// Maps a [`PaygateError`] to its HTTP response.
    pub fn error_into_response(&self, err: PaygateError, request_uri: &Uri) -> Response {
        let state = err.state();
        match &err {
            PaygateError::PaymentRequired => tracing::info!(%state, "Payment required"),
            PaygateError::MalformedPayload(_)
            | PaygateError::VerificationFailed(_)
            | PaygateError::SettlementFailed(_) => tracing::warn!(%state, error = %err, "Payment rejected"),
            PaygateError::FacilitatorUnreachable(_) | PaygateError::InternalFault(_) => {
                tracing::error!(%state, error = %err, "Payment faulted")
            }
            PaygateError::Undelivered { receipt, details } => tracing::error!(
                %state,
                transaction = %receipt.transaction,
                payer = ?receipt.payer,
                details = %details,
                "Settled payment could not be delivered"
            ),
        }

        let status = err.status_code();
        match err {
            PaygateError::PaymentRequired => self.challenge_response(
                request_uri,
                err.to_string(),
                json!({ "error": "Payment required", "x402Version": X402Version2 }),
            ),
            PaygateError::VerificationFailed(ref reason) => self.challenge_response(
                request_uri,
                err.to_string(),
                json!({ "error": "Payment verification failed", "reason": reason }),
            ),
            PaygateError::SettlementFailed(ref reason) => self.challenge_response(
                request_uri,
                err.to_string(),
                json!({ "error": "Payment settlement failed", "reason": reason }),
            ),
            PaygateError::MalformedPayload(source) => (
                status,
                Json(json!({ "error": "Invalid payment payload", "details": source.to_string() })),
            )
                .into_response(),
            PaygateError::FacilitatorUnreachable(details) => (
                status,
                Json(json!({ "error": "Facilitator unavailable", "details": details })),
            )
                .into_response(),
            PaygateError::InternalFault(_) => (
                status,
                Json(json!({ "error": "Internal server error", "details": "internal fault" })),
            )
                .into_response(),
            PaygateError::Undelivered { receipt, .. } => {
                let body = Json(json!({
                    "error": "Internal server error",
                    "details": "payment settled but the resource could not be delivered",
                    "transaction": receipt.transaction,
                }));
                match receipt_header(&receipt) {
                    Ok(header) => (status, [(PAYMENT_RESPONSE, header)], body).into_response(),
                    Err(_) => (status, body).into_response(),
                }
            }
        }
    }

    /// A 402 answer carrying a fresh challenge in `Payment-Required`.
    fn challenge_response(
        &self,
        request_uri: &Uri,
        error: String,
        body: serde_json::Value,
    ) -> Response {
        let challenge = self.requirements.payment_required(request_uri, Some(error));
        let header = codec::encode_challenge(&challenge)
            .map_err(|err| err.to_string())
            .and_then(into_header_value);
        match header {
            Ok(header) => (
                StatusCode::PAYMENT_REQUIRED,
                [(PAYMENT_REQUIRED, header)],
                Json(body),
            )
                .into_response(),
            Err(err) => self.error_into_response(
                PaygateError::InternalFault(format!("failed to encode payment challenge: {err}")),
                request_uri,
            ),
        }
    }
}

/// Logs an error if dropped while armed.
///
/// Armed when the gate starts settling, disarmed once the gate produced its
/// final response. Dropping it armed means the request future was cancelled
/// (client gone) while the payment may have been settled.
struct SettlementGuard {
    armed: bool,
    payer: Option<String>,
    network: ChainId,
}

impl SettlementGuard {
    fn arm(payer: Option<String>, network: ChainId) -> Self {
        Self {
            armed: true,
            payer,
            network,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SettlementGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::error!(
                payer = ?self.payer,
                network = %self.network,
                "Settlement outcome unknown; response undeliverable"
            );
        }
    }
}

fn transition(state: GateState) {
    tracing::debug!(%state, "x402.gate.transition");
}

/// Extracts the payment header value from the header map.
fn extract_payment_header(header_map: &HeaderMap) -> Option<&[u8]> {
    header_map.get(PAYMENT_SIGNATURE).map(|h| h.as_bytes())
}

/// Fields compared by the local precheck: scheme, network, amount, asset, payTo.
fn accepted_matches(accepted: &PaymentRequirements, expected: &PaymentRequirements) -> bool {
    accepted.scheme == expected.scheme
        && accepted.network == expected.network
        && accepted.amount == expected.amount
        && accepted.asset.eq_ignore_ascii_case(&expected.asset)
        && accepted.pay_to.eq_ignore_ascii_case(&expected.pay_to)
}

/// The artifact's JSON fields plus `transaction`. A non-object artifact is
/// nested under `artifact`.
fn artifact_body<A: Serialize>(
    artifact: A,
    transaction: &str,
) -> Result<serde_json::Value, serde_json::Error> {
    let mut body = match serde_json::to_value(artifact)? {
        serde_json::Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("artifact".to_string(), other);
            map
        }
    };
    body.insert("transaction".to_string(), transaction.into());
    Ok(serde_json::Value::Object(body))
}

fn receipt_header(receipt: &SettlementReceipt) -> Result<HeaderValue, String> {
    codec::encode_receipt(receipt)
        .map_err(|err| err.to_string())
        .and_then(into_header_value)
}

fn into_header_value(encoded: String) -> Result<HeaderValue, String> {
    HeaderValue::try_from(encoded).map_err(|err| err.to_string())
}
