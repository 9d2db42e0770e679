//! Header codec for x402 v2.
//!
//! Every protocol value that travels in an HTTP header is serialized to
//! JSON and then encoded as standard base64 with padding:
//!
//! | Header              | Value                                   |
//! |---------------------|-----------------------------------------|
//! | `Payment-Required`  | [`PaymentRequired`] challenge           |
//! | `Payment-Signature` | [`PaymentPayload`] from the client      |
//! | `Payment-Response`  | [`SettlementReceipt`] after settlement  |
//!
//! The codec checks structure only. Whether a payload actually pays for
//! anything is for the facilitator to decide.
//!
//! ```
//! use x402_types::codec;
//! use x402_types::proto::SettlementReceipt;
//! use x402_types::chain::ChainId;
//!
//! let receipt = SettlementReceipt::settled("0xabc", ChainId::new("aptos", "2"), None);
//! let header = codec::encode_receipt(&receipt).unwrap();
//! let decoded: SettlementReceipt = codec::decode_header(header.as_bytes()).unwrap();
//! assert_eq!(decoded, receipt);
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::proto::SettlementReceipt;
use crate::scheme::aptos_exact::{PaymentPayload, PaymentRequired};

/// Header carrying the base64-encoded 402 challenge.
pub const PAYMENT_REQUIRED_HEADER: &str = "Payment-Required";
/// Header carrying the client's base64-encoded payment payload.
pub const PAYMENT_SIGNATURE_HEADER: &str = "Payment-Signature";
/// Header carrying the base64-encoded settlement receipt.
pub const PAYMENT_RESPONSE_HEADER: &str = "Payment-Response";

/// Failure to encode or decode a header value.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing or empty field: {0}")]
    MissingField(&'static str),
}

/// Serializes `value` to JSON and encodes it as base64.
pub fn encode_header<T: Serialize>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_vec(value)?;
    Ok(b64.encode(json))
}

/// Decodes base64 header bytes and parses the JSON inside as `T`.
///
/// Surrounding ASCII whitespace is ignored; proxies occasionally pad header values.
pub fn decode_header<T: DeserializeOwned>(header: &[u8]) -> Result<T, CodecError> {
    let json = b64.decode(header.trim_ascii())?;
    let value = serde_json::from_slice(&json)?;
    Ok(value)
}

pub fn encode_challenge(challenge: &PaymentRequired) -> Result<String, CodecError> {
    encode_header(challenge)
}

pub fn decode_challenge(header: &[u8]) -> Result<PaymentRequired, CodecError> {
    decode_header(header)
}

/// Decodes the `Payment-Signature` header into a [`PaymentPayload`].
///
/// Fails on invalid base64, invalid JSON, an `x402Version` other than `2`,
/// or an empty `payload.transaction`.
pub fn decode_payload(header: &[u8]) -> Result<PaymentPayload, CodecError> {
    let payload: PaymentPayload = decode_header(header)?;
    if payload.payload.transaction.trim().is_empty() {
        return Err(CodecError::MissingField("payload.transaction"));
    }
    Ok(payload)
}

pub fn encode_receipt(receipt: &SettlementReceipt) -> Result<String, CodecError> {
    encode_header(receipt)
}
