//! Protocol types for x402 payment messages.
//!
//! This module defines the wire format exchanged between a client, the
//! resource server, and the facilitator. Only protocol version 2 is
//! supported; version-specific envelopes live in [`v2`].
//!
//! # Key Types
//!
//! - [`VerifyResponse`] - Outcome of a facilitator `/verify` call
//! - [`SettleResponse`] - Outcome of a facilitator `/settle` call
//! - [`SettlementReceipt`] - Proof of settlement returned to the client
//!
//! # Wire Format
//!
//! All types serialize to JSON using camelCase field names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::chain::ChainId;

pub mod v2;

/// Reason reported for an invalid verification that carried none.
pub const UNSPECIFIED_REASON: &str = "unspecified";

/// Result returned by a facilitator after verifying a payment payload against
/// the provided payment requirements.
///
/// Wire form: `{ "isValid": bool, "payer"?: string, "invalidReason"?: string }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResponse {
    /// The payload matches the requirements and passes all checks.
    Valid { payer: Option<String> },
    /// The payload was well-formed but failed verification.
    Invalid {
        reason: String,
        payer: Option<String>,
    },
}

impl VerifyResponse {
    /// Constructs a successful verification response.
    pub fn valid(payer: Option<String>) -> Self {
        VerifyResponse::Valid { payer }
    }

    /// Constructs a failed verification response with the given `reason`.
    pub fn invalid(payer: Option<String>, reason: impl Into<String>) -> Self {
        VerifyResponse::Invalid {
            reason: reason.into(),
            payer,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResponse::Valid { .. })
    }

    pub fn payer(&self) -> Option<&str> {
        match self {
            VerifyResponse::Valid { payer } | VerifyResponse::Invalid { payer, .. } => {
                payer.as_deref()
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponseWire {
    is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invalid_reason: Option<String>,
}

impl Serialize for VerifyResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            VerifyResponse::Valid { payer } => VerifyResponseWire {
                is_valid: true,
                payer: payer.clone(),
                invalid_reason: None,
            },
            VerifyResponse::Invalid { reason, payer } => VerifyResponseWire {
                is_valid: false,
                payer: payer.clone(),
                invalid_reason: Some(reason.clone()),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerifyResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = VerifyResponseWire::deserialize(deserializer)?;
        let response = if wire.is_valid {
            VerifyResponse::Valid { payer: wire.payer }
        } else {
            VerifyResponse::Invalid {
                reason: wire
                    .invalid_reason
                    .unwrap_or_else(|| UNSPECIFIED_REASON.to_string()),
                payer: wire.payer,
            }
        };
        Ok(response)
    }
}

/// Response from a payment settlement request.
///
/// Wire form: `{ "success": bool, "transaction"?: string, "payer"?: string,
/// "errorReason"?: string, "network"?: string }`. A successful settlement
/// without a transaction id is rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleResponse {
    /// Settlement succeeded.
    Success {
        /// The on-chain transaction id.
        transaction: String,
        /// The address that paid, if the facilitator reported it.
        payer: Option<String>,
        /// The network where settlement occurred, if reported.
        network: Option<String>,
    },
    /// Settlement failed.
    Error {
        /// The reason for failure.
        reason: String,
        /// The network where settlement was attempted, if reported.
        network: Option<String>,
    },
}

impl SettleResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, SettleResponse::Success { .. })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettleResponseWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    network: Option<String>,
}

impl Serialize for SettleResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            SettleResponse::Success {
                transaction,
                payer,
                network,
            } => SettleResponseWire {
                success: true,
                error_reason: None,
                payer: payer.clone(),
                transaction: Some(transaction.clone()),
                network: network.clone(),
            },
            SettleResponse::Error { reason, network } => SettleResponseWire {
                success: false,
                error_reason: Some(reason.clone()),
                payer: None,
                transaction: None,
                network: network.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettleResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = SettleResponseWire::deserialize(deserializer)?;
        if wire.success {
            let transaction = wire
                .transaction
                .filter(|t| !t.is_empty())
                .ok_or_else(|| serde::de::Error::missing_field("transaction"))?;
            Ok(SettleResponse::Success {
                transaction,
                payer: wire.payer,
                network: wire.network,
            })
        } else {
            Ok(SettleResponse::Error {
                reason: wire
                    .error_reason
                    .unwrap_or_else(|| UNSPECIFIED_REASON.to_string()),
                network: wire.network,
            })
        }
    }
}

/// Proof of settlement handed back to the client in the `Payment-Response`
/// header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub success: bool,
    pub transaction: String,
    pub network: ChainId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl SettlementReceipt {
    /// A receipt for a successful settlement on `network`.
    pub fn settled(transaction: impl Into<String>, network: ChainId, payer: Option<String>) -> Self {
        Self {
            success: true,
            transaction: transaction.into(),
            network,
            payer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verify_response_valid() {
        let response: VerifyResponse =
            serde_json::from_value(json!({"isValid": true, "payer": "0xabc"})).unwrap();
        assert_eq!(response, VerifyResponse::valid(Some("0xabc".into())));
        assert_eq!(response.payer(), Some("0xabc"));
    }

    #[test]
    fn test_verify_response_invalid_without_reason() {
        let response: VerifyResponse =
            serde_json::from_value(json!({"isValid": false})).unwrap();
        assert_eq!(response, VerifyResponse::invalid(None, UNSPECIFIED_REASON));
    }

    #[test]
    fn test_verify_response_serializes_camel_case() {
        let value =
            serde_json::to_value(VerifyResponse::invalid(None, "insufficient_funds")).unwrap();
        assert_eq!(
            value,
            json!({"isValid": false, "invalidReason": "insufficient_funds"})
        );
    }

    #[test]
    fn test_settle_response_success() {
        let response: SettleResponse = serde_json::from_value(json!({
            "success": true,
            "transaction": "0xdeadbeef",
            "network": "aptos:2",
            "payer": "0xabc"
        }))
        .unwrap();
        assert_eq!(
            response,
            SettleResponse::Success {
                transaction: "0xdeadbeef".into(),
                payer: Some("0xabc".into()),
                network: Some("aptos:2".into()),
            }
        );
    }

    #[test]
    fn test_settle_response_success_requires_transaction() {
        assert!(serde_json::from_value::<SettleResponse>(json!({"success": true})).is_err());
        assert!(
            serde_json::from_value::<SettleResponse>(json!({"success": true, "transaction": ""}))
                .is_err()
        );
    }

    #[test]
    fn test_settle_response_error() {
        let response: SettleResponse = serde_json::from_value(json!({
            "success": false,
            "errorReason": "transaction_expired"
        }))
        .unwrap();
        assert_eq!(
            response,
            SettleResponse::Error {
                reason: "transaction_expired".into(),
                network: None,
            }
        );
    }

    #[test]
    fn test_settlement_receipt_wire() {
        let receipt = SettlementReceipt::settled("0x1", ChainId::new("aptos", "2"), None);
        assert_eq!(
            serde_json::to_value(&receipt).unwrap(),
            json!({"success": true, "transaction": "0x1", "network": "aptos:2"})
        );
    }
}
