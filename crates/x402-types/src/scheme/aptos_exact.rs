//! V2 Aptos "exact" payment scheme types.
//!
//! These aliases pin the generic [`v2`] envelopes to the concrete types used
//! on Aptos: the `"exact"` scheme literal, amounts as [`TokenAmount`], and a
//! [`ExactAptosPayload`] carrying the client-signed transaction.

use serde::{Deserialize, Serialize};

use crate::lit_str;
use crate::proto::v2;
use crate::proto::v2::OtherFields;
use crate::util::TokenAmount;

lit_str!(ExactScheme, "exact");

/// The V2 Aptos exact scheme verify request.
pub type VerifyRequest = v2::VerifyRequest<PaymentPayload, PaymentRequirements>;

/// The V2 Aptos exact scheme settle request.
pub type SettleRequest = VerifyRequest;

/// The payment payload for Aptos exact scheme.
pub type PaymentPayload = v2::PaymentPayload<PaymentRequirements, ExactAptosPayload>;

/// The payment requirements for Aptos exact scheme.
pub type PaymentRequirements = v2::PaymentRequirements<ExactScheme, TokenAmount, String, AptosExtra>;

/// The 402 challenge for Aptos exact scheme.
pub type PaymentRequired = v2::PaymentRequired<PaymentRequirements>;

/// The transaction payload containing the signed Aptos transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactAptosPayload {
    /// Base64-encoded BCS transaction and authenticator. Opaque to the server.
    pub transaction: String,
    #[serde(flatten)]
    pub other: OtherFields,
}

impl ExactAptosPayload {
    pub fn new<T: Into<String>>(transaction: T) -> Self {
        Self {
            transaction: transaction.into(),
            other: OtherFields::new(),
        }
    }
}

/// Scheme-specific `extra` of Aptos payment requirements.
///
/// Fields other than `sponsored` (a facilitator's `feePayer`, for one) are
/// kept in `other`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AptosExtra {
    /// Whether the facilitator pays the gas (sponsored transaction).
    #[serde(default)]
    pub sponsored: bool,
    #[serde(flatten)]
    pub other: OtherFields,
}

impl AptosExtra {
    pub fn sponsored(sponsored: bool) -> Self {
        Self {
            sponsored,
            other: OtherFields::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;
    use serde_json::json;

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: ExactScheme,
            network: ChainId::new("aptos", "2"),
            amount: TokenAmount(10_000),
            pay_to: "0x1".into(),
            max_timeout_seconds: 600,
            asset: "0xa".into(),
            extra: AptosExtra::sponsored(true),
            other: OtherFields::new(),
        }
    }

    #[test]
    fn test_requirements_wire_shape() {
        assert_eq!(
            serde_json::to_value(requirements()).unwrap(),
            json!({
                "scheme": "exact",
                "network": "aptos:2",
                "amount": "10000",
                "payTo": "0x1",
                "maxTimeoutSeconds": 600,
                "asset": "0xa",
                "extra": {"sponsored": true}
            })
        );
    }

    #[test]
    fn test_requirements_reject_other_scheme() {
        let mut value = serde_json::to_value(requirements()).unwrap();
        value["scheme"] = json!("upto");
        assert!(serde_json::from_value::<PaymentRequirements>(value).is_err());
    }

    #[test]
    fn test_extra_keeps_fee_payer() {
        let sent = json!({"sponsored": true, "feePayer": "0x2"});
        let extra: AptosExtra = serde_json::from_value(sent.clone()).unwrap();
        assert!(extra.sponsored);
        assert_eq!(extra.other["feePayer"], "0x2");
        assert_eq!(serde_json::to_value(&extra).unwrap(), sent);
    }
}
