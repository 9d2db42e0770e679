//! Payment requirements for a protected resource.
//!
//! [`RequirementsBuilder`] validates the operator's [`PriceTag`] once at
//! startup and then produces the same [`PaymentRequirements`] for every
//! request. The resource description attached to the 402 challenge comes
//! from a [`ResourceInfoBuilder`].

use http::Uri;
use std::sync::LazyLock;
use url::Url;
use x402_types::chain::ChainId;
use x402_types::proto::v2::{OtherFields, ResourceInfo, X402Version2};
use x402_types::scheme::aptos_exact::{
    AptosExtra, ExactScheme, PaymentRequired, PaymentRequirements,
};
use x402_types::util::TokenAmount;

/// The price of a resource as configured by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTag {
    pub network: ChainId,
    /// Fungible-asset address of the token to pay with.
    pub asset: String,
    /// Price in atomic units of `asset`.
    pub amount: TokenAmount,
    /// Recipient address.
    pub pay_to: String,
    pub max_timeout_seconds: u64,
    /// Whether the facilitator sponsors gas.
    pub sponsored: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequirementsError {
    #[error("Recipient address (payTo) is not set")]
    MissingPayTo,
    #[error("Asset address is not set")]
    MissingAsset,
    #[error("Network is not set")]
    MissingNetwork,
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    #[error("maxTimeoutSeconds must be greater than zero")]
    ZeroTimeout,
}

/// Builder for the resource description that goes into a 402 challenge.
#[derive(Debug, Clone)]
pub struct ResourceInfoBuilder {
    /// Description of the protected resource
    pub description: String,
    /// MIME type of the protected resource
    pub mime_type: String,
    /// Optional explicit URL of the protected resource
    pub url: Option<String>,
}

impl Default for ResourceInfoBuilder {
    fn default() -> Self {
        Self {
            description: "".to_string(),
            mime_type: "application/json".to_string(),
            url: None,
        }
    }
}

impl ResourceInfoBuilder {
    /// Determines the resource URL (static or dynamic).
    ///
    /// If `url` is set, returns it directly. Otherwise, constructs a URL by combining
    /// the base URL with the request URI's path and query.
    pub fn as_resource_info(&self, base_url: &Url, request_uri: &Uri) -> ResourceInfo {
        ResourceInfo {
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            url: self.url.clone().unwrap_or_else(|| {
                let mut url = base_url.clone();
                url.set_path(request_uri.path());
                url.set_query(request_uri.query());
                url.to_string()
            }),
            other: OtherFields::new(),
        }
    }
}

/// Base URL used when none is configured. Avoid in production.
static DEFAULT_BASE_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost/").expect("valid url"));

/// Produces the canonical payment requirements of one resource class.
#[derive(Debug, Clone)]
pub struct RequirementsBuilder {
    requirements: PaymentRequirements,
    resource: ResourceInfoBuilder,
    base_url: Url,
}

impl RequirementsBuilder {
    /// Validates `price` and freezes it into payment requirements.
    ///
    /// # Errors
    ///
    /// Fails when the recipient, asset or network is empty, or when the
    /// amount or timeout is zero.
    pub fn try_new(price: PriceTag) -> Result<Self, RequirementsError> {
        if price.pay_to.trim().is_empty() {
            return Err(RequirementsError::MissingPayTo);
        }
        if price.asset.trim().is_empty() {
            return Err(RequirementsError::MissingAsset);
        }
        if price.network.namespace.is_empty() || price.network.reference.is_empty() {
            return Err(RequirementsError::MissingNetwork);
        }
        if price.amount.is_zero() {
            return Err(RequirementsError::ZeroAmount);
        }
        if price.max_timeout_seconds == 0 {
            return Err(RequirementsError::ZeroTimeout);
        }
        let requirements = PaymentRequirements {
            scheme: ExactScheme,
            network: price.network,
            amount: price.amount,
            pay_to: price.pay_to,
            max_timeout_seconds: price.max_timeout_seconds,
            asset: price.asset,
            extra: AptosExtra::sponsored(price.sponsored),
            other: OtherFields::new(),
        };
        Ok(Self {
            requirements,
            resource: ResourceInfoBuilder::default(),
            base_url: DEFAULT_BASE_URL.clone(),
        })
    }

    pub fn with_resource(mut self, resource: ResourceInfoBuilder) -> Self {
        self.resource = resource;
        self
    }

    /// Sets the base URL that request paths are resolved against.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The payment requirements. Pure: every call returns an equal value.
    pub fn build(&self) -> PaymentRequirements {
        self.requirements.clone()
    }

    pub fn requirements(&self) -> &PaymentRequirements {
        &self.requirements
    }

    /// Describes the resource reached through `request_uri`.
    pub fn resource_info(&self, request_uri: &Uri) -> ResourceInfo {
        self.resource.as_resource_info(&self.base_url, request_uri)
    }

    /// The 402 challenge for `request_uri`.
    pub fn payment_required(&self, request_uri: &Uri, error: Option<String>) -> PaymentRequired {
        PaymentRequired {
            x402_version: X402Version2,
            error,
            resource: self.resource_info(request_uri),
            accepts: vec![self.build()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price() -> PriceTag {
        PriceTag {
            network: ChainId::new("aptos", "2"),
            asset: "0xa".into(),
            amount: TokenAmount(10_000),
            pay_to: "0x1".into(),
            max_timeout_seconds: 600,
            sponsored: true,
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = RequirementsBuilder::try_new(price()).unwrap();
        assert_eq!(builder.build(), builder.build());
        let requirements = builder.build();
        assert_eq!(requirements.amount, TokenAmount(10_000));
        assert_eq!(requirements.network.to_string(), "aptos:2");
        assert!(requirements.extra.sponsored);
    }

    #[test]
    fn test_rejects_missing_pay_to() {
        let price = PriceTag {
            pay_to: "  ".into(),
            ..price()
        };
        assert_eq!(
            RequirementsBuilder::try_new(price).unwrap_err(),
            RequirementsError::MissingPayTo
        );
    }

    #[test]
    fn test_rejects_zero_amount() {
        let price = PriceTag {
            amount: TokenAmount(0),
            ..price()
        };
        assert_eq!(
            RequirementsBuilder::try_new(price).unwrap_err(),
            RequirementsError::ZeroAmount
        );
    }

    #[test]
    fn test_rejects_empty_asset_and_network() {
        let no_asset = PriceTag {
            asset: "".into(),
            ..price()
        };
        assert_eq!(
            RequirementsBuilder::try_new(no_asset).unwrap_err(),
            RequirementsError::MissingAsset
        );
        let no_network = PriceTag {
            network: ChainId::new("aptos", ""),
            ..price()
        };
        assert_eq!(
            RequirementsBuilder::try_new(no_network).unwrap_err(),
            RequirementsError::MissingNetwork
        );
    }

    #[test]
    fn test_resource_url_from_base_and_request() {
        let builder = RequirementsBuilder::try_new(price())
            .unwrap()
            .with_base_url("https://api.example.com/".parse().unwrap());
        let info = builder.resource_info(&Uri::from_static("/fortune?lang=en"));
        assert_eq!(info.url, "https://api.example.com/fortune?lang=en");
        assert_eq!(info.mime_type, "application/json");
    }

    #[test]
    fn test_resource_url_fixed() {
        let builder = RequirementsBuilder::try_new(price())
            .unwrap()
            .with_resource(ResourceInfoBuilder {
                description: "A fortune".into(),
                mime_type: "application/json".into(),
                url: Some("https://fixed.example.com/fortune".into()),
            });
        let challenge = builder.payment_required(&Uri::from_static("/other"), None);
        assert_eq!(challenge.resource.url, "https://fixed.example.com/fortune");
        assert_eq!(challenge.resource.description, "A fortune");
        assert_eq!(challenge.accepts, vec![builder.build()]);
        assert!(challenge.error.is_none());
    }
}
