//! Known Aptos networks and token deployments.
//!
//! x402 v2 works with any CAIP-2 chain ID, so nothing here is required by the
//! protocol. The registry exists for convenience: operators can configure a
//! network by its name (`aptos-testnet`) and get a sensible default asset
//! (USDC) without looking up fungible-asset addresses by hand.
//!
//! # Examples
//!
//! ```
//! use x402_types::chain::ChainId;
//! use x402_types::networks::{KnownNetworkAptos, USDC, chain_id_by_network_name};
//!
//! let testnet = chain_id_by_network_name("aptos-testnet").unwrap();
//! assert_eq!(testnet, ChainId::aptos_testnet());
//!
//! let usdc = USDC::aptos_testnet();
//! assert_eq!(usdc.decimals, 6);
//! assert_eq!(usdc.parse("0.01").unwrap().as_u64(), 10_000);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::chain::ChainId;
use crate::util::money_amount::{MoneyAmount, MoneyAmountParseError};
use crate::util::token_amount::TokenAmount;

/// A known network definition with its chain ID and human-readable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable network name (e.g., "aptos-testnet")
    pub name: &'static str,
    /// CAIP-2 namespace (always "aptos" here)
    pub namespace: &'static str,
    /// Chain reference (e.g., "2" for Aptos testnet)
    pub reference: &'static str,
}

impl NetworkInfo {
    /// Create a ChainId from this network info
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

/// Well-known Aptos networks.
pub static KNOWN_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "aptos",
        namespace: "aptos",
        reference: "1",
    },
    NetworkInfo {
        name: "aptos-testnet",
        namespace: "aptos",
        reference: "2",
    },
];

static NAME_TO_CHAIN_ID: LazyLock<HashMap<&'static str, ChainId>> = LazyLock::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.name, n.chain_id()))
        .collect()
});

static CHAIN_ID_TO_NAME: LazyLock<HashMap<ChainId, &'static str>> = LazyLock::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.chain_id(), n.name))
        .collect()
});

/// Retrieves a ChainId by its network name. The lookup is case-sensitive.
pub fn chain_id_by_network_name(name: &str) -> Option<ChainId> {
    NAME_TO_CHAIN_ID.get(name).cloned()
}

/// Retrieves the network name for a ChainId, if it is a known network.
pub fn network_name_by_chain_id(chain_id: &ChainId) -> Option<&'static str> {
    CHAIN_ID_TO_NAME.get(chain_id).copied()
}

/// Convenient access to per-network instances of `A` for Aptos networks.
///
/// Implemented for [`ChainId`] (the CAIP-2 identifier) and for [`USDC`]
/// (the token deployment on each network).
pub trait KnownNetworkAptos<A> {
    /// Returns the instance for Aptos mainnet (aptos:1)
    fn aptos() -> A;
    /// Returns the instance for Aptos testnet (aptos:2)
    fn aptos_testnet() -> A;
}

impl KnownNetworkAptos<ChainId> for ChainId {
    fn aptos() -> ChainId {
        ChainId::new("aptos", "1")
    }

    fn aptos_testnet() -> ChainId {
        ChainId::new("aptos", "2")
    }
}

/// A fungible asset deployed on a specific Aptos network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDeployment {
    /// The network where this token is deployed.
    pub chain_id: ChainId,
    /// The fungible asset metadata address.
    pub address: &'static str,
    /// The number of decimal places for this token.
    pub decimals: u32,
}

impl TokenDeployment {
    /// An amount already expressed in atomic units.
    pub fn amount(&self, value: u64) -> TokenAmount {
        TokenAmount(value)
    }

    /// Converts a human-readable amount (`"0.01"`, `"$1.50"`) into atomic units.
    pub fn parse(&self, human: &str) -> Result<TokenAmount, MoneyAmountParseError> {
        MoneyAmount::parse(human)?.as_token_amount(self.decimals)
    }
}

/// Marker type for USDC deployments.
#[allow(clippy::upper_case_acronyms)]
pub struct USDC;

impl KnownNetworkAptos<TokenDeployment> for USDC {
    fn aptos() -> TokenDeployment {
        TokenDeployment {
            chain_id: ChainId::aptos(),
            address: "0xbae207659db88bea0cbead6da0ed00aac12edcdda169e591cd41c94180b46f3b",
            decimals: 6,
        }
    }

    fn aptos_testnet() -> TokenDeployment {
        TokenDeployment {
            chain_id: ChainId::aptos_testnet(),
            address: "0x69091fbab5f7d635ee7ac5098cf0c1efbe31d68fec0f2cd565e8d168daf52832",
            decimals: 6,
        }
    }
}

impl USDC {
    /// Looks up the USDC deployment for a chain, if known.
    pub fn by_chain_id(chain_id: &ChainId) -> Option<TokenDeployment> {
        [USDC::aptos(), USDC::aptos_testnet()]
            .into_iter()
            .find(|deployment| &deployment.chain_id == chain_id)
    }
}
