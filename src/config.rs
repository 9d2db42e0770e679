//! Configuration of the fortune server.
//!
//! Every setting is a CLI flag with an environment variable fallback (`.env`
//! is loaded before parsing). The result is an immutable [`Config`] checked
//! once at startup: a missing or malformed recipient address, an unknown
//! network, or a zero price stops the process before it binds a socket.

use clap::Parser;
use std::net::IpAddr;
use std::time::Duration;
use url::Url;
use x402_paygate::requirements::{
    PriceTag, RequirementsBuilder, RequirementsError, ResourceInfoBuilder,
};
use x402_paygate::GateOptions;
use x402_types::chain::ChainId;
use x402_types::networks::USDC;
use x402_types::util::{MoneyAmount, MoneyAmountParseError, TokenAmount};

pub const DEFAULT_FACILITATOR_URL: &str = "https://facilitator.x402.rs";

/// CLI arguments for the fortune server.
#[derive(Parser, Debug)]
#[command(name = "x402-fortune")]
#[command(about = "Pay-per-request fortune server (x402 v2 on Aptos)")]
struct CliArgs {
    /// Aptos address receiving payments
    #[arg(long, env = "PAY_TO")]
    pay_to: Option<String>,
    /// Base URL of the x402 facilitator
    #[arg(long, env = "FACILITATOR_URL", default_value = DEFAULT_FACILITATOR_URL)]
    facilitator_url: String,
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
    /// CAIP-2 chain id (`aptos:2`) or network name (`aptos-testnet`)
    #[arg(long, env = "NETWORK", default_value = "aptos:2")]
    network: String,
    /// Fungible-asset address; defaults to USDC on the selected network
    #[arg(long, env = "ASSET")]
    asset: Option<String>,
    /// Price in atomic units of the asset
    #[arg(long, env = "AMOUNT", default_value_t = 10_000)]
    amount: u64,
    /// Human-readable price such as `$0.01`; overrides `--amount`
    #[arg(long, env = "PRICE")]
    price: Option<String>,
    /// Decimals of the asset, used to convert `--price`
    #[arg(long, env = "ASSET_DECIMALS", default_value_t = 6)]
    asset_decimals: u32,
    #[arg(long, env = "MAX_TIMEOUT_SECONDS", default_value_t = 600)]
    max_timeout_seconds: u64,
    /// Whether the facilitator sponsors gas
    #[arg(long, env = "SPONSORED", default_value_t = true, action = clap::ArgAction::Set)]
    sponsored: bool,
    #[arg(long, env = "FACILITATOR_TIMEOUT_SECONDS", default_value_t = 30)]
    facilitator_timeout_seconds: u64,
    /// Settle without a prior verify round trip
    #[arg(long, env = "SKIP_VERIFY")]
    skip_verify: bool,
    /// Reject payloads whose accepted requirements differ from ours before calling the facilitator
    #[arg(long, env = "PRECHECK_REQUIREMENTS")]
    precheck_requirements: bool,
    /// Public base URL used to build resource URLs; defaults to `http://localhost:{port}/`
    #[arg(long, env = "BASE_URL")]
    base_url: Option<Url>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PAY_TO is required")]
    MissingPayTo,
    #[error("Invalid Aptos address {0}: expected 0x followed by 1 to 64 hex digits")]
    InvalidAddress(String),
    #[error("Unknown network {0}: expected aptos:<chain id> or a known network name")]
    UnknownNetwork(String),
    #[error("No default asset for network {0}, set ASSET")]
    NoDefaultAsset(ChainId),
    #[error("Invalid PRICE: {0}")]
    InvalidPrice(#[from] MoneyAmountParseError),
    #[error("Invalid FACILITATOR_URL {url}: {source}")]
    InvalidFacilitatorUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid BASE_URL: {0}")]
    InvalidBaseUrl(#[source] url::ParseError),
    #[error("FACILITATOR_TIMEOUT_SECONDS must be greater than zero")]
    ZeroFacilitatorTimeout,
    #[error("Invalid payment requirements: {0}")]
    Requirements(#[from] RequirementsError),
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    host: IpAddr,
    port: u16,
    facilitator_url: Url,
    facilitator_timeout: Duration,
    price: PriceTag,
    base_url: Url,
    skip_verify: bool,
    precheck_requirements: bool,
}

impl Config {
    /// Loads configuration from the command line and the environment.
    ///
    /// Exits the process on unparsable arguments, as clap does.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Loads configuration from an explicit argument list (first item is the binary name).
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::from_args(CliArgs::try_parse_from(args)?)
    }

    fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let pay_to = args
            .pay_to
            .filter(|pay_to| !pay_to.trim().is_empty())
            .ok_or(ConfigError::MissingPayTo)?;
        let pay_to = parse_address(&pay_to)?;

        let network = parse_network(&args.network)?;
        let asset = match args.asset {
            Some(asset) => parse_address(&asset)?,
            None => USDC::by_chain_id(&network)
                .map(|usdc| usdc.address.to_string())
                .ok_or_else(|| ConfigError::NoDefaultAsset(network.clone()))?,
        };
        let amount = match args.price {
            Some(price) => MoneyAmount::parse(&price)?.as_token_amount(args.asset_decimals)?,
            None => TokenAmount(args.amount),
        };

        let facilitator_url =
            Url::parse(&args.facilitator_url).map_err(|source| ConfigError::InvalidFacilitatorUrl {
                url: args.facilitator_url.clone(),
                source,
            })?;
        if args.facilitator_timeout_seconds == 0 {
            return Err(ConfigError::ZeroFacilitatorTimeout);
        }
        let base_url = match args.base_url {
            Some(base_url) => base_url,
            None => Url::parse(&format!("http://localhost:{}/", args.port))
                .map_err(ConfigError::InvalidBaseUrl)?,
        };

        let config = Self {
            host: args.host,
            port: args.port,
            facilitator_url,
            facilitator_timeout: Duration::from_secs(args.facilitator_timeout_seconds),
            price: PriceTag {
                network,
                asset,
                amount,
                pay_to,
                max_timeout_seconds: args.max_timeout_seconds,
                sponsored: args.sponsored,
            },
            base_url,
            skip_verify: args.skip_verify,
            precheck_requirements: args.precheck_requirements,
        };
        config.requirements()?;
        Ok(config)
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn facilitator_url(&self) -> &Url {
        &self.facilitator_url
    }

    pub fn facilitator_timeout(&self) -> Duration {
        self.facilitator_timeout
    }

    pub fn price(&self) -> &PriceTag {
        &self.price
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Requirements of the `/fortune` resource.
    pub fn requirements(&self) -> Result<RequirementsBuilder, RequirementsError> {
        let requirements = RequirementsBuilder::try_new(self.price.clone())?
            .with_base_url(self.base_url.clone())
            .with_resource(ResourceInfoBuilder {
                description: "A fortune, one per payment".to_string(),
                ..ResourceInfoBuilder::default()
            });
        Ok(requirements)
    }

    pub fn gate_options(&self) -> GateOptions {
        GateOptions {
            verify_before_settle: !self.skip_verify,
            precheck_requirements: self.precheck_requirements,
            facilitator_timeout: self.facilitator_timeout,
        }
    }
}

/// Accepts `0x` followed by 1 to 64 hex digits. Returns it lowercased.
fn parse_address(input: &str) -> Result<String, ConfigError> {
    let trimmed = input.trim();
    let valid = trimmed
        .strip_prefix("0x")
        .is_some_and(|hex| (1..=64).contains(&hex.len()) && hex.bytes().all(|b| b.is_ascii_hexdigit()));
    if valid {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Err(ConfigError::InvalidAddress(input.to_string()))
    }
}

fn parse_network(input: &str) -> Result<ChainId, ConfigError> {
    let chain_id = if input.contains(':') {
        input.parse::<ChainId>().ok()
    } else {
        ChainId::from_network_name(input)
    };
    chain_id
        .filter(|chain_id| chain_id.namespace() == "aptos")
        .ok_or_else(|| ConfigError::UnknownNetwork(input.to_string()))
}
