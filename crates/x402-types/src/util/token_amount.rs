//! Token amounts in atomic units.
//!
//! On the wire, x402 carries amounts as decimal strings (`"10000"`) so that
//! values beyond the safe integer range of JSON numbers survive untouched.
//! [`TokenAmount`] keeps the integer in Rust and the string on the wire.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use std::fmt;
use std::str::FromStr;

/// An amount in the smallest indivisible unit of an asset.
///
/// ```
/// use x402_types::util::TokenAmount;
///
/// let amount: TokenAmount = serde_json::from_str("\"10000\"").unwrap();
/// assert_eq!(amount.as_u64(), 10_000);
/// assert_eq!(serde_json::to_string(&amount).unwrap(), "\"10000\"");
/// ```
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(#[serde_as(as = "DisplayFromStr")] pub u64);

impl TokenAmount {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for TokenAmount {
    fn from(value: u64) -> Self {
        TokenAmount(value)
    }
}

impl FromStr for TokenAmount {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(TokenAmount)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_json_number() {
        assert!(serde_json::from_str::<TokenAmount>("10000").is_err());
    }

    #[test]
    fn test_rejects_negative_and_fractional() {
        assert!(serde_json::from_str::<TokenAmount>("\"-1\"").is_err());
        assert!(serde_json::from_str::<TokenAmount>("\"0.5\"").is_err());
    }

    #[test]
    fn test_from_str_trims() {
        assert_eq!(" 42 ".parse::<TokenAmount>().unwrap(), TokenAmount(42));
    }
}
