//! Human-readable currency amount parsing.
//!
//! Operators price resources in dollars (`"$0.01"`), while payment
//! requirements carry atomic token units (`"10000"` for a 6-decimals token).
//! [`MoneyAmount`] bridges the two.
//!
//! # Supported Formats
//!
//! - Plain numbers: `"100"`, `"0.01"`
//! - With currency symbols: `"$10.50"`
//! - With thousand separators: `"1,000"`, `"1,000,000.50"`
//!
//! # Example
//!
//! ```rust
//! use x402_types::util::money_amount::MoneyAmount;
//!
//! let amount = MoneyAmount::parse("$10.50").unwrap();
//! assert_eq!(amount.scale(), 2);
//! assert_eq!(amount.mantissa(), 1050);
//! assert_eq!(amount.as_token_amount(6).unwrap().as_u64(), 10_500_000);
//! ```

use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::util::token_amount::TokenAmount;

/// A parsed, non-negative monetary amount that preserves its input precision.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyAmount(pub Decimal);

impl MoneyAmount {
    /// Returns the number of decimal places in the original input.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// Returns the value as an unsigned integer (without decimal point).
    ///
    /// For example, `"12.34"` returns `1234`.
    pub fn mantissa(&self) -> u128 {
        self.0.mantissa().unsigned_abs()
    }

    /// Converts into atomic units of a token with `decimals` decimal places.
    ///
    /// # Errors
    ///
    /// - [`MoneyAmountParseError::WrongPrecision`] if the amount has more
    ///   decimal places than the token supports
    /// - [`MoneyAmountParseError::OutOfRange`] if the result does not fit `u64`
    pub fn as_token_amount(&self, decimals: u32) -> Result<TokenAmount, MoneyAmountParseError> {
        let scale = self.scale();
        if scale > decimals {
            return Err(MoneyAmountParseError::WrongPrecision {
                money: scale,
                token: decimals,
            });
        }
        let multiplier = 10u128
            .checked_pow(decimals - scale)
            .ok_or(MoneyAmountParseError::OutOfRange)?;
        let atomic = self
            .mantissa()
            .checked_mul(multiplier)
            .ok_or(MoneyAmountParseError::OutOfRange)?;
        let atomic = u64::try_from(atomic).map_err(|_| MoneyAmountParseError::OutOfRange)?;
        Ok(TokenAmount(atomic))
    }
}

/// Errors that can occur when parsing a monetary amount.
#[derive(Debug, thiserror::Error)]
pub enum MoneyAmountParseError {
    /// The input string could not be parsed as a number.
    #[error("Invalid number format")]
    InvalidFormat,
    /// The value is outside the allowed range.
    #[error(
        "Amount must be between {} and {}",
        constants::MIN_STR,
        constants::MAX_STR
    )]
    OutOfRange,
    /// Negative values are not allowed.
    #[error("Negative value is not allowed")]
    Negative,
    /// The input has more decimal places than the token supports.
    #[error("Too big of a precision: {money} vs {token} on token")]
    WrongPrecision {
        /// Decimal places in the input.
        money: u32,
        /// Decimal places supported by the token.
        token: u32,
    },
}

mod constants {
    use super::*;

    pub const MIN_STR: &str = "0.000000001";
    pub const MAX_STR: &str = "999999999";

    pub static MIN: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MIN_STR).expect("valid decimal"));
    pub static MAX: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MAX_STR).expect("valid decimal"));
}

static NOT_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d\.\-]+").expect("valid regex"));

impl MoneyAmount {
    /// Parses a human-readable currency string into a [`MoneyAmount`].
    ///
    /// Currency symbols, thousand separators, and whitespace are stripped
    /// before parsing.
    pub fn parse(input: &str) -> Result<Self, MoneyAmountParseError> {
        let cleaned = NOT_NUMERIC.replace_all(input, "");

        let parsed =
            Decimal::from_str(&cleaned).map_err(|_| MoneyAmountParseError::InvalidFormat)?;

        if parsed.is_sign_negative() {
            return Err(MoneyAmountParseError::Negative);
        }

        if parsed < *constants::MIN || parsed > *constants::MAX {
            return Err(MoneyAmountParseError::OutOfRange);
        }

        Ok(MoneyAmount(parsed))
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_symbols_and_separators() {
        let amount = MoneyAmount::parse("$1,000.25").unwrap();
        assert_eq!(amount.mantissa(), 100025);
        assert_eq!(amount.scale(), 2);
    }

    #[test]
    fn test_parse_rejects_negative_and_zero() {
        assert!(matches!(
            MoneyAmount::parse("-1"),
            Err(MoneyAmountParseError::Negative)
        ));
        assert!(matches!(
            MoneyAmount::parse("0"),
            Err(MoneyAmountParseError::OutOfRange)
        ));
        assert!(matches!(
            MoneyAmount::parse("abc"),
            Err(MoneyAmountParseError::InvalidFormat)
        ));
    }

    #[test]
    fn test_as_token_amount_scales_up() {
        let amount = MoneyAmount::parse("0.01").unwrap();
        assert_eq!(amount.as_token_amount(6).unwrap(), TokenAmount(10_000));
        assert_eq!(amount.as_token_amount(2).unwrap(), TokenAmount(1));
    }

    #[test]
    fn test_as_token_amount_rejects_excess_precision() {
        let amount = MoneyAmount::parse("0.001").unwrap();
        assert!(matches!(
            amount.as_token_amount(2),
            Err(MoneyAmountParseError::WrongPrecision { money: 3, token: 2 })
        ));
    }

    #[test]
    fn test_as_token_amount_overflow() {
        let amount = MoneyAmount::parse("999999999").unwrap();
        assert!(matches!(
            amount.as_token_amount(18),
            Err(MoneyAmountParseError::OutOfRange)
        ));
    }
}
