//! [`DecimalAmount`] represents a fiat or crypto amount in the FiatConnect protocol.
//!
//! This module holds its type definition and implementations.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Represents a non-negative decimal amount in the FiatConnect protocol.
///
/// Amounts travel as decimal strings (e.g. `"100.50"`), never as JSON numbers.
///
/// ```
/// use fiatconnect_core::types::DecimalAmount;
///
/// let amount: DecimalAmount = "100.50".parse().unwrap();
/// assert_eq!(amount.to_string(), "100.50");
/// assert!("-1".parse::<DecimalAmount>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DecimalAmount(pub Decimal);

impl DecimalAmount {
    pub const ZERO: DecimalAmount = DecimalAmount(Decimal::ZERO);

    /// Returns the inner decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Round to `dp` decimal places, using banker's rounding.
    pub fn round_dp(&self, dp: u32) -> Self {
        DecimalAmount(self.0.round_dp(dp))
    }
}

impl TryFrom<Decimal> for DecimalAmount {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Error::InvalidAmount(format!(
                "amount must not be negative: {value}"
            )));
        }
        Ok(DecimalAmount(value))
    }
}

impl From<u32> for DecimalAmount {
    fn from(value: u32) -> Self {
        DecimalAmount(Decimal::from(value))
    }
}

impl From<u64> for DecimalAmount {
    fn from(value: u64) -> Self {
        DecimalAmount(Decimal::from(value))
    }
}

impl FromStr for DecimalAmount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|err| Error::InvalidAmount(format!("{s}: {err}")))?;
        DecimalAmount::try_from(value)
    }
}

impl Display for DecimalAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DecimalAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DecimalAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DecimalAmount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn amounts_are_strings_on_the_wire() {
        let amount: DecimalAmount = serde_json::from_value(json!("12.345")).unwrap();
        assert_eq!(serde_json::to_value(amount).unwrap(), json!("12.345"));

        assert!(serde_json::from_value::<DecimalAmount>(json!(12.5)).is_err());
        assert!(serde_json::from_value::<DecimalAmount>(json!("twelve")).is_err());
        assert!(serde_json::from_value::<DecimalAmount>(json!("-0.01")).is_err());
    }
}
