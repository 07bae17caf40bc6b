//! Fiat currencies and crypto tokens supported by FiatConnect providers.
//!
//! These vocabularies grow through changes to the protocol; each value is a closed enum
//! variant spelled exactly as on the wire.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::FiatConnectError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FiatType {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl FiatType {
    pub const ALL: [FiatType; 2] = [FiatType::Usd, FiatType::Eur];

    pub fn as_str(&self) -> &'static str {
        match self {
            FiatType::Usd => "USD",
            FiatType::Eur => "EUR",
        }
    }

    /// Number of decimal places used when quoting this currency.
    pub fn decimals(&self) -> u32 {
        2
    }
}

impl Display for FiatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FiatType {
    type Err = FiatConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FiatType::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or(FiatConnectError::FiatNotSupported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CryptoType {
    #[serde(rename = "cUSD")]
    CUsd,
    #[serde(rename = "cEUR")]
    CEur,
    #[serde(rename = "CELO")]
    Celo,
}

impl CryptoType {
    pub const ALL: [CryptoType; 3] = [CryptoType::CUsd, CryptoType::CEur, CryptoType::Celo];

    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoType::CUsd => "cUSD",
            CryptoType::CEur => "cEUR",
            CryptoType::Celo => "CELO",
        }
    }

    /// Decimal places of the token on chain.
    pub fn decimals(&self) -> u32 {
        18
    }
}

impl Display for CryptoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CryptoType {
    type Err = FiatConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CryptoType::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(FiatConnectError::CryptoNotSupported)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_spelling_matches_display() {
        for fiat in FiatType::ALL {
            assert_eq!(serde_json::to_value(fiat).unwrap(), json!(fiat.to_string()));
            assert_eq!(fiat.as_str().parse::<FiatType>().unwrap(), fiat);
        }
        for crypto in CryptoType::ALL {
            assert_eq!(
                serde_json::to_value(crypto).unwrap(),
                json!(crypto.to_string())
            );
            assert_eq!(crypto.as_str().parse::<CryptoType>().unwrap(), crypto);
        }
    }

    #[test]
    fn unknown_currencies_are_rejected() {
        assert!(serde_json::from_value::<FiatType>(json!("GBP")).is_err());
        assert!(serde_json::from_value::<CryptoType>(json!("cusd")).is_err());
        assert_eq!(
            "GBP".parse::<FiatType>(),
            Err(FiatConnectError::FiatNotSupported)
        );
        assert_eq!(
            "BTC".parse::<CryptoType>(),
            Err(FiatConnectError::CryptoNotSupported)
        );
    }
}
