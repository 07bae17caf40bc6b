//! Schema vocabularies: KYC schemas, fiat account schemas and account types, plus fee kinds.
//!
//! Values prefixed with `Mock` are not officially supported by the protocol and only exist
//! as examples of how the vocabulary is extended.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::FiatConnectError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KycSchema {
    MockNameAndAddress,
}

impl KycSchema {
    pub const ALL: [KycSchema; 1] = [KycSchema::MockNameAndAddress];

    pub fn as_str(&self) -> &'static str {
        match self {
            KycSchema::MockNameAndAddress => "MockNameAndAddress",
        }
    }
}

impl Display for KycSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KycSchema {
    type Err = FiatConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KycSchema::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or(FiatConnectError::UnsupportedSchema)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FiatAccountSchema {
    MockCheckingAccount,
}

impl FiatAccountSchema {
    pub const ALL: [FiatAccountSchema; 1] = [FiatAccountSchema::MockCheckingAccount];

    pub fn as_str(&self) -> &'static str {
        match self {
            FiatAccountSchema::MockCheckingAccount => "MockCheckingAccount",
        }
    }
}

impl Display for FiatAccountSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FiatAccountSchema {
    type Err = FiatConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FiatAccountSchema::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or(FiatConnectError::UnsupportedSchema)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FiatAccountType {
    MockCheckingAccount,
    MockDebitCard,
    MockCreditCard,
}

impl FiatAccountType {
    pub const ALL: [FiatAccountType; 3] = [
        FiatAccountType::MockCheckingAccount,
        FiatAccountType::MockDebitCard,
        FiatAccountType::MockCreditCard,
    ];
}

impl Display for FiatAccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FiatAccountType::MockCheckingAccount => "MockCheckingAccount",
            FiatAccountType::MockDebitCard => "MockDebitCard",
            FiatAccountType::MockCreditCard => "MockCreditCard",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeType {
    KycFee,
    PlatformFee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeFrequency {
    OneTime,
    Recurring,
}
