//! Miscellaneous common types used throughout the FiatConnect codebase.

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Represents any JSON value. Used for schema-specific payloads before they are decoded.
pub type AnyJson = serde_json::Value;

/// The wallet address of a FiatConnect user.
///
/// Accounts live on Celo, so addresses are 20-byte EVM addresses. Parsing is
/// case-insensitive; the display form is EIP-55 checksummed.
///
/// ```
/// use fiatconnect_core::types::AccountAddress;
///
/// let address: AccountAddress = "0x3cb9b3bbfde8501f411bb69ad3dc07908ed0de20".parse().unwrap();
/// assert_eq!(address.to_string(), "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20");
///
/// assert!("not-an-address".parse::<AccountAddress>().is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress(pub alloy_primitives::Address);

impl From<alloy_primitives::Address> for AccountAddress {
    fn from(addr: alloy_primitives::Address) -> Self {
        AccountAddress(addr)
    }
}

impl FromStr for AccountAddress {
    type Err = alloy_primitives::AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = alloy_primitives::Address::from_str(s)?;
        Ok(AccountAddress(addr))
    }
}

impl Display for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountAddress({})", self.0)
    }
}

impl Serialize for AccountAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AccountAddress::from_str(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }
    };
}

opaque_id!(
    /// Opaque identifier of a fiat account, assigned by the provider.
    FiatAccountId
);

opaque_id!(
    /// Opaque identifier of a transfer, assigned by the provider.
    TransferId
);

opaque_id!(
    /// Unique identifier of a webhook event. This is the idempotency key for delivery.
    EventId
);

opaque_id!(
    /// Name of the payment provider sending webhooks.
    ProviderId
);
