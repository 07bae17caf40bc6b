//! Core traits used across the FiatConnect kit.
//!
//! KYC and fiat account payloads are open-world: each schema is a plain data type that
//! implements one of the traits below. Supporting a new schema takes one vocabulary
//! variant plus one trait implementation; nothing in the lifecycle code changes.

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    errors::Result,
    types::{FiatAccountSchema, FiatAccountType, FiatType, KycSchema},
};

/// A KYC payload submitted to `POST /kyc/:kycSchema`.
pub trait KycSchemaData: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The schema this payload is submitted under.
    const SCHEMA: KycSchema;

    /// Field-level validation beyond what deserialization enforces.
    fn validate(&self) -> Result<()>;
}

/// A fiat account payload submitted to `POST /accounts/:fiatAccountSchema`.
pub trait FiatAccountSchemaData: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The schema this payload is submitted under.
    const SCHEMA: FiatAccountSchema;

    /// The kind of account created from this payload.
    fn fiat_account_type(&self) -> FiatAccountType;

    /// Field-level validation beyond what deserialization enforces.
    fn validate(&self) -> Result<()>;

    /// Name of the financial institution holding the account.
    fn institution(&self) -> &str;

    /// Display name with personal information stripped.
    fn obfuscated_name(&self) -> String;

    /// A stable key identifying the underlying account, used to detect duplicates.
    fn fingerprint(&self) -> String;

    /// Currency of the account, if the schema pins one.
    fn fiat_type(&self) -> Option<FiatType> {
        None
    }
}
