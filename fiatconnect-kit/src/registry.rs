//! Decoding of schema-specific KYC and fiat account payloads.
//!
//! The registry holds one decoder per supported schema. Decoders are monomorphized from the
//! [`KycSchemaData`] and [`FiatAccountSchemaData`] implementations, so the rest of the kit only
//! ever sees the schema-independent views defined here.

use std::collections::BTreeMap;

use crate::{
    core::{FiatAccountSchemaData, KycSchemaData},
    errors::{FiatConnectError, ProtocolError},
    types::{AnyJson, FiatAccountSchema, FiatAccountType, FiatType, KycSchema},
};

/// A fiat account payload that passed decoding and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFiatAccount {
    pub schema: FiatAccountSchema,
    pub fiat_account_type: FiatAccountType,
    pub institution: String,
    pub name: String,
    pub fingerprint: String,
    pub fiat_type: Option<FiatType>,
}

/// A KYC payload that passed decoding and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKyc {
    pub schema: KycSchema,
    /// The payload re-serialized from its typed form, with unknown fields dropped.
    pub data: AnyJson,
}

type FiatAccountDecoder = fn(AnyJson) -> Result<DecodedFiatAccount, ProtocolError>;
type KycDecoder = fn(AnyJson) -> Result<DecodedKyc, ProtocolError>;

fn decode_fiat_account_as<T: FiatAccountSchemaData>(
    json: AnyJson,
) -> Result<DecodedFiatAccount, ProtocolError> {
    let account: T = serde_json::from_value(json).map_err(fiatconnect_core::errors::Error::from)?;
    account.validate()?;

    Ok(DecodedFiatAccount {
        schema: T::SCHEMA,
        fiat_account_type: account.fiat_account_type(),
        institution: account.institution().to_string(),
        name: account.obfuscated_name(),
        fingerprint: account.fingerprint(),
        fiat_type: account.fiat_type(),
    })
}

fn decode_kyc_as<T: KycSchemaData>(json: AnyJson) -> Result<DecodedKyc, ProtocolError> {
    let kyc: T = serde_json::from_value(json).map_err(fiatconnect_core::errors::Error::from)?;
    kyc.validate()?;

    let data = serde_json::to_value(&kyc).map_err(fiatconnect_core::errors::Error::from)?;
    Ok(DecodedKyc {
        schema: T::SCHEMA,
        data,
    })
}

/// The set of schemas a provider accepts.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    fiat_accounts: BTreeMap<FiatAccountSchema, FiatAccountDecoder>,
    kyc: BTreeMap<KycSchema, KycDecoder>,
}

impl SchemaRegistry {
    /// An empty registry. Every decode fails with `UnsupportedSchema`.
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// A registry accepting the mock schemas shipped with the kit.
    pub fn with_mock_schemas() -> Self {
        SchemaRegistry::new()
            .register_kyc::<crate::schemas::MockNameAndAddressKyc>()
            .register_fiat_account::<crate::schemas::MockCheckingAccount>()
    }

    pub fn register_fiat_account<T: FiatAccountSchemaData>(mut self) -> Self {
        self.fiat_accounts
            .insert(T::SCHEMA, decode_fiat_account_as::<T>);
        self
    }

    pub fn register_kyc<T: KycSchemaData>(mut self) -> Self {
        self.kyc.insert(T::SCHEMA, decode_kyc_as::<T>);
        self
    }

    pub fn supports_fiat_account(&self, schema: FiatAccountSchema) -> bool {
        self.fiat_accounts.contains_key(&schema)
    }

    pub fn supports_kyc(&self, schema: KycSchema) -> bool {
        self.kyc.contains_key(&schema)
    }

    pub fn supported_fiat_account_schemas(&self) -> Vec<FiatAccountSchema> {
        self.fiat_accounts.keys().copied().collect()
    }

    pub fn supported_kyc_schemas(&self) -> Vec<KycSchema> {
        self.kyc.keys().copied().collect()
    }

    /// Decode and validate a fiat account payload submitted under `schema`.
    ///
    /// Fails with `UnsupportedSchema` if the schema is not registered and with `InvalidSchema`
    /// if the payload does not parse or validate.
    pub fn decode_fiat_account(
        &self,
        schema: FiatAccountSchema,
        json: AnyJson,
    ) -> Result<DecodedFiatAccount, ProtocolError> {
        let decode = self
            .fiat_accounts
            .get(&schema)
            .ok_or(FiatConnectError::UnsupportedSchema)?;
        decode(json)
    }

    /// Decode and validate a KYC payload submitted under `schema`.
    pub fn decode_kyc(&self, schema: KycSchema, json: AnyJson) -> Result<DecodedKyc, ProtocolError> {
        let decode = self
            .kyc
            .get(&schema)
            .ok_or(FiatConnectError::UnsupportedSchema)?;
        decode(json)
    }
}
