//! Schema payloads for KYC and fiat accounts.
//!
//! Everything here is prefixed with `Mock`: these schemas are examples and are not
//! officially supported by the protocol.

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    core::{FiatAccountSchemaData, KycSchemaData},
    errors::{Error, Result},
    types::{FiatAccountSchema, FiatAccountType, FiatType, KycSchema},
};

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidPayload(format!("{field} must not be empty")));
    }
    Ok(())
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[builder(into)]
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub address2: Option<String>,
    #[builder(into)]
    pub city: String,
    /// In the US this is the state.
    #[builder(into)]
    pub region: String,
    #[builder(into)]
    pub postal_code: String,
    #[builder(into)]
    pub iso_country_code: String,
}

impl PostalAddress {
    fn validate(&self) -> Result<()> {
        require("address1", &self.address1)?;
        require("city", &self.city)?;
        require("region", &self.region)?;
        require("postalCode", &self.postal_code)?;
        if self.iso_country_code.len() != 2
            || !self
                .iso_country_code
                .chars()
                .all(|c| c.is_ascii_uppercase())
        {
            return Err(Error::InvalidPayload(format!(
                "isoCountryCode must be an ISO 3166-1 alpha-2 code, got '{}'",
                self.iso_country_code
            )));
        }
        Ok(())
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockNameAndAddressKyc {
    #[builder(into)]
    pub first_name: String,
    #[builder(into)]
    pub last_name: String,
    pub address: PostalAddress,
}

impl KycSchemaData for MockNameAndAddressKyc {
    const SCHEMA: KycSchema = KycSchema::MockNameAndAddress;

    fn validate(&self) -> Result<()> {
        require("firstName", &self.first_name)?;
        require("lastName", &self.last_name)?;
        self.address.validate()
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockCheckingAccount {
    #[builder(into)]
    pub bank_name: String,
    #[builder(into)]
    pub account_name: String,
    pub fiat_type: FiatType,
    #[builder(into)]
    pub account_number: String,
    #[builder(into)]
    pub routing_number: String,
}

impl FiatAccountSchemaData for MockCheckingAccount {
    const SCHEMA: FiatAccountSchema = FiatAccountSchema::MockCheckingAccount;

    fn fiat_account_type(&self) -> FiatAccountType {
        FiatAccountType::MockCheckingAccount
    }

    fn validate(&self) -> Result<()> {
        require("bankName", &self.bank_name)?;
        require("accountName", &self.account_name)?;
        if self.account_number.len() < 4 || !self.account_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::InvalidPayload(
                "accountNumber must be at least 4 digits".to_string(),
            ));
        }
        if self.routing_number.len() != 9 || !self.routing_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::InvalidPayload(
                "routingNumber must be 9 digits".to_string(),
            ));
        }
        Ok(())
    }

    fn institution(&self) -> &str {
        &self.bank_name
    }

    fn obfuscated_name(&self) -> String {
        let tail = &self.account_number[self.account_number.len().saturating_sub(4)..];
        format!("{} (...{tail})", self.account_name)
    }

    fn fingerprint(&self) -> String {
        format!("{}:{}", self.routing_number, self.account_number)
    }

    fn fiat_type(&self) -> Option<FiatType> {
        Some(self.fiat_type)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn checking() -> MockCheckingAccount {
        MockCheckingAccount::builder()
            .bank_name("Chase")
            .account_name("Checking Account")
            .fiat_type(FiatType::Usd)
            .account_number("12345678")
            .routing_number("021000021")
            .build()
    }

    #[test]
    fn checking_account_wire_shape() {
        assert_eq!(
            serde_json::to_value(checking()).unwrap(),
            json!({
                "bankName": "Chase",
                "accountName": "Checking Account",
                "fiatType": "USD",
                "accountNumber": "12345678",
                "routingNumber": "021000021"
            })
        );
    }

    #[test]
    fn checking_account_is_obfuscated() {
        let account = checking();
        assert!(account.validate().is_ok());
        assert_eq!(account.obfuscated_name(), "Checking Account (...5678)");
        assert_eq!(account.institution(), "Chase");
        assert!(!account.obfuscated_name().contains("1234"));
    }

    #[test]
    fn checking_account_rejects_bad_numbers() {
        let mut account = checking();
        account.routing_number = "12".to_string();
        assert!(account.validate().is_err());

        let mut account = checking();
        account.account_number = "12a4".to_string();
        assert!(account.validate().is_err());
    }

    #[test]
    fn kyc_payload_validation() {
        let kyc: MockNameAndAddressKyc = serde_json::from_value(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "address": {
                "address1": "1 Main St",
                "city": "San Francisco",
                "region": "CA",
                "postalCode": "94105",
                "isoCountryCode": "US"
            }
        }))
        .unwrap();
        assert!(kyc.validate().is_ok());
        assert_eq!(kyc.address.address2, None);

        let mut bad = kyc.clone();
        bad.address.iso_country_code = "USA".to_string();
        assert!(bad.validate().is_err());

        let mut bad = kyc;
        bad.first_name = "  ".to_string();
        assert!(bad.validate().is_err());
    }
}
