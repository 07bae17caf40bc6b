//! Request and response bodies of the FiatConnect endpoints.

use std::collections::BTreeMap;

use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    AccountAddress, CryptoType, DecimalAmount, FeeFrequency, FeeType, FiatAccountId,
    FiatAccountSchema, FiatAccountType, FiatType, Iso8601Duration, KycSchema, KycStatus,
    TransferId, TransferStatus, TransferType,
};

/*
 * Quote endpoints
 */

/// Query parameters for all `/quote` endpoints.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequestQuery {
    pub fiat_type: FiatType,
    pub crypto_type: CryptoType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiat_amount: Option<DecimalAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_amount: Option<DecimalAmount>,
    #[builder(into)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub region: Option<String>,
}

/// A quote issued by a provider.
///
/// A quote never changes once issued. If `guaranteed_until` is set the quote expires at
/// that instant; otherwise it stays valid.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub fiat_type: FiatType,
    pub crypto_type: CryptoType,
    pub fiat_amount: DecimalAmount,
    pub crypto_amount: DecimalAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guaranteed_until: Option<DateTime<Utc>>,
}

impl Quote {
    /// Returns `false` iff `guaranteed_until` is set and `now` is strictly after it.
    ///
    /// ```
    /// use chrono::{Duration, TimeZone, Utc};
    /// use fiatconnect_core::{transport::Quote, types::{CryptoType, FiatType}};
    ///
    /// let until = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    /// let quote = Quote::builder()
    ///     .fiat_type(FiatType::Usd)
    ///     .crypto_type(CryptoType::CUsd)
    ///     .fiat_amount(100u32.into())
    ///     .crypto_amount(100u32.into())
    ///     .guaranteed_until(until)
    ///     .build();
    ///
    /// assert!(quote.is_valid(until));
    /// assert!(!quote.is_valid(until + Duration::milliseconds(1)));
    /// ```
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.guaranteed_until {
            Some(until) => now <= until,
            None => true,
        }
    }
}

/// KYC requirements attached to a quote.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRequirements {
    pub kyc_required: bool,
    #[builder(default)]
    pub kyc_schemas: Vec<KycSchema>,
}

/// Per fiat account type data attached to a quote.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatAccountTypeQuoteData {
    pub fiat_account_schemas: Vec<FiatAccountSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<DecimalAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_type: Option<FeeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_frequency: Option<FeeFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_time_lower_bound: Option<Iso8601Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_time_upper_bound: Option<Iso8601Duration>,
}

/// Response body for all `/quote` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub quote: Quote,
    pub kyc: KycRequirements,
    pub fiat_account: BTreeMap<FiatAccountType, FiatAccountTypeQuoteData>,
}

/*
 * KYC endpoints
 */

/// Path parameters for all KYC endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRequestParams {
    pub kyc_schema: KycSchema,
}

/// Response body for `POST /kyc/:kycSchema` and `GET /kyc/:kycSchema/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycStatusResponse {
    pub kyc_status: KycStatus,
}

/*
 * Fiat account endpoints
 */

/// Path parameters for `POST /accounts/:fiatAccountSchema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFiatAccountRequestParams {
    pub fiat_account_schema: FiatAccountSchema,
}

/// Path parameters for `DELETE /account/:fiatAccountId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFiatAccountRequestParams {
    pub fiat_account_id: FiatAccountId,
}

/// Generic representation of a fiat account, with personal information stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObfuscatedFiatAccountData {
    pub fiat_account_id: FiatAccountId,
    pub name: String,
    pub institution: String,
    pub fiat_account_type: FiatAccountType,
}

/// Response body for `POST /accounts/:fiatAccountSchema`.
pub type AddFiatAccountResponse = ObfuscatedFiatAccountData;

/// Response body for `GET /accounts/:fiatAccountSchema`.
pub type GetFiatAccountsResponse = BTreeMap<FiatAccountType, Vec<ObfuscatedFiatAccountData>>;

/*
 * Transfer endpoints
 */

/// Request body for `POST /transfer/in` and `POST /transfer/out`.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequestBody {
    pub fiat_type: FiatType,
    pub crypto_type: CryptoType,
    #[builder(into)]
    pub amount: DecimalAmount,
    #[builder(into)]
    pub fiat_account_id: FiatAccountId,
}

/// Response body for `POST /transfer/in` and `POST /transfer/out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub transfer_id: TransferId,
    pub transfer_status: TransferStatus,
    pub transfer_address: AccountAddress,
}

/// Path parameters for `GET /transfer/:transferId/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatusRequestParams {
    pub transfer_id: TransferId,
}

/// Response body for `GET /transfer/:transferId/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStatusResponse {
    pub status: TransferStatus,
    pub transfer_type: TransferType,
    pub fiat_type: FiatType,
    pub crypto_type: CryptoType,
    pub amount_provided: DecimalAmount,
    pub amount_received: DecimalAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<DecimalAmount>,
    pub fiat_account_id: FiatAccountId,
}
