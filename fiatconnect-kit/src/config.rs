use std::{collections::BTreeMap, time::Duration};

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    errors::Result,
    transport::FiatAccountTypeQuoteData,
    types::{
        AccountAddress, CryptoType, DecimalAmount, FiatAccountType, FiatType, KycSchema,
        ProviderId,
    },
};

/// KYC rules a provider applies on top of the protocol's transitions.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct KycPolicy {
    /// Whether a `Denied` record may be resubmitted, moving it back to `Pending`.
    #[builder(default = true)]
    pub allow_resubmission_after_denial: bool,
    /// How long an approval stays valid. `None` means approvals never expire.
    pub approval_ttl: Option<chrono::Duration>,
}

impl Default for KycPolicy {
    fn default() -> Self {
        KycPolicy::builder().build()
    }
}

/// Webhook delivery settings.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Number of sequential delivery lanes. Events of one entity always share a lane.
    #[builder(default = 4)]
    pub lanes: usize,
    /// Delivery attempts per subscriber before an event is dead-lettered.
    #[builder(default = 5)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    pub initial_backoff: Duration,
    #[builder(default = Duration::from_secs(60))]
    pub max_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig::builder().build()
    }
}

impl DispatcherConfig {
    /// Delay before retry number `attempt` (1-based): doubles from `initial_backoff`, capped at
    /// `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

/// Inclusive bounds on a quoted amount.
#[derive(Builder, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<DecimalAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<DecimalAmount>,
}

/// Whether an amount falls below, inside or above its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCheck {
    TooLow,
    Within,
    TooHigh,
}

impl AmountLimits {
    pub fn check(&self, amount: DecimalAmount) -> LimitCheck {
        if self.min.is_some_and(|min| amount < min) {
            LimitCheck::TooLow
        } else if self.max.is_some_and(|max| amount > max) {
            LimitCheck::TooHigh
        } else {
            LimitCheck::Within
        }
    }
}

/// Crypto units paid per unit of fiat, per transfer direction.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRate {
    pub fiat_type: FiatType,
    pub crypto_type: CryptoType,
    pub transfer_in: DecimalAmount,
    pub transfer_out: DecimalAmount,
}

/// What a provider offers: geography, currencies, limits, rates, fees and KYC requirements.
///
/// Loaded from JSON at startup:
///
/// ```
/// use fiatconnect_kit::{config::ProviderConfig, types::FiatType};
///
/// let config = ProviderConfig::from_json_str(r#"{
///     "provider": "test-provider",
///     "transferAddress": "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20",
///     "countries": { "US": [] },
///     "fiat": { "USD": { "min": "10", "max": "1000" } },
///     "crypto": { "cUSD": {} },
///     "rates": [
///         { "fiatType": "USD", "cryptoType": "cUSD", "transferIn": "0.99", "transferOut": "1.01" }
///     ],
///     "kycSchemas": ["MockNameAndAddress"],
///     "quoteTtlSecs": 600
/// }"#).unwrap();
///
/// assert!(config.fiat.contains_key(&FiatType::Usd));
/// assert!(config.kyc_required());
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[builder(into)]
    pub provider: ProviderId,
    /// Address funds are sent to (transfer out) or sent from (transfer in).
    pub transfer_address: AccountAddress,
    /// Supported ISO country codes, each with its supported regions. An empty region list
    /// accepts every region of the country.
    #[builder(default)]
    pub countries: BTreeMap<String, Vec<String>>,
    #[builder(default)]
    pub fiat: BTreeMap<FiatType, AmountLimits>,
    #[builder(default)]
    pub crypto: BTreeMap<CryptoType, AmountLimits>,
    #[builder(default)]
    #[serde(default)]
    pub rates: Vec<ConversionRate>,
    #[builder(default)]
    #[serde(default)]
    pub fiat_accounts: BTreeMap<FiatAccountType, FiatAccountTypeQuoteData>,
    /// KYC schemas accepted for transfers. Empty means no KYC is required.
    #[builder(default)]
    #[serde(default)]
    pub kyc_schemas: Vec<KycSchema>,
    /// How long an issued quote is guaranteed. `None` issues quotes without expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_ttl_secs: Option<u64>,
}

impl ProviderConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn kyc_required(&self) -> bool {
        !self.kyc_schemas.is_empty()
    }

    pub fn rate(&self, fiat_type: FiatType, crypto_type: CryptoType) -> Option<&ConversionRate> {
        self.rates
            .iter()
            .find(|r| r.fiat_type == fiat_type && r.crypto_type == crypto_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = DispatcherConfig::builder()
            .initial_backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_millis(1000))
            .build();

        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(4), Duration::from_millis(800));
        assert_eq!(config.backoff(5), Duration::from_millis(1000));
        assert_eq!(config.backoff(64), Duration::from_millis(1000));
    }

    #[test]
    fn dispatcher_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.lanes, 4);
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn kyc_policy_defaults_allow_resubmission() {
        let policy = KycPolicy::default();
        assert!(policy.allow_resubmission_after_denial);
        assert_eq!(policy.approval_ttl, None);
    }

    #[test]
    fn limits_are_inclusive() {
        let limits = AmountLimits::builder()
            .min(10u32.into())
            .max(100u32.into())
            .build();

        assert_eq!(limits.check(10u32.into()), LimitCheck::Within);
        assert_eq!(limits.check(100u32.into()), LimitCheck::Within);
        assert_eq!(limits.check("9.99".parse().unwrap()), LimitCheck::TooLow);
        assert_eq!(limits.check("100.01".parse().unwrap()), LimitCheck::TooHigh);
        assert_eq!(AmountLimits::default().check(0u32.into()), LimitCheck::Within);
    }

    #[test]
    fn config_rejects_unknown_currency() {
        let result = ProviderConfig::from_json_str(
            r#"{
                "provider": "p",
                "transferAddress": "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20",
                "countries": {},
                "fiat": { "JPY": {} },
                "crypto": {}
            }"#,
        );
        assert!(result.is_err());
    }
}
