//! Quote issuance for `GET /quote/in` and `GET /quote/out`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    config::{AmountLimits, LimitCheck, ProviderConfig},
    errors::{FiatConnectError, ProtocolError},
    transport::{KycRequirements, Quote, QuoteRequestQuery, QuoteResponse},
    types::{DecimalAmount, TransferType},
};

/// Issues quotes according to a [`ProviderConfig`].
#[derive(Debug, Clone)]
pub struct QuoteDesk {
    config: ProviderConfig,
}

impl QuoteDesk {
    pub fn new(config: ProviderConfig) -> Self {
        QuoteDesk { config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Quote a transfer in `direction`.
    ///
    /// Exactly one of `fiat_amount` and `crypto_amount` must be given; the other side is
    /// computed from the configured rate.
    pub fn quote(
        &self,
        query: &QuoteRequestQuery,
        direction: TransferType,
        now: DateTime<Utc>,
    ) -> Result<QuoteResponse, ProtocolError> {
        self.check_geo(query)?;

        let fiat_limits = self
            .config
            .fiat
            .get(&query.fiat_type)
            .ok_or(FiatConnectError::FiatNotSupported)?;
        let crypto_limits = self
            .config
            .crypto
            .get(&query.crypto_type)
            .ok_or(FiatConnectError::CryptoNotSupported)?;
        let rate = self
            .config
            .rate(query.fiat_type, query.crypto_type)
            .ok_or(FiatConnectError::CryptoNotSupported)?;
        let rate = match direction {
            TransferType::TransferIn => rate.transfer_in,
            TransferType::TransferOut => rate.transfer_out,
        };
        if rate.is_zero() {
            return Err(FiatConnectError::CryptoNotSupported.into());
        }

        // Amounts too large to convert are above any configurable limit.
        let (fiat_amount, crypto_amount) = match (query.fiat_amount, query.crypto_amount) {
            (Some(fiat), None) => {
                let crypto: Decimal = fiat
                    .value()
                    .checked_mul(rate.value())
                    .ok_or(FiatConnectError::FiatAmountTooHigh)?;
                let crypto = DecimalAmount(crypto).round_dp(query.crypto_type.decimals());
                (fiat, crypto)
            }
            (None, Some(crypto)) => {
                let fiat: Decimal = crypto
                    .value()
                    .checked_div(rate.value())
                    .ok_or(FiatConnectError::CryptoAmountTooHigh)?;
                let fiat = DecimalAmount(fiat).round_dp(query.fiat_type.decimals());
                (fiat, crypto)
            }
            _ => return Err(FiatConnectError::InvalidSchema.into()),
        };

        check_limits(
            fiat_limits,
            fiat_amount,
            FiatConnectError::FiatAmountTooLow,
            FiatConnectError::FiatAmountTooHigh,
        )?;
        check_limits(
            crypto_limits,
            crypto_amount,
            FiatConnectError::CryptoAmountTooLow,
            FiatConnectError::CryptoAmountTooHigh,
        )?;

        let guaranteed_until = self
            .config
            .quote_ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| now + chrono::Duration::seconds(secs));

        let quote = Quote::builder()
            .fiat_type(query.fiat_type)
            .crypto_type(query.crypto_type)
            .fiat_amount(fiat_amount)
            .crypto_amount(crypto_amount)
            .maybe_guaranteed_until(guaranteed_until)
            .build();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Issued {direction} quote: {fiat_amount} {} for {crypto_amount} {}",
            quote.fiat_type,
            quote.crypto_type
        );

        Ok(QuoteResponse {
            quote,
            kyc: KycRequirements::builder()
                .kyc_required(self.config.kyc_required())
                .kyc_schemas(self.config.kyc_schemas.clone())
                .build(),
            fiat_account: self.config.fiat_accounts.clone(),
        })
    }

    fn check_geo(&self, query: &QuoteRequestQuery) -> Result<(), FiatConnectError> {
        let regions = self
            .config
            .countries
            .get(&query.country)
            .ok_or(FiatConnectError::GeoNotSupported)?;
        if regions.is_empty() {
            return Ok(());
        }
        match &query.region {
            Some(region) if regions.contains(region) => Ok(()),
            _ => Err(FiatConnectError::GeoNotSupported),
        }
    }
}

fn check_limits(
    limits: &AmountLimits,
    amount: DecimalAmount,
    too_low: FiatConnectError,
    too_high: FiatConnectError,
) -> Result<(), FiatConnectError> {
    match limits.check(amount) {
        LimitCheck::Within => Ok(()),
        LimitCheck::TooLow => Err(too_low),
        LimitCheck::TooHigh => Err(too_high),
    }
}
