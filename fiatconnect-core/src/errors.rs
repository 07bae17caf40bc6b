use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Error codes returned by FiatConnect endpoints.
///
/// This is a closed vocabulary: clients branch on the code, so unknown codes are
/// rejected on deserialization rather than passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum FiatConnectError {
    #[error("GeoNotSupported")]
    GeoNotSupported,
    #[error("CryptoAmountTooLow")]
    CryptoAmountTooLow,
    #[error("CryptoAmountTooHigh")]
    CryptoAmountTooHigh,
    #[error("FiatAmountTooLow")]
    FiatAmountTooLow,
    #[error("FiatAmountTooHigh")]
    FiatAmountTooHigh,
    #[error("CryptoNotSupported")]
    CryptoNotSupported,
    #[error("FiatNotSupported")]
    FiatNotSupported,
    #[error("UnsupportedSchema")]
    UnsupportedSchema,
    #[error("InvalidSchema")]
    InvalidSchema,
    #[error("ResourceExists")]
    ResourceExists,
    #[error("ResourceNotFound")]
    ResourceNotFound,
    #[error("TransferNotAllowed")]
    TransferNotAllowed,
    #[error("KycExpired")]
    KycExpired,
}

impl FiatConnectError {
    /// All error codes, in declaration order.
    pub const ALL: [FiatConnectError; 13] = [
        FiatConnectError::GeoNotSupported,
        FiatConnectError::CryptoAmountTooLow,
        FiatConnectError::CryptoAmountTooHigh,
        FiatConnectError::FiatAmountTooLow,
        FiatConnectError::FiatAmountTooHigh,
        FiatConnectError::CryptoNotSupported,
        FiatConnectError::FiatNotSupported,
        FiatConnectError::UnsupportedSchema,
        FiatConnectError::InvalidSchema,
        FiatConnectError::ResourceExists,
        FiatConnectError::ResourceNotFound,
        FiatConnectError::TransferNotAllowed,
        FiatConnectError::KycExpired,
    ];
}

/// Error body returned by FiatConnect endpoints: `{"error": "<code>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
}

/// An error code in an [`ErrorResponse`].
///
/// Besides the protocol vocabulary, lifecycle operations surface two codes of their own
/// (`InvalidTransition` and `Conflict`) plus an opaque `InternalError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Protocol(FiatConnectError),
    Lifecycle(LifecycleErrorCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleErrorCode {
    InvalidTransition,
    Conflict,
    InternalError,
}

impl From<FiatConnectError> for ErrorCode {
    fn from(value: FiatConnectError) -> Self {
        ErrorCode::Protocol(value)
    }
}

impl From<LifecycleErrorCode> for ErrorCode {
    fn from(value: LifecycleErrorCode) -> Self {
        ErrorCode::Lifecycle(value)
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::Protocol(e) => write!(f, "{e}"),
            ErrorCode::Lifecycle(e) => write!(f, "{e:?}"),
        }
    }
}

/// Error types for FiatConnect core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// JSON serialization/deserialization errors.
    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Malformed decimal amounts.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed account addresses.
    #[error("Invalid account address: {0}")]
    InvalidAddress(#[from] alloy_primitives::AddressError),

    /// Malformed ISO-8601 durations.
    #[error("Invalid ISO-8601 duration: {0}")]
    InvalidDuration(String),

    /// A schema payload failed its field validation.
    #[error("Invalid schema payload: {0}")]
    InvalidPayload(String),
}

/// A specialized `Result` type for FiatConnect core operations.
pub type Result<T> = std::result::Result<T, Error>;
