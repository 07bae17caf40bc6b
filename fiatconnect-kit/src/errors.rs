use std::fmt::Display;

use http::StatusCode;

pub use fiatconnect_core::errors::*;

use crate::{
    types::{KycStatus, TransferStatus},
    webhook::OutboxError,
};

/// The status of any lifecycle entity, as named in [`ProtocolError::InvalidTransition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityStatus {
    Kyc(KycStatus),
    Transfer(TransferStatus),
}

impl From<KycStatus> for EntityStatus {
    fn from(value: KycStatus) -> Self {
        EntityStatus::Kyc(value)
    }
}

impl From<TransferStatus> for EntityStatus {
    fn from(value: TransferStatus) -> Self {
        EntityStatus::Transfer(value)
    }
}

impl Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityStatus::Kyc(s) => write!(f, "{s}"),
            EntityStatus::Transfer(s) => write!(f, "{s}"),
        }
    }
}

/// Errors returned by provider-side operations.
///
/// Every variant maps to one machine-readable [`ErrorCode`]; [`ProtocolError::to_response`]
/// builds the body a router should send back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("{0}")]
    FiatConnect(#[from] FiatConnectError),

    #[error("Invalid transition: {current} -> {proposed}")]
    InvalidTransition {
        current: EntityStatus,
        proposed: EntityStatus,
    },

    #[error("Conflict on {entity}: expected version {expected}, found {actual}")]
    Conflict {
        entity: String,
        expected: u64,
        actual: u64,
    },

    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),
}

impl ProtocolError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::FiatConnect(e) => (*e).into(),
            ProtocolError::InvalidTransition { .. } => LifecycleErrorCode::InvalidTransition.into(),
            ProtocolError::Conflict { .. } => LifecycleErrorCode::Conflict.into(),
            ProtocolError::Outbox(_) => LifecycleErrorCode::InternalError.into(),
        }
    }

    /// The HTTP status a router should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProtocolError::FiatConnect(e) => match e {
                FiatConnectError::ResourceNotFound => StatusCode::NOT_FOUND,
                FiatConnectError::ResourceExists => StatusCode::CONFLICT,
                FiatConnectError::UnsupportedSchema | FiatConnectError::InvalidSchema => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                FiatConnectError::TransferNotAllowed | FiatConnectError::KycExpired => {
                    StatusCode::FORBIDDEN
                }
                _ => StatusCode::BAD_REQUEST,
            },
            ProtocolError::InvalidTransition { .. } | ProtocolError::Conflict { .. } => {
                StatusCode::CONFLICT
            }
            ProtocolError::Outbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The error body. Internal details never leave the process.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse { error: self.code() }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ProtocolError::Conflict { .. })
    }
}

impl From<Error> for ProtocolError {
    fn from(value: Error) -> Self {
        #[cfg(feature = "tracing")]
        tracing::debug!("Rejecting payload: {value}");
        #[cfg(not(feature = "tracing"))]
        let _ = value;

        ProtocolError::FiatConnect(FiatConnectError::InvalidSchema)
    }
}
