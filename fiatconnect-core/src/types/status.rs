//! Lifecycle statuses of transfers and KYC records.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferType {
    /// Fiat in, crypto out to the user's wallet.
    TransferIn,
    /// Crypto in from the user's wallet, fiat out.
    TransferOut,
}

impl Display for TransferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferType::TransferIn => write!(f, "TransferIn"),
            TransferType::TransferOut => write!(f, "TransferOut"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    TransferStarted,
    TransferPending,
    TransferComplete,
    TransferFailed,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 4] = [
        TransferStatus::TransferStarted,
        TransferStatus::TransferPending,
        TransferStatus::TransferComplete,
        TransferStatus::TransferFailed,
    ];

    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::TransferComplete | TransferStatus::TransferFailed
        )
    }
}

impl Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransferStatus::TransferStarted => "TransferStarted",
            TransferStatus::TransferPending => "TransferPending",
            TransferStatus::TransferComplete => "TransferComplete",
            TransferStatus::TransferFailed => "TransferFailed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KycStatus {
    NotCreated,
    Pending,
    Approved,
    Denied,
    Expired,
}

impl KycStatus {
    pub const ALL: [KycStatus; 5] = [
        KycStatus::NotCreated,
        KycStatus::Pending,
        KycStatus::Approved,
        KycStatus::Denied,
        KycStatus::Expired,
    ];

    /// `Denied` is terminal unless the provider allows resubmission.
    pub fn is_terminal(&self) -> bool {
        matches!(self, KycStatus::Denied | KycStatus::Expired)
    }
}

impl Display for KycStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KycStatus::NotCreated => "NotCreated",
            KycStatus::Pending => "Pending",
            KycStatus::Approved => "Approved",
            KycStatus::Denied => "Denied",
            KycStatus::Expired => "Expired",
        };
        write!(f, "{s}")
    }
}
