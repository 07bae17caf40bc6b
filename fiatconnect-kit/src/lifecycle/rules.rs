//! Allowed status transitions.

use crate::{
    config::KycPolicy,
    types::{KycStatus, TransferStatus},
};

/// `Started -> Pending -> Complete | Failed`, plus `Started -> Failed` for transfers that fail
/// before any funds move.
pub fn transfer_transition_allowed(from: TransferStatus, to: TransferStatus) -> bool {
    use TransferStatus::*;

    matches!(
        (from, to),
        (TransferStarted, TransferPending)
            | (TransferStarted, TransferFailed)
            | (TransferPending, TransferComplete)
            | (TransferPending, TransferFailed)
    )
}

/// `NotCreated -> Pending -> Approved | Denied`, then `Approved -> Expired`.
/// `Denied -> Pending` only when the policy allows resubmission.
pub fn kyc_transition_allowed(from: KycStatus, to: KycStatus, policy: &KycPolicy) -> bool {
    use KycStatus::*;

    match (from, to) {
        (NotCreated, Pending) | (Pending, Approved) | (Pending, Denied) | (Approved, Expired) => {
            true
        }
        (Denied, Pending) => policy.allow_resubmission_after_denial,
        _ => false,
    }
}
