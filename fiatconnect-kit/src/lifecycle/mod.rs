//! KYC and transfer lifecycles.
//!
//! [`LifecycleMachine`] owns the current state of every KYC record and transfer, enforces the
//! transitions in [`rules`] and publishes a webhook for each committed change.

mod entity;
mod machine;
pub mod rules;
mod store;

pub use entity::{KycKey, KycRecord, LifecycleEntity, TransferRecord};
pub use machine::{LifecycleMachine, Tracks};
pub use store::{EntityStore, Versioned};
