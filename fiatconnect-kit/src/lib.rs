//! # FiatConnect Kit
//!
//! FiatConnect Kit is a modular, framework-agnostic SDK for payment providers implementing the
//! FiatConnect on/off-ramp protocol.
//!
//! The kit does not route HTTP requests, persist data or authenticate callers. It gives you the
//! typed wire contract plus the pieces every provider has to get right behind it.
//!
//! ## Core Components Overview
//!
//! ### For the FiatConnect Protocol
//!
//! - **[`types`]**, **[`transport`]**, **[`webhook`]**: the wire contract, re-exported from
//!   `fiatconnect-core` (webhook bodies live in [`webhook::body`]).
//! - **[`registry`]**: which KYC and fiat account schemas the provider accepts, and how their
//!   payloads are decoded and validated.
//! - **[`errors`]**: the closed [`FiatConnectError`](errors::FiatConnectError) vocabulary and
//!   [`ProtocolError`](errors::ProtocolError), which maps every failure to a machine-readable code.
//!
//! ### Provider Machinery
//!
//! - **[`quotes`]**: issues quotes from a [`ProviderConfig`](config::ProviderConfig).
//! - **[`accounts`]**: registers, lists and deletes fiat accounts.
//! - **[`lifecycle`]**: the KYC and transfer state machine, with optimistic concurrency and
//!   atomic webhook enqueueing.
//! - **[`webhook`]**: the outbox, the retrying dispatcher, transports and consumer-side
//!   deduplication.
//!
//! ## Extending the Vocabularies
//!
//! KYC and fiat account schemas are open-world. A new schema is a plain data type implementing
//! [`core::KycSchemaData`] or [`core::FiatAccountSchemaData`], registered once:
//!
//! ```
//! use fiatconnect_kit::{
//!     registry::SchemaRegistry,
//!     schemas::{MockCheckingAccount, MockNameAndAddressKyc},
//!     types::{FiatAccountSchema, KycSchema},
//! };
//!
//! let registry = SchemaRegistry::new()
//!     .register_kyc::<MockNameAndAddressKyc>()
//!     .register_fiat_account::<MockCheckingAccount>();
//!
//! assert!(registry.supports_kyc(KycSchema::MockNameAndAddress));
//! assert!(registry.supports_fiat_account(FiatAccountSchema::MockCheckingAccount));
//! ```

pub mod core {
    pub use fiatconnect_core::core::*;
}

pub mod schemas {
    pub use fiatconnect_core::schemas::*;
}

pub mod transport {
    pub use fiatconnect_core::transport::*;
}

pub mod types {
    pub use fiatconnect_core::types::*;
}

pub mod accounts;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod quotes;
pub mod registry;
pub mod webhook;
