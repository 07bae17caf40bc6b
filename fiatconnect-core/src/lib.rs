//! FiatConnect core library.
//!
//! This library provides the wire types of the FiatConnect protocol: the closed
//! vocabularies (currencies, schemas, statuses, error codes), the request and
//! response bodies of every endpoint, and the webhook bodies sent to subscribers.
//!
//! Request typings follow the protocol's naming convention:
//!
//! - Request query parameters: `XxxRequestQuery`
//! - Request path parameters: `XxxRequestParams`
//! - Request bodies: `XxxRequestBody`
//! - Response bodies: `XxxResponse`

pub mod core;
pub mod errors;
pub mod schemas;
pub mod transport;
pub mod types;
pub mod webhook;
