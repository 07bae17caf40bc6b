//! Core types used across the FiatConnect kit.

mod amount;
mod common;
mod currency;
mod duration;
mod schema;
mod status;

pub use amount::*;
pub use common::*;
pub use currency::*;
pub use duration::*;
pub use schema::*;
pub use status::*;
