//! Cambio Common Types
//!
//! Shared types used across the cambio quote aggregator: currency codes,
//! quote payloads, and timing constants.

pub mod currency;
pub mod quote;
pub mod time;

pub use currency::*;
pub use quote::*;
pub use time::*;
