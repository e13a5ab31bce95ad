//! Cambio Rate Sources
//!
//! Fetch-and-parse adapters for the external USD rate providers, plus the
//! registry that runs one aggregation pass per currency.
//!
//! Each adapter is independent: a failing or slow provider is logged and
//! excluded from the pass without affecting the others.

pub mod adapter;
pub mod ars;
pub mod brl;
pub mod error;
pub mod extract;
pub mod http;
pub mod registry;

pub use adapter::RateSource;
pub use error::{SourceError, SourceResult};
pub use registry::{CurrencySources, SourceRegistry};

#[cfg(any(test, feature = "test-utils"))]
pub use adapter::MockRateSource;
