//! Cambio Quote Service
//!
//! The coordination layer between the HTTP surface and the rate sources:
//! snapshot persistence, the freshness-bounded cache that deduplicates
//! concurrent refreshes, and cross-source statistics.

pub mod cache;
pub mod error;
pub mod stats;
pub mod store;

pub use cache::{QuoteCache, QuoteCacheConfig};
pub use error::{StoreError, StoreResult};
pub use stats::{average, slippage, PriceAverages, SlippageEntry};
pub use store::{PgQuoteStore, QuoteStore};

#[cfg(any(test, feature = "test-utils"))]
pub use store::MemoryQuoteStore;
