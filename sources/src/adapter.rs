//! The rate source trait and test doubles.

use async_trait::async_trait;
use cambio_common::Quote;

use crate::error::SourceResult;

/// A single provider's fetch-and-parse routine for one currency's USD rate.
///
/// Implementations are independent and order-insensitive; the registry
/// decides registration order and isolation.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Short provider name, used for logging.
    fn name(&self) -> &str;

    /// Fetch one quote from the provider.
    async fn fetch(&self) -> SourceResult<Quote>;
}

/// Scripted rate source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    name: String,
    quote: parking_lot::Mutex<Option<Quote>>,
    delay: Option<std::time::Duration>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a mock that fails every fetch.
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quote: parking_lot::Mutex::new(None),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock that returns `quote` on every fetch.
    pub fn returning(name: impl Into<String>, quote: Quote) -> Self {
        Self {
            name: name.into(),
            quote: parking_lot::Mutex::new(Some(quote)),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering each fetch.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the scripted quote. `None` makes subsequent fetches fail.
    pub fn set_quote(&self, quote: Option<Quote>) {
        *self.quote.lock() = quote;
    }

    /// Number of fetches observed so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> SourceResult<Quote> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.quote
            .lock()
            .clone()
            .ok_or_else(|| crate::error::SourceError::RateNotFound {
                url: format!("mock://{}", self.name),
            })
    }
}
