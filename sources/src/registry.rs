//! One aggregation pass per currency.
//!
//! The registry owns the per-currency source lists and runs a single pass:
//! every registered source is attempted, failures are logged and excluded,
//! and the surviving quotes are returned in registration order. An empty
//! result is a valid outcome, not an error.

use std::sync::Arc;

use cambio_common::time::constants;
use cambio_common::{Currency, Quote, QuoteSet};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::adapter::RateSource;
use crate::ars::{AmbitoSource, CronistaSource, DolarHoySource};
use crate::brl::{DerivedRateSource, WiseSource};
use crate::error::{SourceError, SourceResult};

/// The sources registered for one currency.
///
/// `primary` is fetched first and its quote seeds the `derived` providers;
/// `independent` sources are fetched concurrently. Collection order is
/// always primary, derived, then independent in registration order.
pub struct CurrencySources {
    pub primary: Option<Arc<dyn RateSource>>,
    pub derived: Vec<DerivedRateSource>,
    pub independent: Vec<Arc<dyn RateSource>>,
}

impl CurrencySources {
    /// A plan with only independent sources.
    pub fn independent(sources: Vec<Arc<dyn RateSource>>) -> Self {
        Self {
            primary: None,
            derived: Vec::new(),
            independent: sources,
        }
    }

    /// A plan with a primary source seeding derived providers.
    pub fn with_primary(primary: Arc<dyn RateSource>, derived: Vec<DerivedRateSource>) -> Self {
        Self {
            primary: Some(primary),
            derived,
            independent: Vec::new(),
        }
    }
}

/// Registry of rate sources, keyed by currency.
pub struct SourceRegistry {
    brl: CurrencySources,
    ars: CurrencySources,
    fetch_timeout: std::time::Duration,
}

impl SourceRegistry {
    /// Build the production wiring for both currencies.
    pub fn new(client: reqwest::Client) -> Self {
        let brl = CurrencySources::with_primary(
            Arc::new(WiseSource::new(client.clone())),
            vec![DerivedRateSource::nubank(), DerivedRateSource::nomad()],
        );

        let ars = CurrencySources::independent(vec![
            Arc::new(AmbitoSource::new(client.clone())),
            Arc::new(DolarHoySource::new(client.clone())),
            Arc::new(CronistaSource::new(client)),
        ]);

        Self::with_sources(brl, ars)
    }

    /// Build a registry from explicit per-currency plans.
    pub fn with_sources(brl: CurrencySources, ars: CurrencySources) -> Self {
        Self {
            brl,
            ars,
            fetch_timeout: constants::source_fetch_timeout(),
        }
    }

    /// Override the per-source fetch bound.
    pub fn with_fetch_timeout(mut self, fetch_timeout: std::time::Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Run one aggregation pass for `currency`.
    ///
    /// Never fails as a whole: each source is isolated in its own task with
    /// its own time bound, and a panic or timeout only drops that source's
    /// entry from the result.
    pub async fn aggregate(&self, currency: Currency) -> QuoteSet {
        let plan = match currency {
            Currency::Brl => &self.brl,
            Currency::Ars => &self.ars,
        };

        let mut quotes = QuoteSet::new();

        let primary_quote = match &plan.primary {
            Some(primary) => {
                let name = primary.name().to_string();
                match Self::join_fetch(self.spawn_fetch(primary), self.fetch_timeout).await {
                    Ok(quote) => {
                        debug!(currency = %currency, source = %name, "primary source succeeded");
                        quotes.push(quote.clone());
                        Some(quote)
                    }
                    Err(e) => {
                        warn!(currency = %currency, source = %name, error = %e, "primary source failed");
                        None
                    }
                }
            }
            None => None,
        };

        for derived in &plan.derived {
            quotes.push(derived.quote_from(primary_quote.as_ref()));
        }

        // Concurrent fan-out: all tasks start before any is awaited, and
        // awaiting them in order keeps the collection deterministic.
        let handles: Vec<_> = plan
            .independent
            .iter()
            .map(|source| self.spawn_fetch(source))
            .collect();

        for (source, handle) in plan.independent.iter().zip(handles) {
            match Self::join_fetch(handle, self.fetch_timeout).await {
                Ok(quote) => {
                    debug!(currency = %currency, source = source.name(), "source succeeded");
                    quotes.push(quote);
                }
                Err(e) => {
                    warn!(currency = %currency, source = source.name(), error = %e, "source failed");
                }
            }
        }

        info!(
            currency = %currency,
            quotes = quotes.len(),
            "aggregation pass completed"
        );

        quotes
    }

    fn spawn_fetch(
        &self,
        source: &Arc<dyn RateSource>,
    ) -> JoinHandle<Result<SourceResult<Quote>, tokio::time::error::Elapsed>> {
        let source = Arc::clone(source);
        let fetch_timeout = self.fetch_timeout;
        tokio::spawn(async move { timeout(fetch_timeout, source.fetch()).await })
    }

    async fn join_fetch(
        handle: JoinHandle<Result<SourceResult<Quote>, tokio::time::error::Elapsed>>,
        fetch_timeout: std::time::Duration,
    ) -> SourceResult<Quote> {
        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SourceError::Timeout(fetch_timeout)),
            Err(e) => Err(SourceError::TaskFailed(e.to_string())),
        }
    }
}
