//! Freshness-bounded quote cache with per-currency refresh deduplication.
//!
//! Per currency the cache is in one of two states: idle, or refreshing with
//! exactly one aggregation pass in flight. A request that misses the
//! freshness window either starts that pass or subscribes to the one already
//! running; every subscriber receives the same pass result. The in-flight
//! marker is removed unconditionally when the pass finishes, so a faulted
//! pass can never wedge a currency.

use std::sync::Arc;

use cambio_common::{time, Currency, QuoteSet};
use cambio_sources::SourceRegistry;
use chrono::Duration;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::store::QuoteStore;

/// Configuration for the quote cache.
#[derive(Debug, Clone)]
pub struct QuoteCacheConfig {
    /// How long a stored snapshot is served without refreshing.
    pub freshness_window: Duration,
}

impl Default for QuoteCacheConfig {
    fn default() -> Self {
        Self {
            freshness_window: time::constants::freshness_window(),
        }
    }
}

/// Serves quotes from the store while they are fresh and coordinates
/// refreshes when they are not.
pub struct QuoteCache {
    store: Arc<dyn QuoteStore>,
    sources: Arc<SourceRegistry>,
    refreshing: Arc<DashMap<Currency, broadcast::Sender<QuoteSet>>>,
    config: QuoteCacheConfig,
}

impl QuoteCache {
    /// Create a cache with the default freshness window.
    pub fn new(store: Arc<dyn QuoteStore>, sources: Arc<SourceRegistry>) -> Self {
        Self::with_config(store, sources, QuoteCacheConfig::default())
    }

    /// Create a cache with a custom configuration.
    pub fn with_config(
        store: Arc<dyn QuoteStore>,
        sources: Arc<SourceRegistry>,
        config: QuoteCacheConfig,
    ) -> Self {
        Self {
            store,
            sources,
            refreshing: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Get the current quote set for `currency`.
    ///
    /// Serves the stored snapshot while fresh, otherwise joins or starts the
    /// single refresh pass for the currency. Infallible from the caller's
    /// perspective: on total source failure or storage trouble the result
    /// degrades to the last stored snapshot, possibly empty.
    pub async fn get(&self, currency: Currency) -> QuoteSet {
        if self.is_fresh(currency).await {
            debug!(currency = %currency, "serving cached snapshot");
            return self.load_stored(currency).await;
        }

        let mut rx = match self.refreshing.entry(currency) {
            Entry::Occupied(entry) => {
                debug!(currency = %currency, "joining refresh already in flight");
                entry.get().subscribe()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                self.spawn_refresh(currency, tx);
                rx
            }
        };

        match rx.recv().await {
            Ok(quotes) => quotes,
            // The refresh task went away without broadcasting; fall back to
            // whatever is stored.
            Err(_) => self.load_stored(currency).await,
        }
    }

    /// Run the refresh in a detached task: once started, a pass always runs
    /// to completion even if every requester has gone away.
    fn spawn_refresh(&self, currency: Currency, tx: broadcast::Sender<QuoteSet>) {
        let store = Arc::clone(&self.store);
        let sources = Arc::clone(&self.sources);
        let refreshing = Arc::clone(&self.refreshing);

        info!(currency = %currency, "starting refresh");
        tokio::spawn(async move {
            let result = Self::run_refresh(currency, &store, &sources).await;

            // The marker comes out before the broadcast so a late request
            // starts a new pass instead of waiting on a closed channel.
            refreshing.remove(&currency);
            let _ = tx.send(result);
        });
    }

    async fn run_refresh(
        currency: Currency,
        store: &Arc<dyn QuoteStore>,
        sources: &Arc<SourceRegistry>,
    ) -> QuoteSet {
        // The pass runs in its own task so that a fault inside aggregation
        // surfaces here as a join error instead of tearing down the
        // refresh bookkeeping.
        let pass = {
            let sources = Arc::clone(sources);
            tokio::spawn(async move { sources.aggregate(currency).await })
        };

        let quotes = match pass.await {
            Ok(quotes) => quotes,
            Err(e) => {
                error!(currency = %currency, error = %e, "aggregation pass aborted");
                QuoteSet::new()
            }
        };

        if quotes.is_empty() {
            info!(currency = %currency, "refresh produced no quotes, serving stored snapshot");
            return Self::load_from(store, currency).await;
        }

        match store.save(currency, &quotes).await {
            Ok(()) => {
                info!(currency = %currency, quotes = quotes.len(), "snapshot refreshed");
            }
            Err(e) => {
                // Best effort: the fresh result still goes out to callers;
                // the next request will aggregate again.
                error!(currency = %currency, error = %e, "failed to persist snapshot");
            }
        }

        quotes
    }

    async fn is_fresh(&self, currency: Currency) -> bool {
        match self.store.last_fetched_at(currency).await {
            Ok(Some(fetched_at)) => time::is_within(fetched_at, self.config.freshness_window),
            Ok(None) => false,
            Err(e) => {
                warn!(currency = %currency, error = %e, "freshness check failed, forcing refresh");
                false
            }
        }
    }

    async fn load_stored(&self, currency: Currency) -> QuoteSet {
        Self::load_from(&self.store, currency).await
    }

    async fn load_from(store: &Arc<dyn QuoteStore>, currency: Currency) -> QuoteSet {
        match store.load(currency).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(currency = %currency, error = %e, "failed to read stored snapshot");
                QuoteSet::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryQuoteStore;
    use cambio_common::Quote;
    use cambio_sources::{CurrencySources, MockRateSource, SourceRegistry};
    use futures::future::join_all;
    use rust_decimal_macros::dec;
    use std::time::Duration as StdDuration;

    fn quote(source: &str) -> Quote {
        Quote::new(dec!(1010.00), dec!(1060.00), format!("mock://{source}"))
    }

    fn registry_of(sources: Vec<Arc<MockRateSource>>) -> Arc<SourceRegistry> {
        let sources = sources
            .into_iter()
            .map(|s| s as Arc<dyn cambio_sources::RateSource>)
            .collect();
        Arc::new(SourceRegistry::with_sources(
            CurrencySources::independent(Vec::new()),
            CurrencySources::independent(sources),
        ))
    }

    fn cache_over(
        store: Arc<MemoryQuoteStore>,
        sources: Vec<Arc<MockRateSource>>,
    ) -> QuoteCache {
        QuoteCache::new(store, registry_of(sources))
    }

    #[tokio::test]
    async fn fresh_snapshot_is_served_without_aggregating() {
        let store = Arc::new(MemoryQuoteStore::new());
        store.set_snapshot(Currency::Ars, vec![quote("stored")], time::now());
        let source = Arc::new(MockRateSource::returning("live", quote("live")));
        let cache = cache_over(Arc::clone(&store), vec![Arc::clone(&source)]);

        let quotes = cache.get(Currency::Ars).await;

        assert_eq!(quotes, vec![quote("stored")]);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn second_read_within_window_hits_the_cache() {
        let store = Arc::new(MemoryQuoteStore::new());
        let source = Arc::new(MockRateSource::returning("live", quote("live")));
        let cache = cache_over(Arc::clone(&store), vec![Arc::clone(&source)]);

        let first = cache.get(Currency::Ars).await;
        let second = cache.get(Currency::Ars).await;

        assert_eq!(first, second);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_share_a_single_pass() {
        let store = Arc::new(MemoryQuoteStore::new());
        let source = Arc::new(
            MockRateSource::returning("live", quote("live"))
                .with_delay(StdDuration::from_millis(50)),
        );
        let cache = Arc::new(cache_over(Arc::clone(&store), vec![Arc::clone(&source)]));

        let results = join_all((0..10).map(|_| {
            let cache = Arc::clone(&cache);
            async move { cache.get(Currency::Ars).await }
        }))
        .await;

        assert_eq!(source.call_count(), 1);
        for result in &results {
            assert_eq!(result, &results[0]);
        }
    }

    #[tokio::test]
    async fn total_failure_serves_prior_snapshot_unchanged() {
        let store = Arc::new(MemoryQuoteStore::new());
        let stale_at = time::now() - Duration::seconds(120);
        let stored = vec![quote("a"), quote("b"), quote("c")];
        store.set_snapshot(Currency::Ars, stored.clone(), stale_at);
        let source = Arc::new(MockRateSource::failing("down"));
        let cache = cache_over(Arc::clone(&store), vec![source]);

        let quotes = cache.get(Currency::Ars).await;

        assert_eq!(quotes, stored);
        // The failed pass must not advance the snapshot's capture time.
        assert_eq!(
            store.last_fetched_at(Currency::Ars).await.unwrap(),
            Some(stale_at)
        );
    }

    #[tokio::test]
    async fn total_failure_without_history_yields_empty_set() {
        let store = Arc::new(MemoryQuoteStore::new());
        let cache = cache_over(store, vec![Arc::new(MockRateSource::failing("down"))]);

        assert!(cache.get(Currency::Ars).await.is_empty());
    }

    #[tokio::test]
    async fn successful_refresh_replaces_the_snapshot_wholesale() {
        let store = Arc::new(MemoryQuoteStore::new());
        let stale_at = time::now() - Duration::seconds(120);
        store.set_snapshot(
            Currency::Ars,
            vec![quote("old1"), quote("old2"), quote("old3")],
            stale_at,
        );
        let cache = cache_over(
            Arc::clone(&store),
            vec![
                Arc::new(MockRateSource::returning("new1", quote("new1"))),
                Arc::new(MockRateSource::returning("new2", quote("new2"))),
            ],
        );

        let quotes = cache.get(Currency::Ars).await;

        assert_eq!(quotes, vec![quote("new1"), quote("new2")]);
        // No merging with the replaced entries.
        assert_eq!(
            store.load(Currency::Ars).await.unwrap(),
            vec![quote("new1"), quote("new2")]
        );
    }

    #[tokio::test]
    async fn write_failure_still_returns_the_fresh_result() {
        let store = Arc::new(MemoryQuoteStore::new());
        store.fail_writes(true);
        let source = Arc::new(MockRateSource::returning("live", quote("live")));
        let cache = cache_over(Arc::clone(&store), vec![Arc::clone(&source)]);

        let quotes = cache.get(Currency::Ars).await;

        assert_eq!(quotes, vec![quote("live")]);
        assert!(store.load(Currency::Ars).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_failure_forces_a_refresh() {
        let store = Arc::new(MemoryQuoteStore::new());
        store.set_snapshot(Currency::Ars, vec![quote("stored")], time::now());
        store.fail_reads(true);
        let source = Arc::new(MockRateSource::returning("live", quote("live")));
        let cache = cache_over(Arc::clone(&store), vec![Arc::clone(&source)]);

        let quotes = cache.get(Currency::Ars).await;

        assert_eq!(quotes, vec![quote("live")]);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn expired_window_triggers_a_new_pass() {
        let store = Arc::new(MemoryQuoteStore::new());
        let source = Arc::new(MockRateSource::returning("live", quote("live")));
        let cache = QuoteCache::with_config(
            Arc::clone(&store) as Arc<dyn QuoteStore>,
            registry_of(vec![Arc::clone(&source)]),
            QuoteCacheConfig {
                freshness_window: Duration::zero(),
            },
        );

        cache.get(Currency::Ars).await;
        cache.get(Currency::Ars).await;

        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn currencies_refresh_independently() {
        let store = Arc::new(MemoryQuoteStore::new());
        let ars = Arc::new(MockRateSource::returning("ars", quote("ars")));
        let brl_quote = Quote::new(dec!(5.10), dec!(5.13), "mock://brl");
        let brl = Arc::new(MockRateSource::returning("brl", brl_quote.clone()));
        let registry = Arc::new(SourceRegistry::with_sources(
            CurrencySources::independent(vec![
                Arc::clone(&brl) as Arc<dyn cambio_sources::RateSource>
            ]),
            CurrencySources::independent(vec![
                Arc::clone(&ars) as Arc<dyn cambio_sources::RateSource>
            ]),
        ));
        let cache = QuoteCache::new(store, registry);

        assert_eq!(cache.get(Currency::Brl).await, vec![brl_quote]);
        assert_eq!(cache.get(Currency::Ars).await, vec![quote("ars")]);
        assert_eq!(brl.call_count(), 1);
        assert_eq!(ars.call_count(), 1);
    }
}
