//! Price manager
//!
//! Resolves a price query through the cached-value -> live-fetch ->
//! persisted-fallback chain and drives the per-subscription broadcast loop
//! that feeds subscriber mailboxes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::RwLock;
use quotefeed_core::{CacheKey, FeedError, PriceQuery, QuoteSource};
use tracing::{debug, info, warn};

use crate::mailbox::{Delivery, Mailbox};
use crate::price_store::PriceStore;

/// Tunables for the resolution chain and the broadcast loop
#[derive(Debug, Clone)]
pub struct PriceManagerConfig {
    /// How long a cached payload stays fresh.
    pub cache_ttl: Duration,
    /// Delay between broadcast iterations, bounding upstream load.
    pub poll_interval: Duration,
}

impl Default for PriceManagerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Cached payload with its own freshness timestamp.
///
/// Freshness is tracked per entry: refreshing one query never extends
/// another's window.
#[derive(Debug, Clone)]
struct CachedQuote {
    payload: Bytes,
    updated_at: Instant,
}

impl CachedQuote {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.updated_at.elapsed() < ttl
    }
}

/// Terminal state of a broadcast subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastEnd {
    /// Every link of the resolution chain failed.
    Unavailable,
    /// The subscriber's mailbox closed under us.
    SubscriberGone,
}

/// Resolves price queries and feeds subscriber mailboxes
pub struct PriceManager {
    source: Arc<dyn QuoteSource>,
    store: Arc<PriceStore>,
    cache: RwLock<HashMap<CacheKey, CachedQuote>>,
    config: PriceManagerConfig,
}

impl PriceManager {
    /// Create a new price manager with default tunables
    pub fn new(source: Arc<dyn QuoteSource>, store: Arc<PriceStore>) -> Self {
        Self::with_config(source, store, PriceManagerConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn QuoteSource>,
        store: Arc<PriceStore>,
        config: PriceManagerConfig,
    ) -> Self {
        Self {
            source,
            store,
            cache: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn load_from_cache(&self, query: &PriceQuery) -> Option<Bytes> {
        let cache = self.cache.read();
        cache
            .get(&query.cache_key())
            .filter(|entry| entry.is_fresh(self.config.cache_ttl))
            .map(|entry| entry.payload.clone())
    }

    fn save_to_cache(&self, query: &PriceQuery, payload: Bytes) {
        self.cache.write().insert(
            query.cache_key(),
            CachedQuote {
                payload,
                updated_at: Instant::now(),
            },
        );
    }

    /// Resolve a query through cache -> live fetch -> persisted fallback.
    ///
    /// `persist_fetch` additionally upserts the fallback store after a
    /// fresh live fetch, keeping it eventually consistent with upstream.
    /// Fallback payloads never touch the cache.
    async fn resolve(&self, query: &PriceQuery, persist_fetch: bool) -> Result<Bytes, FeedError> {
        if let Some(payload) = self.load_from_cache(query) {
            debug!("Cache hit for {}", query);
            return Ok(payload);
        }

        match self.source.fetch_live(&query.fsyms, &query.tsyms).await {
            Ok(payload) => {
                self.save_to_cache(query, payload.clone());
                if persist_fetch {
                    if let Err(e) = self.store.upsert(query, &payload) {
                        warn!("Failed to persist fallback payload for {}: {}", query, e);
                    }
                }
                Ok(payload)
            }
            Err(fetch_error) => {
                debug!(
                    "Live fetch failed for {}: {}; trying persisted fallback",
                    query, fetch_error
                );
                match self.store.find_by_query(query) {
                    Ok(Some(payload)) => Ok(Bytes::from(payload)),
                    Ok(None) => Err(FeedError::Unavailable),
                    Err(e) => {
                        warn!("Fallback lookup failed for {}: {}", query, e);
                        Err(FeedError::Unavailable)
                    }
                }
            }
        }
    }

    /// One-shot resolution for the request path
    pub async fn get_prices(&self, query: &PriceQuery) -> Result<Bytes, FeedError> {
        self.resolve(query, false).await
    }

    /// Per-subscription loop: resolve and deliver until the mailbox closes
    /// or data becomes permanently unavailable.
    ///
    /// Run as its own task; the mailbox is the only cancellation signal.
    pub async fn broadcast(&self, mailbox: Mailbox, query: PriceQuery) -> BroadcastEnd {
        loop {
            let payload = match self.resolve(&query, true).await {
                Ok(payload) => payload,
                Err(_) => {
                    info!("Broadcast for {} ended: resource not available", query);
                    return BroadcastEnd::Unavailable;
                }
            };

            if let Delivery::RecipientClosed = mailbox.send(payload).await {
                debug!("Broadcast for {} ended: subscriber gone", query);
                return BroadcastEnd::SubscriberGone;
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::{self, CloseReason};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        payload: Option<Bytes>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn serving(payload: &'static [u8]) -> Arc<Self> {
            Arc::new(Self {
                payload: Some(Bytes::from_static(payload)),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                payload: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for StubSource {
        async fn fetch_live(
            &self,
            _fsyms: &[String],
            _tsyms: &[String],
        ) -> Result<Bytes, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.payload {
                Some(payload) => Ok(payload.clone()),
                None => Err(FeedError::network("connection refused")),
            }
        }
    }

    fn query(fsyms: &[&str], tsyms: &[&str]) -> PriceQuery {
        PriceQuery::new(
            fsyms.iter().map(|s| s.to_string()).collect(),
            tsyms.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn manager(source: Arc<StubSource>) -> (PriceManager, Arc<PriceStore>) {
        let store = Arc::new(PriceStore::new_in_memory().unwrap());
        let manager = PriceManager::new(source, Arc::clone(&store));
        (manager, store)
    }

    #[tokio::test]
    async fn cold_cache_fetches_once_and_returns_payload() {
        let source = StubSource::serving(br#"{"RAW":{"BTC":{}}}"#);
        let (manager, _store) = manager(Arc::clone(&source));
        let q = query(&["BTC"], &["USD"]);

        let payload = manager.get_prices(&q).await.unwrap();

        assert_eq!(payload.as_ref(), br#"{"RAW":{"BTC":{}}}"#);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn repeated_resolution_within_ttl_hits_cache() {
        let source = StubSource::serving(b"payload");
        let (manager, _store) = manager(Arc::clone(&source));
        let q = query(&["BTC"], &["USD"]);

        for _ in 0..3 {
            manager.get_prices(&q).await.unwrap();
        }

        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn fallback_payload_is_served_unchanged() {
        let source = StubSource::failing();
        let (manager, store) = manager(Arc::clone(&source));
        let q = query(&["BTC"], &["USD"]);

        store.upsert(&q, b"stored-payload").unwrap();

        let payload = manager.get_prices(&q).await.unwrap();
        assert_eq!(payload.as_ref(), b"stored-payload");
    }

    #[tokio::test]
    async fn fallback_does_not_refresh_the_cache() {
        let source = StubSource::failing();
        let (manager, store) = manager(Arc::clone(&source));
        let q = query(&["BTC"], &["USD"]);

        store.upsert(&q, b"stored-payload").unwrap();

        manager.get_prices(&q).await.unwrap();
        manager.get_prices(&q).await.unwrap();

        // A cached fallback would have absorbed the second attempt.
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn unavailable_when_fetch_and_fallback_fail() {
        let source = StubSource::failing();
        let (manager, store) = manager(Arc::clone(&source));
        let q = query(&["BTC"], &["USD"]);

        let err = manager.get_prices(&q).await.unwrap_err();

        assert!(matches!(err, FeedError::Unavailable));
        // No partial state was written along the way.
        assert!(store.find_by_query(&q).unwrap().is_none());
        assert!(manager.load_from_cache(&q).is_none());
    }

    #[tokio::test]
    async fn one_shot_does_not_persist_fallback() {
        let source = StubSource::serving(b"fresh");
        let (manager, store) = manager(Arc::clone(&source));
        let q = query(&["BTC"], &["USD"]);

        manager.get_prices(&q).await.unwrap();

        assert!(store.find_by_query(&q).unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_entry_not_refreshed_by_other_write() {
        let source = StubSource::serving(b"payload");
        let store = Arc::new(PriceStore::new_in_memory().unwrap());
        let manager = PriceManager::with_config(
            Arc::clone(&source) as Arc<dyn QuoteSource>,
            store,
            PriceManagerConfig {
                cache_ttl: Duration::from_millis(50),
                poll_interval: Duration::from_millis(10),
            },
        );
        let btc = query(&["BTC"], &["USD"]);
        let eth = query(&["ETH"], &["USD"]);

        manager.get_prices(&btc).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // This write refreshes only the ETH entry.
        manager.get_prices(&eth).await.unwrap();
        assert_eq!(source.calls(), 2);

        // BTC stayed stale and needs a new fetch; ETH is still fresh.
        manager.get_prices(&btc).await.unwrap();
        assert_eq!(source.calls(), 3);
        manager.get_prices(&eth).await.unwrap();
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn broadcast_delivers_and_persists_fresh_fetches() {
        let source = StubSource::serving(b"tick");
        let store = Arc::new(PriceStore::new_in_memory().unwrap());
        let manager = Arc::new(PriceManager::with_config(
            Arc::clone(&source) as Arc<dyn QuoteSource>,
            Arc::clone(&store),
            PriceManagerConfig {
                cache_ttl: Duration::from_secs(60),
                poll_interval: Duration::from_millis(10),
            },
        ));
        let q = query(&["BTC"], &["USD"]);
        let (mailbox, mut rx) = mailbox::channel(8);

        let task = {
            let manager = Arc::clone(&manager);
            let mailbox = mailbox.clone();
            let q = q.clone();
            tokio::spawn(async move { manager.broadcast(mailbox, q).await })
        };

        assert_eq!(rx.recv().await.as_deref(), Some(b"tick".as_ref()));

        mailbox.close(CloseReason::Normal);
        let end = task.await.unwrap();

        assert_eq!(end, BroadcastEnd::SubscriberGone);
        // The broadcast path keeps the fallback store warm.
        assert_eq!(store.find_by_query(&q).unwrap().as_deref(), Some(b"tick".as_ref()));
    }

    #[tokio::test]
    async fn broadcast_stops_within_one_attempt_after_close() {
        let source = StubSource::serving(b"tick");
        let store = Arc::new(PriceStore::new_in_memory().unwrap());
        let manager = Arc::new(PriceManager::with_config(
            Arc::clone(&source) as Arc<dyn QuoteSource>,
            store,
            PriceManagerConfig {
                cache_ttl: Duration::from_secs(60),
                poll_interval: Duration::from_millis(10),
            },
        ));
        let q = query(&["BTC"], &["USD"]);
        let (mailbox, mut rx) = mailbox::channel(8);

        mailbox.close(CloseReason::Normal);

        let end = manager.broadcast(mailbox, q).await;

        assert_eq!(end, BroadcastEnd::SubscriberGone);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn broadcast_ends_unavailable_when_chain_runs_dry() {
        let source = StubSource::failing();
        let store = Arc::new(PriceStore::new_in_memory().unwrap());
        let manager =
            PriceManager::new(Arc::clone(&source) as Arc<dyn QuoteSource>, store);
        let q = query(&["BTC"], &["USD"]);
        let (mailbox, mut rx) = mailbox::channel(8);

        let end = manager.broadcast(mailbox, q).await;

        assert_eq!(end, BroadcastEnd::Unavailable);
        // Nothing was delivered before the terminal state.
        assert_eq!(rx.try_recv(), None);
    }
}
