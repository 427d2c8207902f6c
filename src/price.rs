//! USD price cache
//!
//! Serves a USD price per token symbol with boundedly-stale freshness.
//! Concurrent requests for the same symbol coalesce into one upstream
//! fetch; a failed fetch falls back to a persisted snapshot (if younger
//! than an hour) or a hardcoded default, so callers always get *some*
//! price. The fallback value is cached and persisted exactly like a live
//! one, advancing the cache's freshness clock.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use eyre::{bail, eyre, Result};
use futures::future::{Future, FutureExt, Shared};
use serde::{Deserialize, Serialize};

use crate::config::PriceConfig;

/// Tokens the unwrap widget deals in. Both track the same underlying
/// asset, so they share one upstream price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSymbol {
    Wtac,
    Tac,
}

impl TokenSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSymbol::Wtac => "WTAC",
            TokenSymbol::Tac => "TAC",
        }
    }
}

impl std::fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved price and when it was fetched. Replaced wholesale on every
/// refresh, never mutated in place.
#[derive(Debug, Clone, Copy)]
pub struct PriceEntry {
    pub symbol: TokenSymbol,
    pub price: f64,
    pub fetched_at_ms: i64,
}

/// Cache entry age report, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct PriceStats {
    pub price: f64,
    pub age_ms: i64,
    pub is_stale: bool,
}

/// Persisted `{price, timestamp}` snapshot used when the live source
/// fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredPrice {
    pub price: f64,
    pub timestamp: i64,
}

/// Upstream price feed.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_usd_price(&self, asset_id: &str) -> Result<f64>;
}

/// Durable store for the fallback snapshot. Write failures are the
/// store's problem; callers never see them.
pub trait FallbackStore: Send + Sync {
    fn load(&self) -> Option<StoredPrice>;
    fn store(&self, snapshot: StoredPrice);
}

/// Injectable time source so cache-freshness tests need no real timers.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// CoinGecko simple-price source.
pub struct CoinGeckoSource {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct AssetQuote {
    usd: f64,
}

impl CoinGeckoSource {
    pub fn new(config: &PriceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent("WTAC-Unwrap-App/1.0")
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch_usd_price(&self, asset_id: &str) -> Result<f64> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("price API failed: {}", response.status());
        }

        let quotes: HashMap<String, AssetQuote> = response.json().await?;
        let quote = quotes
            .get(asset_id)
            .ok_or_else(|| eyre!("asset {} missing from price response", asset_id))?;

        if !quote.usd.is_finite() || quote.usd <= 0.0 {
            bail!("invalid price data: {}", quote.usd);
        }

        Ok(quote.usd)
    }
}

/// JSON-file fallback store (the browser localStorage analog).
pub struct FileFallbackStore {
    path: PathBuf,
}

impl FileFallbackStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FallbackStore for FileFallbackStore {
    fn load(&self) -> Option<StoredPrice> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Corrupt fallback price snapshot");
                None
            }
        }
    }

    fn store(&self, snapshot: StoredPrice) {
        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize fallback price");
                return;
            }
        };
        if let Err(err) = fs::write(&self.path, raw) {
            tracing::warn!(path = %self.path.display(), error = %err, "Failed to persist fallback price");
        }
    }
}

type SharedFetch = Shared<Pin<Box<dyn Future<Output = f64> + Send>>>;

#[derive(Default)]
struct Inner {
    cache: HashMap<TokenSymbol, PriceEntry>,
    pending: HashMap<TokenSymbol, SharedFetch>,
}

/// TTL price cache with single-flight request coalescing.
///
/// At most one upstream fetch is outstanding per symbol; callers that
/// arrive while one is in flight await the same shared future. The cache
/// entry is replaced atomically when the fetch completes.
pub struct PriceCache {
    inner: Arc<Mutex<Inner>>,
    source: Arc<dyn PriceSource>,
    store: Arc<dyn FallbackStore>,
    clock: Arc<dyn Clock>,
    config: PriceConfig,
}

impl PriceCache {
    pub fn new(
        source: Arc<dyn PriceSource>,
        store: Arc<dyn FallbackStore>,
        clock: Arc<dyn Clock>,
        config: PriceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            source,
            store,
            clock,
            config,
        }
    }

    /// Production wiring: CoinGecko source, file-backed fallback store,
    /// wall clock.
    pub fn with_defaults(config: PriceConfig) -> Result<Self> {
        let source = Arc::new(CoinGeckoSource::new(&config)?);
        let store = Arc::new(FileFallbackStore::new(config.fallback_path.clone()));
        Ok(Self::new(source, store, Arc::new(SystemClock), config))
    }

    /// Current USD price for `symbol`. Fresh cache hits return without
    /// I/O; otherwise joins or starts the single in-flight fetch. Never
    /// fails: fetch errors resolve through the fallback chain.
    pub async fn get_price(&self, symbol: TokenSymbol) -> f64 {
        let now = self.clock.now_ms();
        let fetch = {
            let mut inner = self.inner.lock().unwrap();

            if let Some(entry) = inner.cache.get(&symbol) {
                if now - entry.fetched_at_ms <= self.cache_duration_ms() {
                    return entry.price;
                }
            }

            if let Some(pending) = inner.pending.get(&symbol) {
                pending.clone()
            } else {
                let fut = resolve_price(
                    symbol,
                    Arc::clone(&self.inner),
                    Arc::clone(&self.source),
                    Arc::clone(&self.store),
                    Arc::clone(&self.clock),
                    self.config.clone(),
                );
                let shared: SharedFetch = fut.boxed().shared();
                inner.pending.insert(symbol, shared.clone());
                shared
            }
        };

        fetch.await
    }

    /// Discard the cache entry and any in-flight fetch record for
    /// `symbol`, then fetch anew.
    pub async fn refresh_price(&self, symbol: TokenSymbol) -> f64 {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.cache.remove(&symbol);
            inner.pending.remove(&symbol);
        }
        self.get_price(symbol).await
    }

    /// Pure cache read; returns stale entries too and never triggers I/O.
    pub fn get_cached_price_sync(&self, symbol: TokenSymbol) -> Option<f64> {
        let inner = self.inner.lock().unwrap();
        inner.cache.get(&symbol).map(|entry| entry.price)
    }

    /// Drop all cached entries and in-flight records.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.cache.clear();
        inner.pending.clear();
    }

    /// Age report for every cached symbol.
    pub fn cache_stats(&self) -> HashMap<TokenSymbol, PriceStats> {
        let now = self.clock.now_ms();
        let inner = self.inner.lock().unwrap();
        inner
            .cache
            .iter()
            .map(|(symbol, entry)| {
                let age_ms = now - entry.fetched_at_ms;
                (
                    *symbol,
                    PriceStats {
                        price: entry.price,
                        age_ms,
                        is_stale: age_ms > self.cache_duration_ms(),
                    },
                )
            })
            .collect()
    }

    fn cache_duration_ms(&self) -> i64 {
        self.config.cache_duration.as_millis() as i64
    }
}

/// The single in-flight fetch for one symbol. Resolves to a price no
/// matter what happened upstream, then commits the cache entry and clears
/// the pending record under one lock.
async fn resolve_price(
    symbol: TokenSymbol,
    inner: Arc<Mutex<Inner>>,
    source: Arc<dyn PriceSource>,
    store: Arc<dyn FallbackStore>,
    clock: Arc<dyn Clock>,
    config: PriceConfig,
) -> f64 {
    let previous = {
        let inner = inner.lock().unwrap();
        inner.cache.get(&symbol).map(|entry| entry.price)
    };

    let fetched =
        tokio::time::timeout(config.fetch_timeout, source.fetch_usd_price(&config.asset_id)).await;

    let price = match fetched {
        Ok(Ok(price)) => {
            if let Some(prev) = previous {
                if prev > 0.0 && ((price - prev) / prev).abs() > 0.5 {
                    tracing::warn!(
                        symbol = %symbol,
                        previous = prev,
                        new = price,
                        "Large price change detected"
                    );
                }
            }
            price
        }
        Ok(Err(err)) => {
            tracing::warn!(symbol = %symbol, error = %err, "Price fetch failed, using fallback");
            fallback_price(store.as_ref(), clock.as_ref(), &config)
        }
        Err(_) => {
            tracing::warn!(
                symbol = %symbol,
                timeout = ?config.fetch_timeout,
                "Price fetch timed out, using fallback"
            );
            fallback_price(store.as_ref(), clock.as_ref(), &config)
        }
    };

    store.store(StoredPrice {
        price,
        timestamp: clock.now_ms(),
    });

    let mut inner = inner.lock().unwrap();
    inner.cache.insert(
        symbol,
        PriceEntry {
            symbol,
            price,
            fetched_at_ms: clock.now_ms(),
        },
    );
    inner.pending.remove(&symbol);

    price
}

/// Persisted snapshot if younger than the max age, else the hardcoded
/// default.
fn fallback_price(store: &dyn FallbackStore, clock: &dyn Clock, config: &PriceConfig) -> f64 {
    if let Some(stored) = store.load() {
        if clock.now_ms() - stored.timestamp < config.fallback_max_age.as_millis() as i64 {
            return stored.price;
        }
    }
    config.default_price
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockSource {
        price: Mutex<Result<f64, String>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl MockSource {
        fn returning(price: f64) -> Self {
            Self {
                price: Mutex::new(Ok(price)),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn failing() -> Self {
            Self {
                price: Mutex::new(Err("upstream down".to_string())),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn set_price(&self, price: f64) {
            *self.price.lock().unwrap() = Ok(price);
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PriceSource for MockSource {
        async fn fetch_usd_price(&self, _asset_id: &str) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.price
                .lock()
                .unwrap()
                .clone()
                .map_err(|e| eyre!("{e}"))
        }
    }

    #[derive(Default)]
    struct MemStore {
        snapshot: Mutex<Option<StoredPrice>>,
    }

    impl FallbackStore for MemStore {
        fn load(&self) -> Option<StoredPrice> {
            *self.snapshot.lock().unwrap()
        }

        fn store(&self, snapshot: StoredPrice) {
            *self.snapshot.lock().unwrap() = Some(snapshot);
        }
    }

    struct ManualClock {
        now_ms: AtomicI64,
    }

    impl ManualClock {
        fn at(now_ms: i64) -> Self {
            Self {
                now_ms: AtomicI64::new(now_ms),
            }
        }

        fn advance(&self, ms: i64) {
            self.now_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.now_ms.load(Ordering::SeqCst)
        }
    }

    fn cache_with(
        source: Arc<MockSource>,
        store: Arc<MemStore>,
        clock: Arc<ManualClock>,
    ) -> PriceCache {
        PriceCache::new(source, store, clock, PriceConfig::default())
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_io() {
        let source = Arc::new(MockSource::returning(0.002));
        let cache = cache_with(
            Arc::clone(&source),
            Arc::new(MemStore::default()),
            Arc::new(ManualClock::at(1_000)),
        );

        assert_eq!(cache.get_price(TokenSymbol::Tac).await, 0.002);
        assert_eq!(cache.get_price(TokenSymbol::Tac).await, 0.002);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_calls_coalesce_into_one_fetch() {
        let source =
            Arc::new(MockSource::returning(0.002).with_delay(Duration::from_millis(50)));
        let cache = cache_with(
            Arc::clone(&source),
            Arc::new(MemStore::default()),
            Arc::new(ManualClock::at(1_000)),
        );

        let (a, b) = tokio::join!(
            cache.get_price(TokenSymbol::Tac),
            cache.get_price(TokenSymbol::Tac)
        );
        assert_eq!(a, 0.002);
        assert_eq!(b, 0.002);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_triggers_refetch() {
        let source = Arc::new(MockSource::returning(0.002));
        let clock = Arc::new(ManualClock::at(1_000));
        let cache = cache_with(
            Arc::clone(&source),
            Arc::new(MemStore::default()),
            Arc::clone(&clock),
        );

        cache.get_price(TokenSymbol::Tac).await;
        clock.advance(5 * 60 * 1000 + 1);
        cache.get_price(TokenSymbol::Tac).await;
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_without_fallback_returns_default() {
        let store = Arc::new(MemStore::default());
        let cache = cache_with(
            Arc::new(MockSource::failing()),
            Arc::clone(&store),
            Arc::new(ManualClock::at(1_000)),
        );

        let price = cache.get_price(TokenSymbol::Tac).await;
        assert_eq!(price, 0.0012);

        // the fallback resolution is persisted and cached like a live one
        assert_eq!(store.load().unwrap().price, 0.0012);
        assert_eq!(cache.get_cached_price_sync(TokenSymbol::Tac), Some(0.0012));
    }

    #[tokio::test]
    async fn test_failure_uses_recent_fallback() {
        let store = Arc::new(MemStore::default());
        store.store(StoredPrice {
            price: 0.005,
            timestamp: 1_000,
        });
        let clock = Arc::new(ManualClock::at(1_000 + 10 * 60 * 1000));
        let cache = cache_with(Arc::new(MockSource::failing()), store, clock);

        assert_eq!(cache.get_price(TokenSymbol::Tac).await, 0.005);
    }

    #[tokio::test]
    async fn test_failure_ignores_expired_fallback() {
        let store = Arc::new(MemStore::default());
        store.store(StoredPrice {
            price: 0.005,
            timestamp: 1_000,
        });
        let clock = Arc::new(ManualClock::at(1_000 + 61 * 60 * 1000));
        let cache = cache_with(Arc::new(MockSource::failing()), store, clock);

        assert_eq!(cache.get_price(TokenSymbol::Tac).await, 0.0012);
    }

    #[tokio::test]
    async fn test_refresh_discards_cached_value() {
        let source = Arc::new(MockSource::returning(1.0));
        let cache = cache_with(
            Arc::clone(&source),
            Arc::new(MemStore::default()),
            Arc::new(ManualClock::at(1_000)),
        );

        assert_eq!(cache.get_price(TokenSymbol::Tac).await, 1.0);
        source.set_price(2.0);
        assert_eq!(cache.get_price(TokenSymbol::Tac).await, 1.0);
        assert_eq!(cache.refresh_price(TokenSymbol::Tac).await, 2.0);
    }

    #[test]
    fn test_cached_sync_read_never_fetches() {
        tokio_test::block_on(async {
            let source = Arc::new(MockSource::returning(1.0));
            let cache = cache_with(
                Arc::clone(&source),
                Arc::new(MemStore::default()),
                Arc::new(ManualClock::at(1_000)),
            );

            assert_eq!(cache.get_cached_price_sync(TokenSymbol::Tac), None);
            assert_eq!(source.call_count(), 0);
        });
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let source = Arc::new(MockSource::returning(1.0));
        let clock = Arc::new(ManualClock::at(1_000));
        let cache = cache_with(
            Arc::clone(&source),
            Arc::new(MemStore::default()),
            Arc::clone(&clock),
        );

        cache.get_price(TokenSymbol::Wtac).await;
        clock.advance(60_000);

        let stats = cache.cache_stats();
        let stat = stats.get(&TokenSymbol::Wtac).unwrap();
        assert_eq!(stat.price, 1.0);
        assert_eq!(stat.age_ms, 60_000);
        assert!(!stat.is_stale);

        cache.clear();
        assert!(cache.cache_stats().is_empty());
        assert_eq!(cache.get_cached_price_sync(TokenSymbol::Wtac), None);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFallbackStore::new(dir.path().join("price.json"));

        assert!(store.load().is_none());
        store.store(StoredPrice {
            price: 0.0034,
            timestamp: 42,
        });
        let loaded = store.load().unwrap();
        assert_eq!(loaded.price, 0.0034);
        assert_eq!(loaded.timestamp, 42);
    }
}
