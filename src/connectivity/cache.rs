//! Memoized connectivity lookups.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::connectivity::provider::ConnectivityProvider;
use crate::error::AnalysisResult;
use crate::models::{ConnectivitySet, QuantizedTime};

/// Caches connectivity sets per quantized timestamp for the lifetime of a
/// run, with retry on transient failures.
///
/// In permissive mode a lookup that keeps failing degrades to an empty
/// set, which downstream matching reports as "no data"; in strict mode it
/// aborts the run.
pub struct ConnectivityCache<P> {
    provider: P,
    entries: RwLock<HashMap<QuantizedTime, Arc<ConnectivitySet>>>,
    degraded: RwLock<Vec<(QuantizedTime, String)>>,
    strict: bool,
    max_retries: u32,
}

impl<P: ConnectivityProvider> ConnectivityCache<P> {
    pub fn new(provider: P, strict: bool, max_retries: u32) -> Self {
        Self {
            provider,
            entries: RwLock::new(HashMap::new()),
            degraded: RwLock::new(Vec::new()),
            strict,
            max_retries,
        }
    }

    /// Connectivity set for a quantized timestamp, fetching on first use.
    pub async fn get(&self, time: QuantizedTime) -> AnalysisResult<Arc<ConnectivitySet>> {
        if let Some(set) = self.entries.read().get(&time) {
            return Ok(Arc::clone(set));
        }

        let set = match self.fetch_with_retry(time).await {
            Ok(set) => Arc::new(set),
            Err(err) if !self.strict => {
                warn!("connectivity lookup for {} failed ({}), continuing without data", time, err);
                self.degraded.write().push((time, err.to_string()));
                Arc::new(ConnectivitySet::empty(time))
            }
            Err(err) => return Err(err),
        };

        // Concurrent fetches of the same timestamp keep the first insert.
        let mut entries = self.entries.write();
        let entry = entries.entry(time).or_insert_with(|| Arc::clone(&set));
        Ok(Arc::clone(entry))
    }

    async fn fetch_with_retry(&self, time: QuantizedTime) -> AnalysisResult<ConnectivitySet> {
        let mut attempt = 0;
        loop {
            match self.provider.fetch(time).await {
                Ok(set) => {
                    debug!("fetched connectivity for {} ({} footpoints)", time, set.points.len());
                    return Ok(set);
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!("retrying connectivity lookup for {} (attempt {})", time, attempt);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Timestamps whose lookup failed and was replaced by an empty set,
    /// with the failure text.
    pub fn degraded(&self) -> Vec<(QuantizedTime, String)> {
        self.degraded.read().clone()
    }

    /// Number of memoized timestamps.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::models::{ConnectivityPoint, WindCategory};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn time() -> QuantizedTime {
        QuantizedTime::from_ymd_hour(2021, 5, 22, 18).unwrap()
    }

    /// Provider that fails transiently a fixed number of times, counting
    /// every call.
    struct FlakyProvider {
        calls: AtomicU32,
        failures: u32,
    }

    impl FlakyProvider {
        fn new(failures: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
            }
        }
    }

    #[async_trait]
    impl ConnectivityProvider for FlakyProvider {
        async fn fetch(&self, time: QuantizedTime) -> AnalysisResult<ConnectivitySet> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(AnalysisError::lookup(time.to_string(), "flaky", true));
            }
            Ok(ConnectivitySet::new(
                time,
                vec![ConnectivityPoint {
                    category: WindCategory::Measured,
                    density: 1.0,
                    lat: 0.0,
                    lon: 0.0,
                }],
            ))
        }
    }

    struct AlwaysFailing;

    #[async_trait]
    impl ConnectivityProvider for AlwaysFailing {
        async fn fetch(&self, time: QuantizedTime) -> AnalysisResult<ConnectivitySet> {
            Err(AnalysisError::lookup(time.to_string(), "down", true))
        }
    }

    #[tokio::test]
    async fn test_second_get_hits_the_cache() {
        let cache = ConnectivityCache::new(FlakyProvider::new(0), true, 0);
        cache.get(time()).await.unwrap();
        cache.get(time()).await.unwrap();
        assert_eq!(cache.provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let cache = ConnectivityCache::new(FlakyProvider::new(2), true, 3);
        let set = cache.get(time()).await.unwrap();
        assert_eq!(set.points.len(), 1);
        assert_eq!(cache.provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permissive_mode_degrades_to_empty_set() {
        let cache = ConnectivityCache::new(AlwaysFailing, false, 1);
        let set = cache.get(time()).await.unwrap();
        assert!(set.is_empty());
        // The degraded result is memoized and recorded.
        assert_eq!(cache.len(), 1);
        let degraded = cache.degraded();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].0, time());
    }

    #[tokio::test]
    async fn test_strict_mode_propagates_the_failure() {
        let cache = ConnectivityCache::new(AlwaysFailing, true, 1);
        assert!(cache.get(time()).await.is_err());
        assert!(cache.is_empty());
    }
}
