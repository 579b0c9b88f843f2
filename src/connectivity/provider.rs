//! Connectivity product sources.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::connectivity::parser::{connectivity_file_name, parse_connectivity};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ConnectivitySet, QuantizedTime};

/// Source of connectivity products, keyed by quantized timestamp.
#[async_trait]
pub trait ConnectivityProvider: Send + Sync {
    async fn fetch(&self, time: QuantizedTime) -> AnalysisResult<ConnectivitySet>;
}

/// In-memory provider, used in tests and for pre-staged data.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    sets: HashMap<QuantizedTime, ConnectivitySet>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set: ConnectivitySet) {
        self.sets.insert(set.time, set);
    }
}

#[async_trait]
impl ConnectivityProvider for MemoryProvider {
    async fn fetch(&self, time: QuantizedTime) -> AnalysisResult<ConnectivitySet> {
        self.sets
            .get(&time)
            .cloned()
            .ok_or_else(|| AnalysisError::lookup(time.to_string(), "no staged product", false))
    }
}

/// Provider reading products from a local directory of ascii files.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ConnectivityProvider for DirectoryProvider {
    async fn fetch(&self, time: QuantizedTime) -> AnalysisResult<ConnectivitySet> {
        let path = self.root.join(connectivity_file_name(time));
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => parse_connectivity(&text, time),
            // A missing product will not appear on retry; other io errors
            // might be transient.
            Err(err) if err.kind() == ErrorKind::NotFound => Err(AnalysisError::lookup(
                time.to_string(),
                format!("product not found at {}", path.display()),
                false,
            )),
            Err(err) => Err(AnalysisError::lookup(
                time.to_string(),
                format!("read failed: {}", err),
                true,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectivityPoint, WindCategory};
    use std::io::Write;

    fn time() -> QuantizedTime {
        QuantizedTime::from_ymd_hour(2021, 5, 22, 12).unwrap()
    }

    #[tokio::test]
    async fn test_memory_provider_round_trip() {
        let mut provider = MemoryProvider::new();
        provider.insert(ConnectivitySet::new(
            time(),
            vec![ConnectivityPoint {
                category: WindCategory::Measured,
                density: 80.0,
                lat: 4.0,
                lon: 105.0,
            }],
        ));

        let set = provider.fetch(time()).await.unwrap();
        assert_eq!(set.points.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_provider_miss_is_not_retryable() {
        let provider = MemoryProvider::new();
        let err = provider.fetch(time()).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_directory_provider_reads_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(connectivity_file_name(time()));
        let mut file = std::fs::File::create(&path).unwrap();
        for i in 0..20 {
            writeln!(file, "# header {}", i).unwrap();
        }
        writeln!(file, "M 3 80.0 0 4.0 105.0").unwrap();

        let provider = DirectoryProvider::new(dir.path());
        let set = provider.fetch(time()).await.unwrap();
        assert_eq!(set.points.len(), 1);
        assert_eq!(set.points[0].lon, 105.0);
    }

    #[tokio::test]
    async fn test_directory_provider_missing_file_not_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirectoryProvider::new(dir.path());
        let err = provider.fetch(time()).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
