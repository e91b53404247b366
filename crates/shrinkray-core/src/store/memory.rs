//! In-process object store.
//!
//! Holds a source and a destination bucket as ordered maps. Failures can be
//! scripted per key and every call is recorded, which makes it the gateway of
//! choice for exercising the coordinator without network access.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::ObjectStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{ImageBytes, ImageKey};

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List(String),
    Read(ImageKey),
    Write(ImageKey),
}

#[derive(Default)]
struct Buckets {
    source: BTreeMap<ImageKey, ImageBytes>,
    destination: BTreeMap<ImageKey, ImageBytes>,
}

/// Object store backed by two in-memory maps.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<Buckets>,
    list_failure: Option<StoreError>,
    read_failures: HashMap<ImageKey, StoreError>,
    write_failures: HashMap<ImageKey, StoreError>,
    latency: Option<Duration>,
    calls: Mutex<Vec<StoreCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to the source bucket.
    pub fn with_object(self, key: impl Into<ImageKey>, bytes: impl Into<ImageBytes>) -> Self {
        self.insert_source(key, bytes);
        self
    }

    /// Make `list` fail with `error`.
    pub fn fail_list(mut self, error: StoreError) -> Self {
        self.list_failure = Some(error);
        self
    }

    /// Make `read(key)` fail with `error`.
    pub fn fail_read(mut self, key: impl Into<ImageKey>, error: StoreError) -> Self {
        self.read_failures.insert(key.into(), error);
        self
    }

    /// Make `write(key)` fail with `error`. `key` is the destination key.
    pub fn fail_write(mut self, key: impl Into<ImageKey>, error: StoreError) -> Self {
        self.write_failures.insert(key.into(), error);
        self
    }

    /// Delay every read and write by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert_source(&self, key: impl Into<ImageKey>, bytes: impl Into<ImageBytes>) {
        self.lock_buckets().source.insert(key.into(), bytes.into());
    }

    /// Object written to the destination bucket under `key`, if any.
    pub fn destination_object(&self, key: &ImageKey) -> Option<ImageBytes> {
        self.lock_buckets().destination.get(key).cloned()
    }

    /// All keys present in the destination bucket, in key order.
    pub fn destination_keys(&self) -> Vec<ImageKey> {
        self.lock_buckets().destination.keys().cloned().collect()
    }

    /// Every call made so far, in the order they started.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(*c)).count()
    }

    /// Highest number of reads/writes observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock_buckets(&self) -> std::sync::MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    async fn simulate_transfer(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ImageKey>> {
        self.record(StoreCall::List(prefix.to_string()));
        if let Some(err) = &self.list_failure {
            return Err(err.clone());
        }

        // Zero-length entries stand in for directory markers.
        Ok(self
            .lock_buckets()
            .source
            .iter()
            .filter(|(key, bytes)| key.as_str().starts_with(prefix) && !bytes.is_empty())
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn read(&self, key: &ImageKey) -> StoreResult<ImageBytes> {
        self.record(StoreCall::Read(key.clone()));
        self.simulate_transfer().await;
        if let Some(err) = self.read_failures.get(key) {
            return Err(err.clone());
        }
        self.lock_buckets()
            .source
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &ImageKey, bytes: ImageBytes) -> StoreResult<()> {
        self.record(StoreCall::Write(key.clone()));
        self.simulate_transfer().await;
        if let Some(err) = self.write_failures.get(key) {
            return Err(err.clone());
        }
        self.lock_buckets().destination.insert(key.clone(), bytes);
        Ok(())
    }
}
