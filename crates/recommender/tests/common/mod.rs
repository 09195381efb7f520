//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use resonance_recommender::{
    InMemoryInteractionRepository, InteractionRecord, InteractionRepository, RecommenderConfig,
    RepositoryError,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Config with zero backoff and a fixed seed
pub fn test_config() -> RecommenderConfig {
    RecommenderConfig {
        retry_backoff_seconds: 0,
        random_seed: Some(42),
        ..RecommenderConfig::default()
    }
}

pub fn catalog(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("s{}", i)).collect()
}

/// `count` interactions spread over `s1..=s{items}`, one user per event pair
pub fn interactions(count: usize, items: usize) -> Vec<InteractionRecord> {
    (0..count)
        .map(|i| InteractionRecord::new(format!("user_{}", i / 2), format!("s{}", i % items + 1)))
        .collect()
}

/// Repository wrapper that can be switched into failing mode, counts fetches
/// and records whether two fetches ever overlapped
pub struct TestRepository {
    pub inner: InMemoryInteractionRepository,
    failing: AtomicBool,
    delay: Duration,
    calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl TestRepository {
    pub fn new(catalog: Vec<String>, interactions: Vec<InteractionRecord>) -> Self {
        Self {
            inner: InMemoryInteractionRepository::new(catalog, interactions),
            failing: AtomicBool::new(false),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InteractionRepository for TestRepository {
    async fn fetch_interactions(&self) -> Result<Vec<InteractionRecord>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connectivity("connection refused".into()));
        }
        self.inner.fetch_interactions().await
    }

    async fn fetch_catalog_ids(&self) -> Result<Vec<String>, RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connectivity("connection refused".into()));
        }
        self.inner.fetch_catalog_ids().await
    }
}
