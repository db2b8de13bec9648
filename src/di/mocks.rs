//! Mock implementations of service traits for testing

use super::traits::ArtifactFetcher;
use crate::core::{RudderError, RudderResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory fetcher serving canned responses by URL
///
/// Unknown URLs fail with NotFound, like a 404.
///
/// # Example
///
/// ```
/// use rudder::di::mocks::MockFetcher;
/// use rudder::di::ArtifactFetcher;
///
/// # async fn example() {
/// let fetcher = MockFetcher::new();
/// fetcher.add("https://charts.example.com/index.yaml", b"apiVersion: v1\n".to_vec());
/// let body = fetcher.fetch("https://charts.example.com/index.yaml").await.unwrap();
/// assert_eq!(body, b"apiVersion: v1\n");
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, url: impl Into<String>, body: Vec<u8>) {
        self.responses.lock().unwrap().insert(url.into(), body);
    }

    pub fn remove(&self, url: &str) {
        self.responses.lock().unwrap().remove(url);
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl ArtifactFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> RudderResult<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| RudderError::NotFound(url.to_string()))
    }
}
