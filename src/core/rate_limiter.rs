//! Rate limiting module to prevent abuse of the public API

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::constants::MAX_TRACKED_CLIENTS;

/// Sliding-window request limiter keyed by client address
pub struct RequestRateLimiter {
    client_request_times: RwLock<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window_duration: Duration,
    /// Maximum number of clients to track to prevent memory exhaustion
    max_tracked_clients: usize,
}

impl RequestRateLimiter {
    pub fn new(max_requests: u32, window_duration: Duration) -> Self {
        Self {
            client_request_times: RwLock::new(HashMap::new()),
            max_requests,
            window_duration,
            max_tracked_clients: MAX_TRACKED_CLIENTS,
        }
    }

    /// Record a request from `client` and report whether it is within the limit
    pub async fn allow_request(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut times = self.client_request_times.write().await;

        // Evict the client whose last request is oldest
        if times.len() >= self.max_tracked_clients && !times.contains_key(client) {
            let oldest_client = times
                .iter()
                .min_by_key(|(_, client_times)| client_times.last().copied().unwrap_or(now))
                .map(|(key, _)| key.clone());

            if let Some(oldest) = oldest_client {
                times.remove(&oldest);
                log::debug!("Evicted oldest client from rate limiter");
            }
        }

        let client_times = times.entry(client.to_string()).or_default();
        client_times.retain(|&time| now.duration_since(time) < self.window_duration);

        if client_times.len() < self.max_requests as usize {
            client_times.push(now);
            true
        } else {
            false
        }
    }

    /// Requests recorded for `client` inside the current window
    pub async fn request_count(&self, client: &str) -> usize {
        let times = self.client_request_times.read().await;
        let now = Instant::now();
        times
            .get(client)
            .map(|client_times| {
                client_times
                    .iter()
                    .filter(|&&time| now.duration_since(time) < self.window_duration)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Drop expired entries
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut times = self.client_request_times.write().await;
        times.retain(|_, client_times| {
            client_times.retain(|&time| now.duration_since(time) < self.window_duration);
            !client_times.is_empty()
        });
    }

    pub async fn tracked_clients(&self) -> usize {
        self.client_request_times.read().await.len()
    }

    /// Start the periodic cleanup task
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                self.cleanup_old_entries().await;
            }
        });
    }
}
