//! Shared application state handed to every route

use std::sync::Arc;
use std::time::Instant;

use super::clock::{Clock, SystemClock};
use super::rate_limiter::RequestRateLimiter;
use crate::auth::password::{Argon2PasswordService, PasswordService};
use crate::auth::token::TokenManager;
use crate::config::ServerConfig;
use crate::storage::memory::MemoryStorageProvider;
use crate::storage::traits::StorageProvider;

/// Explicitly constructed service handles; cloning is cheap
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<dyn StorageProvider>,
    pub tokens: Arc<TokenManager>,
    pub passwords: Arc<dyn PasswordService>,
    pub clock: Arc<dyn Clock>,
    pub rate_limiter: Arc<RequestRateLimiter>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        storage: Arc<dyn StorageProvider>,
        passwords: Arc<dyn PasswordService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(&config.jwt_secret, clock.clone()));
        let rate_limiter = Arc::new(RequestRateLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        ));

        Self {
            config: Arc::new(config),
            storage,
            tokens,
            passwords,
            clock,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// Production wiring: in-memory documents, real clock, default argon2 cost
    pub fn in_memory(config: ServerConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let storage = Arc::new(MemoryStorageProvider::with_clock(clock.clone()));
        Self::new(config, storage, Arc::new(Argon2PasswordService::new()), clock)
    }

    pub fn development_mode(&self) -> bool {
        self.config.development_mode()
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
