//! Per-provider rate limiting: a concurrency ceiling plus a requests-per-minute quota

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::utils::error::{GatewayError, Result};

/// Held while a provider call is in flight
#[derive(Debug)]
pub struct Permit {
    _slot: OwnedSemaphorePermit,
}

/// Rate-limit permits for one provider, shared by every worker
pub struct ProviderLimiter {
    provider: &'static str,
    max_concurrent: usize,
    slots: Arc<Semaphore>,
    rpm: Option<DefaultDirectRateLimiter>,
}

impl std::fmt::Debug for ProviderLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderLimiter")
            .field("provider", &self.provider)
            .field("max_concurrent", &self.max_concurrent)
            .field("available", &self.available())
            .finish()
    }
}

impl ProviderLimiter {
    /// `rpm` of 0 disables the per-minute quota
    pub fn new(provider: &'static str, max_concurrent: u32, rpm: u32) -> Self {
        let max_concurrent = max_concurrent.max(1) as usize;
        Self {
            provider,
            max_concurrent,
            slots: Arc::new(Semaphore::new(max_concurrent)),
            rpm: NonZeroU32::new(rpm).map(|rpm| RateLimiter::direct(Quota::per_minute(rpm))),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Free concurrency slots
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait up to `wait` for a concurrency slot, held for the whole request
    pub async fn acquire_slot(&self, wait: Duration) -> Result<Permit> {
        match tokio::time::timeout(wait, Arc::clone(&self.slots).acquire_owned()).await {
            Ok(Ok(slot)) => Ok(Permit { _slot: slot }),
            Ok(Err(_)) => Err(GatewayError::internal(format!(
                "Rate limiter for {} is closed",
                self.provider
            ))),
            Err(_) => {
                debug!(provider = self.provider, "No concurrency slot within {:?}", wait);
                Err(GatewayError::RateLimited(format!(
                    "{} is at its concurrency limit of {}",
                    self.provider, self.max_concurrent
                )))
            }
        }
    }

    /// Wait up to `wait` for one unit of the per-minute quota. Every provider
    /// call, retries included, draws one unit.
    pub async fn await_quota(&self, wait: Duration) -> Result<()> {
        let Some(rpm) = &self.rpm else {
            return Ok(());
        };
        if tokio::time::timeout(wait, rpm.until_ready()).await.is_err() {
            debug!(provider = self.provider, "Requests-per-minute quota exhausted");
            return Err(GatewayError::RateLimited(format!(
                "{} requests-per-minute quota exhausted",
                self.provider
            )));
        }
        Ok(())
    }
}
