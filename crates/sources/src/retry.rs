use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use travelmind_core::{CategorySet, Place, RouterError};

use crate::{DetailSource, PlaceSource};

/// Bounded exponential backoff for transient collaborator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1_u64 << (attempt - 1).min(16);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RouterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RouterError>>,
    {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let delay = self.delay_for(attempt);
                warn!(
                    operation,
                    attempt,
                    max_retries = self.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "retrying collaborator call"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            match call().await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    warn!(operation, attempt = attempt + 1, error = %err, "collaborator call failed");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Wraps a collaborator so every call goes through a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Retrying<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> Retrying<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl<S: PlaceSource> PlaceSource for Retrying<S> {
    async fn search(
        &self,
        city: &str,
        categories: Option<&CategorySet>,
    ) -> Result<Vec<Place>, RouterError> {
        self.policy
            .run("place_search", || self.inner.search(city, categories))
            .await
    }
}

impl<S: DetailSource> DetailSource for Retrying<S> {
    async fn describe(&self, place_id: &str) -> Result<String, RouterError> {
        self.policy
            .run("place_describe", || self.inner.describe(place_id))
            .await
    }
}
