//! RPC endpoint pool with randomized selection and non-repeating failover

use crate::error::{FleetError, FleetResult};

use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// One configured RPC URL and what callers have observed about it
#[derive(Debug)]
pub struct Endpoint {
    url: String,
    consecutive_failures: AtomicU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointHealth {
    Healthy,
    Degraded { consecutive_failures: u32 },
}

impl Endpoint {
    fn new(url: String) -> Self {
        Self {
            url,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn health_state(&self) -> EndpointHealth {
        match self.consecutive_failures.load(Ordering::Relaxed) {
            0 => EndpointHealth::Healthy,
            n => EndpointHealth::Degraded {
                consecutive_failures: n,
            },
        }
    }

    pub fn record_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }
}

/// Swap requested on a pool with a single endpoint
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no alternative RPC endpoint is configured")]
pub struct NoAlternative;

/// Known endpoints for the target network.
///
/// The list is fixed at construction. The pool never probes endpoints itself;
/// sessions call [`EndpointPool::swap`] after observing failures.
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<Arc<Endpoint>>,
}

impl EndpointPool {
    pub fn new(urls: &[String]) -> FleetResult<Self> {
        if urls.is_empty() {
            return Err(FleetError::Config(
                "endpoint pool needs at least one RPC URL".to_string(),
            ));
        }

        let endpoints = urls
            .iter()
            .map(|url| Arc::new(Endpoint::new(url.clone())))
            .collect();

        Ok(Self { endpoints })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Random initial endpoint, spreading concurrent accounts over providers
    pub fn pick_initial(&self) -> Arc<Endpoint> {
        self.endpoints
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| self.endpoints[0].clone())
    }

    /// Random endpoint other than `current`
    pub fn swap(&self, current: &Endpoint) -> Result<Arc<Endpoint>, NoAlternative> {
        let alternatives: Vec<&Arc<Endpoint>> = self
            .endpoints
            .iter()
            .filter(|e| e.url() != current.url())
            .collect();

        alternatives
            .choose(&mut rand::thread_rng())
            .map(|e| Arc::clone(e))
            .ok_or(NoAlternative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://rpc-{}.example", i)).collect()
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(EndpointPool::new(&[]).is_err());
    }

    #[test]
    fn test_swap_never_returns_current() {
        let pool = EndpointPool::new(&urls(3)).unwrap();

        for _ in 0..200 {
            let current = pool.pick_initial();
            let next = pool.swap(&current).unwrap();
            assert_ne!(next.url(), current.url());
        }
    }

    #[test]
    fn test_two_endpoints_alternate() {
        let pool = EndpointPool::new(&urls(2)).unwrap();
        let mut current = pool.pick_initial();

        for _ in 0..20 {
            let next = pool.swap(&current).unwrap();
            assert_ne!(next.url(), current.url());
            current = next;
        }
    }

    #[test]
    fn test_single_endpoint_has_no_alternative() {
        let pool = EndpointPool::new(&urls(1)).unwrap();
        let current = pool.pick_initial();
        assert_eq!(pool.swap(&current).unwrap_err(), NoAlternative);
    }

    #[test]
    fn test_initial_pick_spreads_over_endpoints() {
        let pool = EndpointPool::new(&urls(4)).unwrap();
        let seen: HashSet<String> = (0..400)
            .map(|_| pool.pick_initial().url().to_string())
            .collect();
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_health_tracking() {
        let pool = EndpointPool::new(&urls(1)).unwrap();
        let endpoint = pool.pick_initial();

        assert_eq!(endpoint.health_state(), EndpointHealth::Healthy);
        assert_eq!(endpoint.record_failure(), 1);
        assert_eq!(endpoint.record_failure(), 2);
        assert_eq!(
            endpoint.health_state(),
            EndpointHealth::Degraded {
                consecutive_failures: 2
            }
        );
        endpoint.record_success();
        assert_eq!(endpoint.health_state(), EndpointHealth::Healthy);
    }
}
