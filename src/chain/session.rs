//! Per-account handle on exactly one endpoint at a time

use super::endpoint::{Endpoint, EndpointPool};
use super::provider::{ChainRpc, RpcConnector};
use crate::error::FleetResult;

use std::sync::Arc;
use tracing::{info, warn};

/// Active RPC session of one account.
///
/// Holds a non-owning reference to its current endpoint and may ask the pool
/// for a different one when the current endpoint misbehaves.
pub struct EndpointSession {
    pool: Arc<EndpointPool>,
    connector: Arc<dyn RpcConnector>,
    endpoint: Arc<Endpoint>,
    rpc: Arc<dyn ChainRpc>,
    proxy: Option<String>,
    /// `[id] [address]` prefix for log lines
    label: String,
}

impl EndpointSession {
    /// Open a session on a randomly picked endpoint
    pub fn open(
        pool: Arc<EndpointPool>,
        connector: Arc<dyn RpcConnector>,
        proxy: Option<String>,
        label: String,
    ) -> FleetResult<Self> {
        let endpoint = pool.pick_initial();
        let rpc = connector.connect(&endpoint, proxy.as_deref())?;

        Ok(Self {
            pool,
            connector,
            endpoint,
            rpc,
            proxy,
            label,
        })
    }

    pub fn rpc(&self) -> &dyn ChainRpc {
        self.rpc.as_ref()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Move to another endpoint. Returns false when the session stays where it
    /// is, either because no alternative exists or the new endpoint could not
    /// be opened.
    pub fn swap(&mut self) -> bool {
        warn!(
            "{} Trying to replace RPC {} ({:?})",
            self.label,
            self.endpoint.url(),
            self.endpoint.health_state()
        );

        let next = match self.pool.swap(&self.endpoint) {
            Ok(next) => next,
            Err(_) => {
                warn!(
                    "{} This network has only 1 RPC, no replacement is possible",
                    self.label
                );
                return false;
            }
        };

        match self.connector.connect(&next, self.proxy.as_deref()) {
            Ok(rpc) => {
                info!(
                    "{} RPC successfully replaced. New RPC: {}",
                    self.label,
                    next.url()
                );
                self.endpoint = next;
                self.rpc = rpc;
                crate::metrics::record_endpoint_swap();
                true
            }
            Err(e) => {
                warn!("{} Could not open RPC {}: {}", self.label, next.url(), e);
                false
            }
        }
    }

    /// Note a failed call against the current endpoint
    pub fn record_failure(&self) -> u32 {
        self.endpoint.record_failure()
    }

    pub fn record_success(&self) {
        self.endpoint.record_success();
    }
}
