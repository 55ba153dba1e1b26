//! Static description of the target network

use crate::config::{NetworkConfig, Settings};

use ethers::types::H256;
use std::time::Duration;

/// Read-only network descriptor shared by every account's client
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    pub name: String,
    pub chain_id: u64,
    pub native_symbol: String,
    pub fee_market_supported: bool,
    pub endpoints: Vec<String>,
    pub explorer_url_prefix: String,
    pub confirmation: ConfirmationPolicy,
}

/// How long and how often to wait for a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Bound on a single receipt query
    pub query_timeout: Duration,
    /// Slow-indexing networks: a timeout counts as an assumed success
    pub assume_success_on_timeout: bool,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(360),
            query_timeout: Duration::from_secs(30),
            assume_success_on_timeout: false,
        }
    }
}

impl NetworkProfile {
    pub fn from_settings(settings: &Settings) -> Self {
        let network: &NetworkConfig = &settings.network;
        Self {
            name: network.name.clone(),
            chain_id: network.chain_id,
            native_symbol: network.native_symbol.clone(),
            fee_market_supported: network.fee_market,
            endpoints: network.rpc_urls.clone(),
            explorer_url_prefix: network.explorer_url.clone(),
            confirmation: ConfirmationPolicy {
                poll_interval: Duration::from_secs(settings.confirmation.poll_interval_secs),
                timeout: Duration::from_secs(settings.confirmation_timeout_secs()),
                query_timeout: Duration::from_secs(settings.runner.rpc_timeout_secs),
                assume_success_on_timeout: network.assume_success_on_timeout,
            },
        }
    }

    /// Explorer page for a transaction
    pub fn tx_link(&self, tx_hash: H256) -> String {
        format!("{}tx/{:?}", self.explorer_url_prefix, tx_hash)
    }
}
