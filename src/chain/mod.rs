//! Chain module - network description and RPC access
//!
//! This module provides:
//! - The static network profile shared by all accounts
//! - An endpoint pool with randomized pick and non-repeating failover
//! - The `ChainRpc` seam and its ethers/HTTP implementation
//! - Per-account endpoint sessions

pub mod endpoint;
pub mod network;
pub mod provider;
pub mod session;

pub use endpoint::EndpointPool;
pub use network::{ConfirmationPolicy, NetworkProfile};
pub use provider::{ChainRpc, HttpConnector, RpcConnector};
pub use session::EndpointSession;
