//! JSON-RPC access to the chain: the calls the transaction core needs, an
//! ethers-backed implementation, and the connector that opens per-account
//! sessions against an endpoint.

use super::endpoint::Endpoint;
use crate::error::{FleetError, FleetResult, RpcFailure};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, JsonRpcClient, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Chain reads and writes used by the fee estimator, builder, submitter and poller.
///
/// Every error is already normalized into an [`RpcFailure`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_balance(&self, address: Address) -> Result<U256, RpcFailure>;

    /// Transaction count including transactions still in the pool
    async fn get_pending_nonce(&self, address: Address) -> Result<U256, RpcFailure>;

    async fn get_gas_price(&self) -> Result<U256, RpcFailure>;

    /// `baseFeePerGas` of the latest block, absent on pre-London chains
    async fn latest_base_fee(&self) -> Result<Option<U256>, RpcFailure>;

    async fn fee_history(
        &self,
        block_count: u64,
        reward_percentiles: &[f64],
    ) -> Result<FeeHistory, RpcFailure>;

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, RpcFailure>;

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, RpcFailure>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, RpcFailure>;

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, RpcFailure>;
}

/// [`ChainRpc`] over an ethers provider
pub struct EthersProvider<P = Http> {
    provider: Provider<P>,
}

impl<P: JsonRpcClient> EthersProvider<P> {
    pub fn new(provider: Provider<P>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> ChainRpc for EthersProvider<P> {
    async fn get_balance(&self, address: Address) -> Result<U256, RpcFailure> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(RpcFailure::from_provider)
    }

    async fn get_pending_nonce(&self, address: Address) -> Result<U256, RpcFailure> {
        self.provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(RpcFailure::from_provider)
    }

    async fn get_gas_price(&self) -> Result<U256, RpcFailure> {
        self.provider
            .get_gas_price()
            .await
            .map_err(RpcFailure::from_provider)
    }

    async fn latest_base_fee(&self) -> Result<Option<U256>, RpcFailure> {
        let block = self
            .provider
            .get_block(BlockNumber::Latest)
            .await
            .map_err(RpcFailure::from_provider)?;

        Ok(block.and_then(|b| b.base_fee_per_gas))
    }

    async fn fee_history(
        &self,
        block_count: u64,
        reward_percentiles: &[f64],
    ) -> Result<FeeHistory, RpcFailure> {
        self.provider
            .fee_history(block_count, BlockNumber::Latest, reward_percentiles)
            .await
            .map_err(RpcFailure::from_provider)
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, RpcFailure> {
        self.provider
            .estimate_gas(tx, None)
            .await
            .map_err(RpcFailure::from_provider)
    }

    async fn call(&self, tx: &TypedTransaction) -> Result<Bytes, RpcFailure> {
        self.provider
            .call(tx, None)
            .await
            .map_err(RpcFailure::from_provider)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, RpcFailure> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(RpcFailure::from_provider)?;

        Ok(pending.tx_hash())
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<TransactionReceipt>, RpcFailure> {
        self.provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(RpcFailure::from_provider)
    }
}

/// Opens a client-side session against one endpoint
pub trait RpcConnector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint, proxy: Option<&str>) -> FleetResult<Arc<dyn ChainRpc>>;
}

/// HTTP connector; every call builds a dedicated reqwest client so accounts
/// never share a connection pool
pub struct HttpConnector {
    request_timeout: Duration,
    via_proxy: bool,
}

impl HttpConnector {
    pub fn new(request_timeout: Duration, via_proxy: bool) -> Self {
        Self {
            request_timeout,
            via_proxy,
        }
    }
}

impl RpcConnector for HttpConnector {
    fn connect(&self, endpoint: &Endpoint, proxy: Option<&str>) -> FleetResult<Arc<dyn ChainRpc>> {
        let mut builder = reqwest::Client::builder().timeout(self.request_timeout);

        if self.via_proxy {
            if let Some(proxy) = proxy {
                let proxy_url = if proxy.contains("://") {
                    proxy.to_string()
                } else {
                    format!("http://{}", proxy)
                };
                let proxy = reqwest::Proxy::all(proxy_url)
                    .map_err(|e| FleetError::Config(format!("Invalid proxy: {}", e)))?;
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| FleetError::Internal(format!("HTTP client setup failed: {}", e)))?;

        let url = reqwest::Url::parse(endpoint.url()).map_err(|e| {
            FleetError::Config(format!("Invalid RPC URL {}: {}", endpoint.url(), e))
        })?;

        let provider = Provider::new(Http::new_with_client(url, client))
            .interval(Duration::from_millis(100));
        debug!("Opened HTTP session to {}", endpoint.url());

        Ok(Arc::new(EthersProvider::new(provider)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::EndpointPool;
    use ethers::providers::{JsonRpcError, MockProvider, MockResponse};

    fn mocked() -> (EthersProvider<MockProvider>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (EthersProvider::new(provider), mock)
    }

    #[tokio::test]
    async fn test_pending_nonce_passthrough() {
        let (rpc, mock) = mocked();
        mock.push::<U256, _>(U256::from(7)).unwrap();

        let nonce = rpc.get_pending_nonce(Address::repeat_byte(1)).await.unwrap();
        assert_eq!(nonce, U256::from(7));
    }

    #[tokio::test]
    async fn test_structured_error_is_normalized_to_message() {
        let (rpc, mock) = mocked();
        mock.push_response(MockResponse::Error(JsonRpcError {
            code: -32000,
            message: "already known".to_string(),
            data: None,
        }));

        let err = rpc
            .send_raw_transaction(Bytes::from(vec![0x02, 0x01]))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "already known");
    }

    #[tokio::test]
    async fn test_missing_receipt_is_none() {
        let (rpc, mock) = mocked();
        mock.push::<Option<TransactionReceipt>, _>(None).unwrap();

        let receipt = rpc
            .get_transaction_receipt(H256::repeat_byte(9))
            .await
            .unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn test_http_connector_validates_url_and_proxy() {
        let pool = EndpointPool::new(&["not a url".to_string()]).unwrap();
        let connector = HttpConnector::new(Duration::from_secs(5), false);
        assert!(connector.connect(&pool.pick_initial(), None).is_err());

        let pool = EndpointPool::new(&["https://rpc.example".to_string()]).unwrap();
        let connector = HttpConnector::new(Duration::from_secs(5), true);
        assert!(connector
            .connect(&pool.pick_initial(), Some("user:pass@10.0.0.1:8080"))
            .is_ok());
        assert!(connector
            .connect(&pool.pick_initial(), Some("http://[bad"))
            .is_err());
    }
}
