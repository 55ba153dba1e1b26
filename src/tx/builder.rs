//! Turns a transaction intent into a fully populated envelope

use super::fees::{with_margin, FeeEstimator, FeeFields};
use super::nonce::NonceTracker;
use crate::chain::{ChainRpc, NetworkProfile};
use crate::error::BuildError;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, U256};
use tracing::debug;

/// What an account wants to do on chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    /// `None` deploys `calldata` as contract init code
    pub to: Option<Address>,
    pub value: U256,
    pub calldata: Bytes,
    /// Skips gas estimation when set
    pub gas_limit: Option<U256>,
}

impl TransactionIntent {
    pub fn call(to: Address, calldata: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            value: U256::zero(),
            calldata: calldata.into(),
            gas_limit: None,
        }
    }

    pub fn deploy(init_code: Bytes) -> Self {
        Self {
            to: None,
            value: U256::zero(),
            calldata: init_code,
            gas_limit: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// Envelope ready for signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: U256,
    pub value: U256,
    pub chain_id: u64,
    pub gas_limit: U256,
    pub fees: FeeFields,
    pub data: Bytes,
}

impl PreparedTransaction {
    pub fn to_typed(&self) -> TypedTransaction {
        envelope(
            self.from,
            self.to,
            self.nonce,
            self.value,
            self.chain_id,
            Some(self.gas_limit),
            &self.fees,
            &self.data,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn envelope(
    from: Address,
    to: Option<Address>,
    nonce: U256,
    value: U256,
    chain_id: u64,
    gas_limit: Option<U256>,
    fees: &FeeFields,
    data: &Bytes,
) -> TypedTransaction {
    match fees {
        FeeFields::Legacy { gas_price } => {
            let mut tx = TransactionRequest::new()
                .from(from)
                .nonce(nonce)
                .value(value)
                .chain_id(chain_id)
                .gas_price(*gas_price)
                .data(data.clone());
            if let Some(to) = to {
                tx = tx.to(to);
            }
            if let Some(gas) = gas_limit {
                tx = tx.gas(gas);
            }
            TypedTransaction::Legacy(tx)
        }
        FeeFields::FeeMarket {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            let mut tx = Eip1559TransactionRequest::new()
                .from(from)
                .nonce(nonce)
                .value(value)
                .chain_id(chain_id)
                .max_fee_per_gas(*max_fee_per_gas)
                .max_priority_fee_per_gas(*max_priority_fee_per_gas)
                .data(data.clone());
            if let Some(to) = to {
                tx = tx.to(to);
            }
            if let Some(gas) = gas_limit {
                tx = tx.gas(gas);
            }
            TypedTransaction::Eip1559(tx)
        }
    }
}

/// Stateless transaction builder
#[derive(Debug, Default, Clone, Copy)]
pub struct TransactionBuilder;

impl TransactionBuilder {
    /// Fetch nonce, fees and gas limit for `intent`.
    ///
    /// The nonce is read exactly once per call; a resend must call this again.
    pub async fn build(
        intent: &TransactionIntent,
        from: Address,
        profile: &NetworkProfile,
        rpc: &dyn ChainRpc,
        nonces: &NonceTracker,
    ) -> Result<PreparedTransaction, BuildError> {
        let fetched = rpc
            .get_pending_nonce(from)
            .await
            .map_err(BuildError::Nonce)?;
        let nonce = nonces.reconcile(fetched);

        let fees = FeeEstimator::estimate(profile, rpc).await?;

        let gas_limit = match intent.gas_limit {
            Some(fixed) => fixed,
            None => {
                let probe = envelope(
                    from,
                    intent.to,
                    nonce,
                    intent.value,
                    profile.chain_id,
                    None,
                    &fees,
                    &intent.calldata,
                );
                let estimate = rpc.estimate_gas(&probe).await.map_err(BuildError::Gas)?;
                with_margin(estimate)
            }
        };

        debug!(
            "Built transaction from {:?}: nonce {}, gas limit {}, max cost {} wei",
            from,
            nonce,
            gas_limit,
            gas_limit.saturating_mul(fees.max_price_per_gas())
        );

        Ok(PreparedTransaction {
            from,
            to: intent.to,
            nonce,
            value: intent.value,
            chain_id: profile.chain_id,
            gas_limit,
            fees,
            data: intent.calldata.clone(),
        })
    }
}
