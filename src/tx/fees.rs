//! Fee parameter computation for legacy and fee-market transactions

use crate::chain::{ChainRpc, NetworkProfile};
use crate::error::{FeeEstimationError, RpcFailure};

use ethers::types::{FeeHistory, U256};
use tracing::debug;

/// Blocks sampled for the priority fee
pub const PRIORITY_FEE_BLOCKS: u64 = 25;
/// Reward percentile requested from `eth_feeHistory`
pub const PRIORITY_FEE_PERCENTILE: f64 = 20.0;

/// Pricing fields of a prepared transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFields {
    Legacy {
        gas_price: U256,
    },
    FeeMarket {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl FeeFields {
    /// Upper bound on the price paid per unit of gas
    pub fn max_price_per_gas(&self) -> U256 {
        match self {
            FeeFields::Legacy { gas_price } => *gas_price,
            FeeFields::FeeMarket {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// `ceil(1.5 * value)`
pub fn with_margin(value: U256) -> U256 {
    (value * 3 + 1) / 2
}

/// Average of the non-zero first reward entries, rounded to the nearest wei.
/// Zero when the history carries no usable samples.
pub fn priority_fee_from_history(history: &FeeHistory) -> U256 {
    let samples: Vec<U256> = history
        .reward
        .iter()
        .filter_map(|rewards| rewards.first().copied())
        .filter(|reward| !reward.is_zero())
        .collect();

    let count = U256::from(samples.len().max(1));
    let sum = samples
        .into_iter()
        .fold(U256::zero(), |acc, reward| acc.saturating_add(reward));

    (sum + count / 2) / count
}

/// Stateless fee estimator
#[derive(Debug, Default, Clone, Copy)]
pub struct FeeEstimator;

impl FeeEstimator {
    pub async fn estimate(
        profile: &NetworkProfile,
        rpc: &dyn ChainRpc,
    ) -> Result<FeeFields, FeeEstimationError> {
        if !profile.fee_market_supported {
            let gas_price = rpc.get_gas_price().await.map_err(FeeEstimationError)?;
            let fees = FeeFields::Legacy {
                gas_price: with_margin(gas_price),
            };
            debug!("Legacy fees for chain {}: {:?}", profile.chain_id, fees);
            return Ok(fees);
        }

        let base_fee = rpc
            .latest_base_fee()
            .await
            .map_err(FeeEstimationError)?
            .ok_or_else(|| {
                FeeEstimationError(RpcFailure::new("latest block has no baseFeePerGas"))
            })?;

        let history = rpc
            .fee_history(PRIORITY_FEE_BLOCKS, &[PRIORITY_FEE_PERCENTILE])
            .await
            .map_err(FeeEstimationError)?;
        let priority_fee = priority_fee_from_history(&history);

        let fees = FeeFields::FeeMarket {
            max_fee_per_gas: with_margin(base_fee + priority_fee),
            max_priority_fee_per_gas: priority_fee,
        };
        debug!("Fee-market fees for chain {}: {:?}", profile.chain_id, fees);
        Ok(fees)
    }
}
