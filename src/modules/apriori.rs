//! Apriori liquid staking: deposit native tokens into the vault

use crate::abi::{to_alloy_address, to_alloy_u256, IApriori};
use crate::client::AccountClient;
use crate::config::AprioriConfig;
use crate::error::{FleetResult, LogicError};
use crate::tx::TransactionIntent;

use alloy_sol_types::SolCall;
use ethers::types::{H256, U256};
use ethers::utils::format_ether;
use tracing::info;

/// Stake only when the wallet holds strictly more than `amount`; the rest
/// pays for gas
pub fn check_balance(balance: U256, amount: U256, symbol: &str) -> Result<(), LogicError> {
    if balance <= amount {
        return Err(LogicError::InsufficientBalance {
            have: balance,
            need: amount,
            symbol: symbol.to_string(),
        });
    }
    Ok(())
}

/// `deposit(assets, self)` with `value = assets`
pub fn deposit_intent(config: &AprioriConfig, client: &AccountClient, amount: U256) -> TransactionIntent {
    let calldata = IApriori::depositCall {
        assets: to_alloy_u256(amount),
        receiver: to_alloy_address(client.address()),
    }
    .abi_encode();

    TransactionIntent::call(config.contract, calldata).with_value(amount)
}

pub async fn stake(
    client: &mut AccountClient,
    config: &AprioriConfig,
    amount: U256,
) -> FleetResult<H256> {
    let symbol = client.profile().native_symbol.clone();
    info!(
        "{} random stake amount {}: {}",
        client.label(),
        symbol,
        format_ether(amount)
    );

    let balance = client.native_balance().await?;
    info!(
        "{} Wallet balance {}: {}",
        client.label(),
        symbol,
        format_ether(balance)
    );
    check_balance(balance, amount, &symbol)?;

    let intent = deposit_intent(config, client, amount);
    client.execute(&intent).await
}
