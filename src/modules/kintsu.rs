//! Kintsu staking: stake native tokens for sMON, request unlocks, read the
//! sMON balance

use super::amount::unstake_shares;
use super::apriori::check_balance;
use crate::abi::IKintsu;
use crate::client::AccountClient;
use crate::config::KintsuConfig;
use crate::error::{BlockchainError, FleetResult};
use crate::tx::TransactionIntent;

use alloy_sol_types::SolCall;
use ethers::types::{H256, U256};
use ethers::utils::format_ether;
use tracing::info;

pub async fn stake(
    client: &mut AccountClient,
    config: &KintsuConfig,
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

    let intent = TransactionIntent::call(config.contract, IKintsu::stakeCall {}.abi_encode())
        .with_value(amount);
    client.execute(&intent).await
}

/// `requestUnlock(shares)` for the configured share of the sMON balance
pub async fn unstake(client: &mut AccountClient, config: &KintsuConfig) -> FleetResult<H256> {
    let balance = client.token_balance(config.share_token()).await?;
    info!("{} sMON balance: {}", client.label(), format_ether(balance));

    let shares = unstake_shares(balance, config.unstake_percent, config.unstake_all)?;
    if config.unstake_all {
        info!("{} unstake all {} sMON", client.label(), format_ether(shares));
    } else {
        info!(
            "{} unstake {}% sMON == {}",
            client.label(),
            config.unstake_percent,
            format_ether(shares)
        );
    }

    let intent = TransactionIntent::call(config.contract, request_unlock_calldata(shares)?);
    client.execute(&intent).await
}

fn request_unlock_calldata(shares: U256) -> Result<Vec<u8>, BlockchainError> {
    if shares.bits() > 96 {
        return Err(BlockchainError::Decode(format!(
            "share amount {} exceeds uint96",
            shares
        )));
    }

    Ok(IKintsu::requestUnlockCall {
        shares: shares.as_u128(),
    }
    .abi_encode())
}

/// sMON balance, formatted in whole tokens
pub async fn balance(client: &AccountClient, config: &KintsuConfig) -> FleetResult<String> {
    let balance = format_ether(client.token_balance(config.share_token()).await?);
    info!("{} sMON balance: {}", client.label(), balance);
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::provider::MockChainRpc;
    use crate::chain::session::testing::single;
    use crate::client::tests::{buildable_rpc, client, receipt};
    use crate::client::ClientOptions;
    use crate::error::{FleetError, LogicError};
    use crate::modules::amount::STEP_WEI;
    use ethers::types::Bytes;
    use ethers::utils::parse_ether;

    fn config(unstake_all: bool, unstake_percent: u32) -> KintsuConfig {
        KintsuConfig {
            contract: "0xe1d2439b75fb9746E7Bc6cB777Ae10AA7f7ef9c5".parse().unwrap(),
            smon_token: None,
            stake_range: (0.01, 0.02).into(),
            unstake_all,
            unstake_percent,
        }
    }

    fn encoded(value: U256) -> Bytes {
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        Bytes::from(word.to_vec())
    }

    #[test]
    fn test_request_unlock_encoding() {
        let shares = U256::from(5) * U256::from(STEP_WEI);
        let data = request_unlock_calldata(shares).unwrap();

        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &IKintsu::requestUnlockCall::SELECTOR);
        assert_eq!(U256::from_big_endian(&data[4..]), shares);

        let too_large = U256::one() << 96;
        assert!(request_unlock_calldata(too_large).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unstake_half_of_balance() {
        let mut rpc = buildable_rpc();
        rpc.expect_call()
            .returning(|_| Ok(encoded(parse_ether("1.23456789").unwrap())));
        rpc.expect_send_raw_transaction()
            .times(1)
            .returning(|_| Ok(H256::repeat_byte(0x22)));
        rpc.expect_get_transaction_receipt()
            .returning(|_| Ok(Some(receipt(1))));

        let mut client = client(single(rpc), ClientOptions::default());
        let hash = unstake(&mut client, &config(false, 50)).await.unwrap();
        assert_eq!(hash, H256::repeat_byte(0x22));
    }

    #[tokio::test]
    async fn test_unstake_with_dust_balance_is_skipped() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_call().returning(|_| Ok(encoded(U256::from(10))));
        rpc.expect_send_raw_transaction().never();

        let mut client = client(single(rpc), ClientOptions::default());
        let err = unstake(&mut client, &config(true, 100)).await.unwrap_err();
        assert!(matches!(
            err,
            FleetError::Logic(LogicError::NothingToUnstake(_))
        ));
    }

    #[tokio::test]
    async fn test_balance_is_formatted_in_tokens() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_call()
            .returning(|_| Ok(encoded(parse_ether("2.5").unwrap())));

        let client = client(single(rpc), ClientOptions::default());
        assert_eq!(balance(&client, &config(true, 100)).await.unwrap(), "2.500000000000000000");
    }

    #[tokio::test]
    async fn test_stake_skips_when_balance_is_short() {
        let mut rpc = MockChainRpc::new();
        rpc.expect_get_balance()
            .returning(|_| Ok(parse_ether("0.01").unwrap()));
        rpc.expect_send_raw_transaction().never();

        let mut client = client(single(rpc), ClientOptions::default());
        let err = stake(&mut client, &config(true, 100), parse_ether("0.015").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_skip());
    }
}
