//! Magic Eden public mint

use crate::abi::{to_alloy_address, IMagicEdenMint};
use crate::client::AccountClient;
use crate::config::MagicEdenConfig;
use crate::error::FleetResult;
use crate::tx::TransactionIntent;

use alloy_sol_types::SolCall;
use ethers::types::H256;
use tracing::info;

/// `mintPublic(self, 0, 1, 0x)`
pub fn mint_calldata(to: ethers::types::Address) -> Vec<u8> {
    IMagicEdenMint::mintPublicCall {
        to: to_alloy_address(to),
        tokenId: alloy_primitives::U256::ZERO,
        qty: alloy_primitives::U256::from(1),
        data: alloy_primitives::Bytes::new(),
    }
    .abi_encode()
}

pub async fn mint(client: &mut AccountClient, config: &MagicEdenConfig) -> FleetResult<H256> {
    info!(
        "{} mint ME nft contract: {:?}",
        client.label(),
        config.contract
    );

    let intent = TransactionIntent::call(config.contract, mint_calldata(client.address()));
    client.execute(&intent).await
}
