//! Owlto: deploy a contract from configured creation code

use crate::client::AccountClient;
use crate::config::OwltoConfig;
use crate::error::FleetResult;
use crate::tx::TransactionIntent;

use ethers::types::H256;
use tracing::info;

pub async fn deploy(client: &mut AccountClient, config: &OwltoConfig) -> FleetResult<H256> {
    let intent = TransactionIntent::deploy(config.bytecode.clone());
    let prepared = client.prepare(&intent).await?;
    info!(
        "{} Estimated deploy contract gas: {}",
        client.label(),
        prepared.gas_limit
    );

    client.send_prepared(&prepared).await
}
