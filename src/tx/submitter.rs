//! Local signing and raw broadcast

use super::builder::PreparedTransaction;
use crate::chain::ChainRpc;
use crate::error::ErrorClass;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Bytes, H256};
use ethers::utils::keccak256;
use tracing::{debug, warn};

/// Outcome of a single broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    /// Endpoint accepted the transaction
    TransactionHash(H256),
    /// The pool already holds it; the hash is computed locally
    AlreadyKnown(H256),
    /// Rejected or not signable; never retried here
    Failure(String),
}

/// Signed envelope and its hash
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
}

pub struct Submitter;

impl Submitter {
    /// Sign `prepared` with the account wallet
    pub async fn sign(
        prepared: &PreparedTransaction,
        wallet: &LocalWallet,
    ) -> Result<SignedTransaction, String> {
        let typed = prepared.to_typed();
        let signature = wallet
            .sign_transaction(&typed)
            .await
            .map_err(|e| format!("signing failed: {}", e))?;

        let raw = typed.rlp_signed(&signature);
        let hash = H256::from(keccak256(&raw));
        Ok(SignedTransaction { raw, hash })
    }

    /// Sign and broadcast `prepared`
    pub async fn submit(
        prepared: &PreparedTransaction,
        wallet: &LocalWallet,
        rpc: &dyn ChainRpc,
    ) -> SubmissionResult {
        let signed = match Self::sign(prepared, wallet).await {
            Ok(signed) => signed,
            Err(reason) => return SubmissionResult::Failure(reason),
        };

        match rpc.send_raw_transaction(signed.raw).await {
            Ok(hash) => {
                if hash != signed.hash {
                    warn!(
                        "Endpoint returned hash {:?}, locally computed {:?}",
                        hash, signed.hash
                    );
                }
                debug!("Transaction {:?} accepted (nonce {})", hash, prepared.nonce);
                SubmissionResult::TransactionHash(hash)
            }
            Err(err) if err.class() == ErrorClass::AlreadyKnown => {
                debug!("Transaction {:?} already known to the pool", signed.hash);
                SubmissionResult::AlreadyKnown(signed.hash)
            }
            Err(err) => SubmissionResult::Failure(err.message().to_string()),
        }
    }
}
