//! Per-account transaction client
//!
//! Composes the endpoint session, nonce tracker, builder, submitter and
//! poller for a single account. Steps run strictly in sequence; nothing here
//! is shared with other accounts.

use crate::abi::{from_alloy_u256, to_alloy_address, IERC20};
use crate::accounts::Account;
use crate::chain::{EndpointPool, EndpointSession, NetworkProfile, RpcConnector};
use crate::config::RunnerConfig;
use crate::error::{classify, BlockchainError, ErrorClass, FleetError, FleetResult};
use crate::tx::{
    ConfirmationOutcome, ConfirmationPoller, NonceTracker, PreparedTransaction,
    SubmissionResult, Submitter, TransactionBuilder, TransactionIntent,
};

use alloy_sol_types::SolCall;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Eip1559TransactionRequest, H256, U256};
use ethers::utils::to_checksum;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Retry knobs of the client
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Build tries per transaction; transient failures swap endpoints in between
    pub build_attempts: u32,
    /// Fresh-nonce resubmissions after a transient broadcast failure
    pub max_resends: u32,
    pub swap_after_failures: u32,
}

impl From<&RunnerConfig> for ClientOptions {
    fn from(runner: &RunnerConfig) -> Self {
        Self {
            build_attempts: runner.build_attempts,
            max_resends: runner.max_resends,
            swap_after_failures: runner.swap_after_failures,
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            build_attempts: 3,
            max_resends: 0,
            swap_after_failures: 3,
        }
    }
}

pub struct AccountClient {
    wallet: LocalWallet,
    profile: Arc<NetworkProfile>,
    session: EndpointSession,
    nonces: NonceTracker,
    poller: ConfirmationPoller,
    options: ClientOptions,
}

impl AccountClient {
    /// Create the client for `account`, opening its own session on a random endpoint
    pub fn connect(
        account: &Account,
        profile: Arc<NetworkProfile>,
        pool: Arc<EndpointPool>,
        connector: Arc<dyn RpcConnector>,
        options: ClientOptions,
    ) -> FleetResult<Self> {
        let wallet = account
            .private_key
            .expose()
            .parse::<LocalWallet>()
            .map_err(|e| FleetError::Wallet {
                account_id: account.id,
                message: format!("invalid private key: {}", e),
            })?
            .with_chain_id(profile.chain_id);

        let label = format!("[{}] [{}]", account.id, to_checksum(&wallet.address(), None));
        let session = EndpointSession::open(pool, connector, account.proxy.clone(), label)?;

        Ok(Self::with_session(account.id, wallet, profile, session, options))
    }

    pub fn with_session(
        account_id: usize,
        wallet: LocalWallet,
        profile: Arc<NetworkProfile>,
        session: EndpointSession,
        options: ClientOptions,
    ) -> Self {
        let poller = ConfirmationPoller::new(profile.confirmation, options.swap_after_failures);
        debug!("Account {} client ready on {}", account_id, session.endpoint().url());
        Self {
            wallet,
            profile,
            session,
            nonces: NonceTracker::new(),
            poller,
            options,
        }
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// `[id] [address]` log prefix
    pub fn label(&self) -> &str {
        self.session.label()
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    pub async fn native_balance(&self) -> FleetResult<U256> {
        let balance = self
            .session
            .rpc()
            .get_balance(self.address())
            .await
            .map_err(BlockchainError::Query)?;
        Ok(balance)
    }

    /// ERC-20 `balanceOf(self)` on `token`
    pub async fn token_balance(&self, token: Address) -> FleetResult<U256> {
        let calldata = IERC20::balanceOfCall {
            owner: to_alloy_address(self.address()),
        }
        .abi_encode();

        let call: TypedTransaction = Eip1559TransactionRequest::new()
            .from(self.address())
            .to(token)
            .data(calldata)
            .into();

        let output = self
            .session
            .rpc()
            .call(&call)
            .await
            .map_err(BlockchainError::Query)?;

        let decoded = IERC20::balanceOfCall::abi_decode_returns(&output, true)
            .map_err(|e| BlockchainError::Decode(format!("balanceOf: {}", e)))?;
        Ok(from_alloy_u256(decoded.balance))
    }

    /// Build `intent`, swapping endpoints between transient failures
    pub async fn prepare(&mut self, intent: &TransactionIntent) -> FleetResult<PreparedTransaction> {
        let attempts = self.options.build_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let built = TransactionBuilder::build(
                intent,
                self.address(),
                &self.profile,
                self.session.rpc(),
                &self.nonces,
            )
            .await;

            match built {
                Ok(prepared) => {
                    self.session.record_success();
                    return Ok(prepared);
                }
                Err(e) if e.class() == ErrorClass::Transient && attempt < attempts => {
                    warn!(
                        "{} Build attempt {}/{} failed: {}",
                        self.label(),
                        attempt,
                        attempts,
                        e
                    );
                    self.session.record_failure();
                    self.session.swap();
                }
                Err(e) => {
                    if e.class() == ErrorClass::Transient {
                        self.session.record_failure();
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Submit an already built transaction and wait for its outcome
    pub async fn send_prepared(&mut self, prepared: &PreparedTransaction) -> FleetResult<H256> {
        let submission = Submitter::submit(prepared, &self.wallet, self.session.rpc()).await;

        let tx_hash = match submission {
            SubmissionResult::TransactionHash(hash) => hash,
            SubmissionResult::AlreadyKnown(hash) => {
                warn!("{} RPC got error, but tx was sent", self.label());
                hash
            }
            SubmissionResult::Failure(reason) => {
                crate::metrics::record_broadcast_failed();
                return Err(BlockchainError::Broadcast(reason).into());
            }
        };

        self.nonces.mark_broadcast(prepared.nonce, tx_hash);
        crate::metrics::record_tx_submitted(self.profile.chain_id);

        let started = Instant::now();
        let outcome = self
            .poller
            .await_confirmation(tx_hash, &mut self.session)
            .await;
        crate::metrics::record_outcome(outcome.label(), started.elapsed().as_secs_f64());

        let link = self.profile.tx_link(outcome.tx_hash());
        match outcome {
            ConfirmationOutcome::Confirmed(hash) => {
                info!("{} Transaction was successful: {}", self.label(), link);
                Ok(hash)
            }
            ConfirmationOutcome::AssumedConfirmed(hash) => {
                warn!(
                    "{} Transaction was sent and tried to be confirmed, but not finished yet: {}",
                    self.label(),
                    link
                );
                Ok(hash)
            }
            ConfirmationOutcome::Reverted(hash) => Err(BlockchainError::Reverted {
                tx_hash: hash,
                explorer_link: link,
            }
            .into()),
            ConfirmationOutcome::TimedOut(hash) => Err(BlockchainError::ConfirmationTimeout {
                tx_hash: hash,
                timeout_secs: self.profile.confirmation.timeout.as_secs(),
            }
            .into()),
        }
    }

    /// Build, submit and confirm `intent`.
    ///
    /// A transient broadcast failure always moves the session to another
    /// endpoint; the transaction is rebuilt with a fresh nonce and resent only
    /// while resends remain.
    pub async fn execute(&mut self, intent: &TransactionIntent) -> FleetResult<H256> {
        let mut resends_left = self.options.max_resends;

        loop {
            let prepared = self.prepare(intent).await?;

            match self.send_prepared(&prepared).await {
                Err(FleetError::Blockchain(BlockchainError::Broadcast(reason)))
                    if classify(&reason) == ErrorClass::Transient =>
                {
                    warn!("{} Broadcast failed: {}", self.label(), reason);
                    self.session.record_failure();
                    self.session.swap();

                    if resends_left == 0 {
                        return Err(BlockchainError::Broadcast(reason).into());
                    }
                    resends_left -= 1;
                    info!(
                        "{} Resending with a fresh nonce ({} resends left)",
                        self.label(),
                        resends_left
                    );
                }
                result => return result,
            }
        }
    }
}
