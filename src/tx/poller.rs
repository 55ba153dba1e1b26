//! Receipt polling until a transaction is final or the wait gives up

use crate::chain::{ConfirmationPolicy, EndpointSession};

use ethers::types::{TransactionReceipt, H256, U64};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

/// Final state of a broadcast transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Mined with status 1
    Confirmed(H256),
    /// Mined with status 0
    Reverted(H256),
    /// No receipt before the timeout
    TimedOut(H256),
    /// No receipt before the timeout on a network configured to treat that as success
    AssumedConfirmed(H256),
}

impl ConfirmationOutcome {
    pub fn tx_hash(&self) -> H256 {
        match self {
            ConfirmationOutcome::Confirmed(h)
            | ConfirmationOutcome::Reverted(h)
            | ConfirmationOutcome::TimedOut(h)
            | ConfirmationOutcome::AssumedConfirmed(h) => *h,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfirmationOutcome::Confirmed(_) => "confirmed",
            ConfirmationOutcome::Reverted(_) => "reverted",
            ConfirmationOutcome::TimedOut(_) => "timed_out",
            ConfirmationOutcome::AssumedConfirmed(_) => "assumed_confirmed",
        }
    }
}

enum ReceiptState {
    Final(bool),
    Pending,
}

fn receipt_state(receipt: &TransactionReceipt) -> ReceiptState {
    match receipt.status {
        Some(status) if status == U64::from(1) => ReceiptState::Final(true),
        Some(status) if status.is_zero() => ReceiptState::Final(false),
        _ => ReceiptState::Pending,
    }
}

pub struct ConfirmationPoller {
    policy: ConfirmationPolicy,
    /// Consecutive query errors before the session swaps endpoints
    swap_after_failures: u32,
}

impl ConfirmationPoller {
    pub fn new(policy: ConfirmationPolicy, swap_after_failures: u32) -> Self {
        Self {
            policy,
            swap_after_failures: swap_after_failures.max(1),
        }
    }

    /// Poll for the receipt of `tx_hash`. Never fails: RPC errors count as
    /// "not found yet" and the wait ends in one of the four outcomes.
    pub async fn await_confirmation(
        &self,
        tx_hash: H256,
        session: &mut EndpointSession,
    ) -> ConfirmationOutcome {
        let started = Instant::now();
        let mut consecutive_errors = 0u32;

        loop {
            let query = timeout(
                self.policy.query_timeout,
                session.rpc().get_transaction_receipt(tx_hash),
            )
            .await;

            match query {
                Ok(Ok(Some(receipt))) => {
                    consecutive_errors = 0;
                    session.record_success();
                    match receipt_state(&receipt) {
                        ReceiptState::Final(true) => {
                            return ConfirmationOutcome::Confirmed(tx_hash)
                        }
                        ReceiptState::Final(false) => {
                            return ConfirmationOutcome::Reverted(tx_hash)
                        }
                        ReceiptState::Pending => {
                            debug!(
                                "{} Receipt for {:?} has no status yet",
                                session.label(),
                                tx_hash
                            );
                        }
                    }
                }
                Ok(Ok(None)) => {
                    consecutive_errors = 0;
                    session.record_success();
                }
                Ok(Err(e)) => {
                    consecutive_errors += 1;
                    session.record_failure();
                    debug!(
                        "{} Receipt query for {:?} failed: {}",
                        session.label(),
                        tx_hash,
                        e
                    );
                }
                Err(_) => {
                    consecutive_errors += 1;
                    session.record_failure();
                    debug!(
                        "{} Receipt query for {:?} timed out",
                        session.label(),
                        tx_hash
                    );
                }
            }

            if consecutive_errors >= self.swap_after_failures {
                warn!(
                    "{} {} consecutive receipt query failures on {}",
                    session.label(),
                    consecutive_errors,
                    session.endpoint().url()
                );
                session.swap();
                consecutive_errors = 0;
            }

            if started.elapsed() >= self.policy.timeout {
                return if self.policy.assume_success_on_timeout {
                    ConfirmationOutcome::AssumedConfirmed(tx_hash)
                } else {
                    ConfirmationOutcome::TimedOut(tx_hash)
                };
            }

            sleep(self.policy.poll_interval).await;
        }
    }
}
