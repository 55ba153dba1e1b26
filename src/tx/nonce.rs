//! Nonce bookkeeping for one account
//!
//! An account client can run several intents in sequence. Between them the
//! session may have moved to an endpoint that has not seen the previous
//! broadcast yet, so the endpoint's pending count is reconciled with the
//! highest nonce this process has broadcast.

use ethers::types::{H256, U256};
use tracing::{debug, warn};

/// Per-account nonce state
#[derive(Debug, Default)]
pub struct NonceTracker {
    /// Highest nonce this process has broadcast
    last_broadcast: Option<U256>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nonce to use given the endpoint's pending transaction count.
    ///
    /// A freshly swapped endpoint can lag behind the one that accepted the
    /// previous broadcast; its count is then raised past the local high mark.
    pub fn reconcile(&self, fetched: U256) -> U256 {
        match self.last_broadcast {
            Some(last) if fetched <= last => {
                let next = last + 1;
                warn!(
                    "Endpoint reported stale nonce {}, using {} instead",
                    fetched, next
                );
                next
            }
            _ => fetched,
        }
    }

    /// Record a transaction the pool accepted
    pub fn mark_broadcast(&mut self, nonce: U256, tx_hash: H256) {
        if self.last_broadcast.map_or(true, |last| nonce > last) {
            self.last_broadcast = Some(nonce);
        }
        debug!("Nonce {} broadcast as {:?}", nonce, tx_hash);
    }

    pub fn last_broadcast(&self) -> Option<U256> {
        self.last_broadcast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_nonce_is_taken_from_endpoint() {
        let tracker = NonceTracker::new();
        assert_eq!(tracker.reconcile(U256::from(5)), U256::from(5));
    }

    #[test]
    fn test_stale_count_after_swap_is_raised() {
        let mut tracker = NonceTracker::new();
        tracker.mark_broadcast(U256::from(5), H256::repeat_byte(1));

        assert_eq!(tracker.reconcile(U256::from(5)), U256::from(6));
        assert_eq!(tracker.reconcile(U256::from(3)), U256::from(6));
        assert_eq!(tracker.reconcile(U256::from(8)), U256::from(8));
    }

    #[test]
    fn test_nonces_never_repeat_across_broadcasts() {
        let mut tracker = NonceTracker::new();
        let mut used = Vec::new();

        // endpoint keeps answering with the same stale count
        for i in 0..5u8 {
            let nonce = tracker.reconcile(U256::from(10));
            tracker.mark_broadcast(nonce, H256::repeat_byte(i));
            used.push(nonce);
        }

        for pair in used.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert_eq!(tracker.last_broadcast(), Some(U256::from(14)));
    }
}
