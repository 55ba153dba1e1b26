//! Transaction core: fee estimation, envelope building, signing and broadcast,
//! and confirmation polling

pub mod builder;
pub mod fees;
pub mod nonce;
pub mod poller;
pub mod submitter;

pub use builder::{PreparedTransaction, TransactionBuilder, TransactionIntent};
pub use nonce::NonceTracker;
pub use poller::{ConfirmationOutcome, ConfirmationPoller};
pub use submitter::{SubmissionResult, Submitter};
