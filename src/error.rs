//! Error types for the fleet runner

use ethers::providers::{ProviderError, RpcError};
use ethers::types::{H256, U256};
use ethers::utils::format_ether;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// A failed JSON-RPC call, reduced to its normalized message.
///
/// Normalization happens once, at the provider boundary: a structured
/// JSON-RPC error contributes its `message` field, anything else its raw
/// text. Identical failures therefore produce identical log lines no matter
/// which call surfaced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RpcFailure {
    message: String,
}

impl RpcFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Normalize an ethers provider error
    pub fn from_provider(err: ProviderError) -> Self {
        match err.as_error_response() {
            Some(resp) => Self::new(resp.message.clone()),
            None => Self::new(err.to_string()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn class(&self) -> ErrorClass {
        classify(&self.message)
    }
}

/// Closed set of causes a normalized provider message can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The endpoint is struggling; the same request may succeed elsewhere
    Transient,
    /// The pool already holds this exact transaction
    AlreadyKnown,
    /// Deterministic failure; retrying the same request will not help
    Fatal,
}

const ALREADY_KNOWN_MARKERS: &[&str] = &["already known", "known transaction"];

const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "rate limit",
    "too many requests",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
    "temporarily unavailable",
    "connection",
    "error sending request",
    "header not found",
    "eof",
];

lazy_static! {
    /// Retryable HTTP status codes, only when reported as a status
    static ref TRANSIENT_STATUS: Regex =
        Regex::new(r"\b(?:status(?: code)?|http(?: error)?|code)[:=\s]*(?:429|50[234])\b")
            .expect("status pattern is valid");
}

/// Classify a normalized provider message.
///
/// Providers expose no structured code for these conditions, so this matches
/// on message text and will drift if an endpoint rewords its errors.
pub fn classify(message: &str) -> ErrorClass {
    let lower = message.to_ascii_lowercase();

    if ALREADY_KNOWN_MARKERS.iter().any(|m| lower.contains(m)) {
        return ErrorClass::AlreadyKnown;
    }
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
        || TRANSIENT_STATUS.is_match(&lower)
    {
        return ErrorClass::Transient;
    }
    ErrorClass::Fatal
}

/// Fee estimation could not be served by the endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fee estimation failed: {0}")]
pub struct FeeEstimationError(pub RpcFailure);

/// Assembling a transaction envelope failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("nonce fetch failed: {0}")]
    Nonce(RpcFailure),

    #[error(transparent)]
    Fee(#[from] FeeEstimationError),

    #[error("gas estimation failed: {0}")]
    Gas(RpcFailure),
}

impl BuildError {
    pub fn cause(&self) -> &RpcFailure {
        match self {
            BuildError::Nonce(cause) | BuildError::Gas(cause) => cause,
            BuildError::Fee(FeeEstimationError(cause)) => cause,
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.cause().class()
    }
}

/// Any RPC or on-chain failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("broadcast failed: {0}")]
    Broadcast(String),

    #[error("query failed: {0}")]
    Query(RpcFailure),

    #[error("transaction reverted: {explorer_link}")]
    Reverted { tx_hash: H256, explorer_link: String },

    #[error("transaction {tx_hash:?} not in the chain after {timeout_secs} seconds")]
    ConfirmationTimeout { tx_hash: H256, timeout_secs: u64 },

    #[error("unexpected contract response: {0}")]
    Decode(String),
}

/// Application-level precondition failures; they end an account's pipeline
/// without submitting anything
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("balance {} {symbol} does not cover {} {symbol}", ether(.have), ether(.need))]
    InsufficientBalance {
        have: U256,
        need: U256,
        symbol: String,
    },

    #[error("nothing to unstake: {0}")]
    NothingToUnstake(String),
}

fn ether(wei: &U256) -> String {
    format_ether(*wei)
}

/// Main error type for the fleet runner
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Accounts error: {0}")]
    Accounts(String),

    #[error("Wallet error for account {account_id}: {message}")]
    Wallet { account_id: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Logic(#[from] LogicError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Logic errors end a pipeline quietly rather than failing it
    pub fn is_skip(&self) -> bool {
        matches!(self, FleetError::Logic(_))
    }
}

impl From<BuildError> for FleetError {
    fn from(err: BuildError) -> Self {
        FleetError::Blockchain(BlockchainError::Build(err))
    }
}

/// Result type for fleet operations
pub type FleetResult<T> = Result<T, FleetError>;
