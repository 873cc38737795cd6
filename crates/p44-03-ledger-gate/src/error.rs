//! Error types for the ledger gate.
//!
//! A denied action is not an error; see [`crate::domain::GateDecision`].

use thiserror::Error;

/// Bankroll mutation failures. Nothing is applied when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("amount must be positive")]
    ZeroAmount,

    #[error("insufficient funds in {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: u64,
        requested: u64,
    },

    #[error("balance overflow in {account}")]
    Overflow { account: String },

    #[error("account must not be empty")]
    EmptyAccount,
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, LedgerError>;
