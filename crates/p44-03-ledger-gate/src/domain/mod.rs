//! Ledger gate domain: custody actions, decisions and the bankroll.

pub mod bankroll;
pub mod decision;

pub use bankroll::Bankroll;
pub use decision::{evaluate_replies, DenyReason, GateDecision, IndexerReply, Receipt};

use serde::{Deserialize, Serialize};

/// An irreversible bankroll mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustodyAction {
    Debit { account: String, amount: u64 },
    Credit { account: String, amount: u64 },
}

impl CustodyAction {
    pub fn account(&self) -> &str {
        match self {
            Self::Debit { account, .. } | Self::Credit { account, .. } => account,
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            Self::Debit { amount, .. } | Self::Credit { amount, .. } => *amount,
        }
    }
}
