//! In-memory bankroll.
//!
//! Each mutation checks and applies under one lock acquisition, so a
//! rejected mutation leaves every balance untouched.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use super::CustodyAction;
use crate::error::{GateResult, LedgerError};

#[derive(Debug, Default)]
pub struct Bankroll {
    balances: Mutex<HashMap<String, u64>>,
}

impl Bankroll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(opening: &BTreeMap<String, u64>) -> Self {
        Self {
            balances: Mutex::new(opening.iter().map(|(k, v)| (k.clone(), *v)).collect()),
        }
    }

    pub fn balance(&self, account: &str) -> u64 {
        self.balances.lock().get(account).copied().unwrap_or(0)
    }

    /// Apply `action`, returning the account's new balance.
    pub fn apply(&self, action: &CustodyAction) -> GateResult<u64> {
        let (account, amount) = (action.account(), action.amount());
        if account.trim().is_empty() {
            return Err(LedgerError::EmptyAccount);
        }
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let mut balances = self.balances.lock();
        let current = balances.get(account).copied().unwrap_or(0);
        let next = match action {
            CustodyAction::Debit { .. } => {
                current
                    .checked_sub(amount)
                    .ok_or_else(|| LedgerError::InsufficientFunds {
                        account: account.to_string(),
                        balance: current,
                        requested: amount,
                    })?
            }
            CustodyAction::Credit { .. } => {
                current
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::Overflow {
                        account: account.to_string(),
                    })?
            }
        };
        balances.insert(account.to_string(), next);
        Ok(next)
    }
}
