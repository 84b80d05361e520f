//! Currency movement boundary.
//!
//! The service never holds funds. Every payment is a batch of
//! [`TransferLeg`]s handed to [`Treasury::transfer_batch`], which either
//! applies all of them or none.

use std::collections::HashMap;

use paywall_gating::oracle::{NativeBalances, OracleError};
use paywall_types::AccountId;

/// A transfer could not be executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("{account} holds {balance}, needs {amount}")]
    InsufficientBalance {
        account: AccountId,
        balance: u128,
        amount: u128,
    },

    #[error("balance of {0} would overflow")]
    Overflow(AccountId),

    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// A leg failed and reversing an earlier leg failed too. Funds moved by
    /// the batch may still be displaced.
    #[error("leg failed ({failed}) and reversal failed ({reversal})")]
    CompensationFailed { failed: String, reversal: String },
}

/// One leg of a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferLeg {
    pub amount: u128,
    pub from: AccountId,
    pub to: AccountId,
}

/// Native currency ledger.
pub trait Treasury: Send {
    fn transfer(
        &mut self,
        amount: u128,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), TransferError>;

    fn native_balance(&self, account: &AccountId) -> Result<u128, TransferError>;

    /// Apply `legs` in order, all or nothing.
    ///
    /// The default executes each leg and, if one fails, reverses the
    /// executed legs newest first. A failed reversal is reported as
    /// [`TransferError::CompensationFailed`]. Ledgers that can stage
    /// changes should override this with a true atomic commit.
    fn transfer_batch(&mut self, legs: &[TransferLeg]) -> Result<(), TransferError> {
        for (done, leg) in legs.iter().enumerate() {
            let Err(err) = self.transfer(leg.amount, &leg.from, &leg.to) else {
                continue;
            };
            tracing::warn!(
                amount = leg.amount,
                from = %leg.from,
                to = %leg.to,
                error = %err,
                completed = done,
                "transfer failed, compensating"
            );
            for prior in legs[..done].iter().rev() {
                if let Err(undo) = self.transfer(prior.amount, &prior.to, &prior.from) {
                    tracing::error!(
                        amount = prior.amount,
                        from = %prior.to,
                        to = %prior.from,
                        error = %undo,
                        "compensating transfer failed"
                    );
                    return Err(TransferError::CompensationFailed {
                        failed: err.to_string(),
                        reversal: undo.to_string(),
                    });
                }
            }
            return Err(err);
        }
        Ok(())
    }
}

/// Execute the non-zero `legs` of a payment as one batch.
pub fn execute_transfers(
    treasury: &mut dyn Treasury,
    legs: &[TransferLeg],
) -> Result<(), TransferError> {
    let legs: Vec<TransferLeg> = legs.iter().filter(|l| l.amount > 0).copied().collect();
    if legs.is_empty() {
        return Ok(());
    }
    treasury.transfer_batch(&legs)
}

/// Exposes a [`Treasury`] as the gating engine's native balance source.
pub struct TreasuryBalances<'a>(pub &'a dyn Treasury);

impl NativeBalances for TreasuryBalances<'_> {
    fn native_balance(&self, account: &AccountId) -> Result<u128, OracleError> {
        self.0
            .native_balance(account)
            .map_err(|e| OracleError::Other(e.to_string()))
    }
}

/// In-memory balances with optional failure injection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTreasury {
    balances: HashMap<AccountId, u128>,
    frozen: Vec<AccountId>,
}

impl InMemoryTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`credit`](Self::credit).
    pub fn with_balance(mut self, account: AccountId, amount: u128) -> Self {
        self.credit(account, amount);
        self
    }

    /// Add funds out of thin air.
    pub fn credit(&mut self, account: AccountId, amount: u128) {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Reject every transfer into `account`.
    pub fn freeze(&mut self, account: AccountId) {
        self.frozen.push(account);
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().fold(0u128, |acc, b| acc.saturating_add(*b))
    }
}

impl Treasury for InMemoryTreasury {
    fn transfer(
        &mut self,
        amount: u128,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), TransferError> {
        if self.frozen.contains(to) {
            return Err(TransferError::Rejected(format!("{to} is frozen")));
        }
        let balance = self.balance(from);
        if balance < amount {
            return Err(TransferError::InsufficientBalance {
                account: *from,
                balance,
                amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(TransferError::Overflow(*to))?;

        self.balances.insert(*from, balance - amount);
        self.balances.insert(*to, credited);
        tracing::trace!(amount, %from, %to, "transfer");
        Ok(())
    }

    fn native_balance(&self, account: &AccountId) -> Result<u128, TransferError> {
        Ok(self.balance(account))
    }

    /// Stages every leg on a copy and commits only if all succeed.
    fn transfer_batch(&mut self, legs: &[TransferLeg]) -> Result<(), TransferError> {
        let mut staged = self.clone();
        for leg in legs {
            staged.transfer(leg.amount, &leg.from, &leg.to)?;
        }
        *self = staged;
        Ok(())
    }
}
