//! Token balance and ownership boundary.
//!
//! The engine never reads chain state itself. It asks a [`TokenOracle`] for
//! fungible balances and NFT owners and a [`NativeBalances`] source for the
//! native currency balance. A failing oracle must surface as an error, not
//! as a silent denial.
//!
//! [`StubOracle`] is an in-memory implementation of both traits used by
//! tests and offline tooling.

use std::collections::HashMap;

use paywall_types::{AccountId, ContractRef};

/// The oracle could not answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("token contract {0} unreachable")]
    Unreachable(ContractRef),

    #[error("oracle error: {0}")]
    Other(String),
}

/// Fungible balance and NFT ownership lookups.
pub trait TokenOracle: Send {
    fn balance_of(&self, token: &ContractRef, account: &AccountId) -> Result<u128, OracleError>;

    fn owner_of(
        &self,
        token: &ContractRef,
        token_id: u128,
    ) -> Result<Option<AccountId>, OracleError>;
}

/// Native currency balance lookup.
pub trait NativeBalances {
    fn native_balance(&self, account: &AccountId) -> Result<u128, OracleError>;
}

/// In-memory oracle with settable balances and owners.
#[derive(Debug, Clone, Default)]
pub struct StubOracle {
    balances: HashMap<(ContractRef, AccountId), u128>,
    owners: HashMap<(ContractRef, u128), AccountId>,
    native: HashMap<AccountId, u128>,
    unreachable: Vec<ContractRef>,
}

impl StubOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, token: ContractRef, account: AccountId, amount: u128) {
        self.balances.insert((token, account), amount);
    }

    pub fn set_owner(&mut self, token: ContractRef, token_id: u128, owner: AccountId) {
        self.owners.insert((token, token_id), owner);
    }

    pub fn set_native_balance(&mut self, account: AccountId, amount: u128) {
        self.native.insert(account, amount);
    }

    /// Make every lookup against `token` fail.
    pub fn mark_unreachable(&mut self, token: ContractRef) {
        tracing::warn!(%token, "stub oracle: token marked unreachable (test only)");
        self.unreachable.push(token);
    }

    fn reachable(&self, token: &ContractRef) -> Result<(), OracleError> {
        if self.unreachable.contains(token) {
            return Err(OracleError::Unreachable(*token));
        }
        Ok(())
    }
}

impl TokenOracle for StubOracle {
    fn balance_of(&self, token: &ContractRef, account: &AccountId) -> Result<u128, OracleError> {
        self.reachable(token)?;
        Ok(self.balances.get(&(*token, *account)).copied().unwrap_or(0))
    }

    fn owner_of(
        &self,
        token: &ContractRef,
        token_id: u128,
    ) -> Result<Option<AccountId>, OracleError> {
        self.reachable(token)?;
        Ok(self.owners.get(&(*token, token_id)).copied())
    }
}

impl NativeBalances for StubOracle {
    fn native_balance(&self, account: &AccountId) -> Result<u128, OracleError> {
        Ok(self.native.get(account).copied().unwrap_or(0))
    }
}
