//! # paywall-core
//!
//! The paywall service: one object owning every component behind a single
//! lock, exposing a call-style API.
//!
//! ## Atomicity
//!
//! Each operation runs to completion while holding the service lock. Every
//! fallible step (validation, collaborator reads, currency transfers) runs
//! before any state is written; the final commit step can not fail. A
//! failed transfer reverses the earlier transfers of the same operation.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration
//! - [`error`]: Unified error and caller-facing [`ErrorKind`]
//! - [`treasury`]: Currency boundary and compensating transfer batches
//! - [`events`]: Event bus
//! - [`decision`]: Combined access decision
//! - `content`, `subscriptions`, `gating`, `admin`: Operation groups

pub mod config;
pub mod decision;
pub mod error;
pub mod events;
pub mod treasury;

mod admin;
mod content;
mod gating;
mod subscriptions;

use std::sync::{Mutex, MutexGuard, PoisonError};

use paywall_fees::FeeSchedule;
use paywall_gating::engine::GatingEngine;
use paywall_gating::migration::{LegacySource, MigrationCoordinator};
use paywall_gating::oracle::TokenOracle;
use paywall_ledger::access::AccessLedger;
use paywall_ledger::analytics::AnalyticsAccumulator;
use paywall_ledger::registry::ContentRegistry;
use paywall_ledger::subscription::SubscriptionManager;
use paywall_types::{AccountId, ContractRef, Tick};

pub use config::PaywallConfig;
pub use content::PurchaseReceipt;
pub use decision::AccessDecision;
pub use error::{ErrorKind, PaywallError, Result};
pub use events::EventBus;
pub use subscriptions::SubscriptionReceipt;
pub use treasury::{InMemoryTreasury, Treasury, TransferError};

/// Who is calling and when.
///
/// Supplied by the caller-identity provider and the substrate clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: AccountId,
    pub now: Tick,
}

impl CallContext {
    pub fn new(caller: AccountId, now: Tick) -> Self {
        Self { caller, now }
    }
}

/// Everything guarded by the service lock.
struct State {
    owner: AccountId,
    fee_account: AccountId,
    fees: FeeSchedule,
    refund_window: u64,
    legacy_source: Option<ContractRef>,

    registry: ContentRegistry,
    access: AccessLedger,
    subscriptions: SubscriptionManager,
    gating: GatingEngine,
    migration: MigrationCoordinator,
    analytics: AnalyticsAccumulator,

    treasury: Box<dyn Treasury>,
    oracle: Box<dyn TokenOracle>,
    legacy: Box<dyn LegacySource>,
}

impl State {
    fn ensure_owner(&self, caller: &AccountId) -> Result<()> {
        if caller != &self.owner {
            return Err(PaywallError::NotAuthorized(
                "only the platform owner may do this".to_string(),
            ));
        }
        Ok(())
    }
}

/// The paywall service.
pub struct Paywall {
    state: Mutex<State>,
    events: EventBus,
}

impl Paywall {
    /// Build a service from validated config and its collaborators.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the config fails validation
    pub fn new(
        config: &PaywallConfig,
        treasury: Box<dyn Treasury>,
        oracle: Box<dyn TokenOracle>,
        legacy: Box<dyn LegacySource>,
    ) -> Result<Self> {
        config.validate()?;
        let fees = FeeSchedule::new(config.platform.fee_basis_points)?;

        tracing::info!(
            owner = %config.platform.owner,
            fee_bps = fees.basis_points(),
            refund_window = config.access.refund_window_ticks,
            schema_version = %config.migration.schema_version,
            "paywall service created"
        );

        Ok(Self {
            state: Mutex::new(State {
                owner: config.platform.owner,
                fee_account: config.platform.fee_account,
                fees,
                refund_window: config.access.refund_window_ticks,
                legacy_source: config.migration.legacy_source,
                registry: ContentRegistry::new(),
                access: AccessLedger::new(),
                subscriptions: SubscriptionManager::new(),
                gating: GatingEngine::new(),
                migration: MigrationCoordinator::with_schema_version(
                    config.migration.schema_version.clone(),
                ),
                analytics: AnalyticsAccumulator::new(),
                treasury,
                oracle,
                legacy,
            }),
            events: EventBus::default(),
        })
    }

    /// The service's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic mid-operation happens before commit, so the state is intact.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Paywall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paywall").field("events", &self.events).finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    #[test]
    fn test_new_rejects_invalid_fee() {
        let mut config = config();
        config.platform.fee_basis_points = 5_000;
        let result = Paywall::new(
            &config,
            Box::new(InMemoryTreasury::new()),
            Box::new(paywall_gating::oracle::StubOracle::new()),
            Box::new(paywall_gating::migration::InMemoryLegacySource::new()),
        );
        assert!(matches!(result, Err(ref e) if e.kind() == ErrorKind::InvalidConfig));
    }

    #[test]
    fn test_paywall_is_sync() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Paywall>();
        let _ = service();
    }
}
