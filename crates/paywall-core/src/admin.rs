//! Platform administration, schema upgrade, and read models.

use paywall_gating::migration::{MigrationState, MigrationTally};
use paywall_ledger::access::AccessGrant;
use paywall_ledger::analytics::{ContentAnalytics, UserAccessHistory};
use paywall_ledger::subscription::{ActiveSubscription, SubscriptionTier};
use paywall_types::events::PaywallEvent;
use paywall_types::{AccountId, ContentId, ContractRef, TierId};

use crate::{CallContext, Paywall, PaywallError, Result};

impl Paywall {
    /// Set the platform fee. Returns the previous rate.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is the platform owner
    /// - `InvalidFee` if `basis_points > 1000`
    pub fn set_fee_basis_points(&self, ctx: &CallContext, basis_points: u16) -> Result<u16> {
        let mut state = self.lock();
        state.ensure_owner(&ctx.caller)?;
        let old = state.fees.set_basis_points(basis_points)?;
        self.events.emit(
            ctx.now,
            PaywallEvent::FeeUpdated {
                old_basis_points: old,
                new_basis_points: basis_points,
            },
        );
        Ok(old)
    }

    pub fn fee_basis_points(&self) -> u16 {
        self.lock().fees.basis_points()
    }

    pub fn owner(&self) -> AccountId {
        self.lock().owner
    }

    pub fn fee_account(&self) -> AccountId {
        self.lock().fee_account
    }

    /// Hand platform ownership to `new_owner`.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is the platform owner
    /// - `InvalidInput` if `new_owner` is the zero account
    pub fn transfer_ownership(&self, ctx: &CallContext, new_owner: AccountId) -> Result<()> {
        let mut state = self.lock();
        state.ensure_owner(&ctx.caller)?;
        if new_owner.is_zero() {
            return Err(PaywallError::InvalidInput(
                "new owner is the zero account".to_string(),
            ));
        }
        let previous = std::mem::replace(&mut state.owner, new_owner);

        tracing::info!(%previous, %new_owner, "platform ownership transferred");
        self.events.emit(
            ctx.now,
            PaywallEvent::OwnershipTransferred {
                previous,
                new_owner,
            },
        );
        Ok(())
    }

    /// Change the refund window. Returns the previous window.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is the platform owner
    pub fn set_refund_window(&self, ctx: &CallContext, ticks: u64) -> Result<u64> {
        let mut state = self.lock();
        state.ensure_owner(&ctx.caller)?;
        let previous = std::mem::replace(&mut state.refund_window, ticks);

        tracing::info!(previous, ticks, "refund window updated");
        self.events.emit(
            ctx.now,
            PaywallEvent::RefundWindowUpdated {
                previous_ticks: previous,
                new_ticks: ticks,
            },
        );
        Ok(previous)
    }

    pub fn refund_window(&self) -> u64 {
        self.lock().refund_window
    }

    /// Enter upgrade mode. Returns the schema version being upgraded from.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is the platform owner
    /// - `UpgradeInProgress` if already upgrading
    pub fn start_upgrade(&self, ctx: &CallContext) -> Result<String> {
        let mut state = self.lock();
        state.ensure_owner(&ctx.caller)?;
        let from_version = state.migration.start_upgrade()?;
        self.events.emit(
            ctx.now,
            PaywallEvent::UpgradeStarted {
                from_version: from_version.clone(),
            },
        );
        Ok(from_version)
    }

    /// Leave upgrade mode at the extended schema version.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is the platform owner
    /// - `NotInProgress` if no upgrade is running
    pub fn complete_upgrade(&self, ctx: &CallContext) -> Result<String> {
        let mut state = self.lock();
        state.ensure_owner(&ctx.caller)?;
        let schema_version = state.migration.complete_upgrade()?;
        self.events.emit(
            ctx.now,
            PaywallEvent::UpgradeCompleted {
                schema_version: schema_version.clone(),
            },
        );
        Ok(schema_version)
    }

    /// Copy legacy rules from `source_ref` for each id.
    ///
    /// Per-id failures are tallied, never returned.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` unless the caller is the platform owner
    /// - `NotInProgress` if no upgrade is running
    pub fn migrate_from_legacy(
        &self,
        ctx: &CallContext,
        source_ref: &ContractRef,
        content_ids: &[ContentId],
    ) -> Result<MigrationTally> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.ensure_owner(&ctx.caller)?;
        let tally = state.migration.migrate_from_legacy(
            &mut state.gating,
            state.legacy.as_ref(),
            source_ref,
            content_ids,
        )?;
        self.events.emit(
            ctx.now,
            PaywallEvent::LegacyMigrated {
                source: *source_ref,
                migrated: tally.migrated,
                skipped: tally.skipped,
                errors: tally.errors,
            },
        );
        Ok(tally)
    }

    pub fn migration_state(&self) -> MigrationState {
        self.lock().migration.state().clone()
    }

    // Read models

    pub fn content_analytics(&self, content_id: ContentId) -> Option<ContentAnalytics> {
        self.lock().analytics.content(content_id).copied()
    }

    pub fn access_history(
        &self,
        account: &AccountId,
        content_id: ContentId,
    ) -> Option<UserAccessHistory> {
        self.lock().analytics.history(account, content_id).copied()
    }

    pub fn grant(&self, content_id: ContentId, account: &AccountId) -> Option<AccessGrant> {
        self.lock().access.grant(content_id, account).copied()
    }

    /// # Errors
    ///
    /// - `NotFound` if the tier is absent
    pub fn tier(&self, creator: &AccountId, tier_id: TierId) -> Result<SubscriptionTier> {
        Ok(*self.lock().subscriptions.tier(creator, tier_id)?)
    }

    pub fn subscription(
        &self,
        account: &AccountId,
        creator: &AccountId,
        tier_id: TierId,
    ) -> Option<ActiveSubscription> {
        self.lock()
            .subscriptions
            .subscription(account, creator, tier_id)
            .copied()
    }

    /// Native balance as reported by the treasury.
    ///
    /// # Errors
    ///
    /// - `TransferFailed` if the treasury can not answer
    pub fn native_balance(&self, account: &AccountId) -> Result<u128> {
        Ok(self.lock().treasury.native_balance(account)?)
    }
}
