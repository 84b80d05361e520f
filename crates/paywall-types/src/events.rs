//! Events emitted after every committed state change.
//!
//! Consumers (reporting stores, dashboards) subscribe to these instead of
//! reading core state back.

use serde::{Deserialize, Serialize};

use crate::{AccessMethod, AccountId, ContentId, ContractRef, GatingKind, Tick, TierId};

/// Envelope for all emitted events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number assigned by the bus.
    pub sequence: u64,
    /// Tick at which the originating operation ran.
    pub tick: Tick,
    pub payload: PaywallEvent,
}

/// All event payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaywallEvent {
    // Content events
    ContentAdded {
        content_id: ContentId,
        creator: AccountId,
        price: u128,
    },
    ContentPriceUpdated {
        content_id: ContentId,
        old_price: u128,
        new_price: u128,
    },
    ContentRemoved {
        content_id: ContentId,
        removed_by: AccountId,
    },

    // Economy events
    AccessPurchased {
        content_id: ContentId,
        buyer: AccountId,
        price: u128,
        fee: u128,
        payout: u128,
        purchase_count: u32,
    },
    AccessRefunded {
        content_id: ContentId,
        account: AccountId,
    },
    TierCreated {
        creator: AccountId,
        tier_id: TierId,
        price: u128,
        duration_ticks: u64,
    },
    TierUpdated {
        creator: AccountId,
        tier_id: TierId,
        active: bool,
    },
    Subscribed {
        account: AccountId,
        creator: AccountId,
        tier_id: TierId,
        expires_at: Tick,
        fee: u128,
        payout: u128,
        renewal: bool,
    },
    SubscriptionCancelled {
        account: AccountId,
        creator: AccountId,
        tier_id: TierId,
    },
    FeeUpdated {
        old_basis_points: u16,
        new_basis_points: u16,
    },
    RefundWindowUpdated {
        previous_ticks: u64,
        new_ticks: u64,
    },

    // Gating events
    GatingRuleSet {
        content_id: ContentId,
        kind: GatingKind,
        migrated_legacy: bool,
    },
    GatingRuleDeactivated {
        content_id: ContentId,
    },
    GatingRuleDeleted {
        content_id: ContentId,
    },
    AccessGranted {
        content_id: ContentId,
        account: AccountId,
        method: AccessMethod,
    },

    // System events
    OwnershipTransferred {
        previous: AccountId,
        new_owner: AccountId,
    },
    UpgradeStarted {
        from_version: String,
    },
    UpgradeCompleted {
        schema_version: String,
    },
    LegacyMigrated {
        source: ContractRef,
        migrated: u32,
        skipped: u32,
        errors: u32,
    },
}

impl PaywallEvent {
    /// Category used by subscribers to filter events.
    pub fn category(&self) -> &'static str {
        match self {
            PaywallEvent::ContentAdded { .. }
            | PaywallEvent::ContentPriceUpdated { .. }
            | PaywallEvent::ContentRemoved { .. } => "content",
            PaywallEvent::AccessPurchased { .. }
            | PaywallEvent::AccessRefunded { .. }
            | PaywallEvent::TierCreated { .. }
            | PaywallEvent::TierUpdated { .. }
            | PaywallEvent::Subscribed { .. }
            | PaywallEvent::SubscriptionCancelled { .. }
            | PaywallEvent::FeeUpdated { .. }
            | PaywallEvent::RefundWindowUpdated { .. } => "economy",
            PaywallEvent::GatingRuleSet { .. }
            | PaywallEvent::GatingRuleDeactivated { .. }
            | PaywallEvent::GatingRuleDeleted { .. }
            | PaywallEvent::AccessGranted { .. } => "access",
            PaywallEvent::OwnershipTransferred { .. }
            | PaywallEvent::UpgradeStarted { .. }
            | PaywallEvent::UpgradeCompleted { .. }
            | PaywallEvent::LegacyMigrated { .. } => "system",
        }
    }
}
