//! Access analytics accumulator.
//!
//! Counters only ever grow. They are written as a side effect of purchases
//! and granted access decisions and are never consulted when deciding
//! access. Additions saturate, so recording can not fail after a payment
//! has already been committed.

use std::collections::BTreeMap;

use paywall_types::{AccountId, ContentId, Tick};
use serde::{Deserialize, Serialize};

/// Per-content totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAnalytics {
    pub total_access: u64,
    pub revenue_generated: u128,
    pub last_access: Tick,
}

/// Per-(account, content) history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccessHistory {
    pub first_access: Tick,
    pub last_access: Tick,
    pub access_count: u64,
    pub total_spent: u128,
}

/// Read model of access and revenue counters.
#[derive(Clone, Debug, Default)]
pub struct AnalyticsAccumulator {
    content: BTreeMap<ContentId, ContentAnalytics>,
    history: BTreeMap<(AccountId, ContentId), UserAccessHistory>,
}

impl AnalyticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one access by `account`, optionally with money spent.
    pub fn record(&mut self, content_id: ContentId, account: &AccountId, now: Tick, spent: u128) {
        let totals = self.content.entry(content_id).or_default();
        totals.total_access = totals.total_access.saturating_add(1);
        totals.revenue_generated = totals.revenue_generated.saturating_add(spent);
        totals.last_access = totals.last_access.max(now);

        let history = self
            .history
            .entry((*account, content_id))
            .or_insert(UserAccessHistory {
                first_access: now,
                last_access: now,
                access_count: 0,
                total_spent: 0,
            });
        history.last_access = history.last_access.max(now);
        history.access_count = history.access_count.saturating_add(1);
        history.total_spent = history.total_spent.saturating_add(spent);

        tracing::trace!(
            content_id,
            %account,
            total_access = totals.total_access,
            spent,
            "analytics: access recorded"
        );
    }

    pub fn content(&self, content_id: ContentId) -> Option<&ContentAnalytics> {
        self.content.get(&content_id)
    }

    pub fn history(
        &self,
        account: &AccountId,
        content_id: ContentId,
    ) -> Option<&UserAccessHistory> {
        self.history.get(&(*account, content_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: AccountId = AccountId::new([1; 32]);
    const B: AccountId = AccountId::new([2; 32]);

    #[test]
    fn test_record_accumulates() {
        let mut acc = AnalyticsAccumulator::new();
        acc.record(1, &A, 10, 500);
        acc.record(1, &B, 12, 0);
        acc.record(1, &A, 20, 0);

        let totals = acc.content(1).expect("totals");
        assert_eq!(totals.total_access, 3);
        assert_eq!(totals.revenue_generated, 500);
        assert_eq!(totals.last_access, 20);

        let history = acc.history(&A, 1).expect("history");
        assert_eq!(history.first_access, 10);
        assert_eq!(history.last_access, 20);
        assert_eq!(history.access_count, 2);
        assert_eq!(history.total_spent, 500);
    }

    #[test]
    fn test_last_access_never_moves_backwards() {
        let mut acc = AnalyticsAccumulator::new();
        acc.record(1, &A, 50, 0);
        acc.record(1, &A, 40, 0);
        assert_eq!(acc.content(1).expect("totals").last_access, 50);
        assert_eq!(acc.history(&A, 1).expect("history").last_access, 50);
    }

    #[test]
    fn test_revenue_saturates() {
        let mut acc = AnalyticsAccumulator::new();
        acc.record(1, &A, 1, u128::MAX);
        acc.record(1, &A, 2, 10);
        assert_eq!(acc.content(1).expect("totals").revenue_generated, u128::MAX);
    }

    #[test]
    fn test_unknown_content_has_no_totals() {
        let acc = AnalyticsAccumulator::new();
        assert!(acc.content(9).is_none());
        assert!(acc.history(&A, 9).is_none());
    }
}
