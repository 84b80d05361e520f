//! Integration test: gating rules and the combined access decision.
//!
//! Exercises paywall-core with paywall-gating:
//! 1. NATIVE rule at threshold zero grants everyone
//! 2. FT threshold and NFT ownership (token id, not balance)
//! 3. Rule mutations rejected mid-upgrade while checks keep working
//! 4. Decision path priority and analytics side effects

use paywall_core::{AccessDecision, ErrorKind, InMemoryTreasury};
use paywall_gating::migration::InMemoryLegacySource;
use paywall_gating::oracle::StubOracle;
use paywall_gating::rule::RuleDraft;
use paywall_integration_tests::fixtures::*;
use paywall_types::{AccessMethod, AccountId, GatingKind};

#[test]
fn native_zero_threshold_grants_everyone() {
    let paywall = funded(0);
    add_content(&paywall, 1, 500);
    paywall
        .set_gating_rule(&ctx(CREATOR, 1), 1, RuleDraft::native(0))
        .expect("rule");

    for n in 0..5u8 {
        let account = AccountId::new([0x40 + n; 32]);
        assert_eq!(paywall.check_access(&ctx(account, 2), 1, &account), Ok(true));
    }
    assert_eq!(paywall.gating_rule(1).expect("rule").access_count, 5);
    assert_eq!(paywall.content_analytics(1).expect("analytics").total_access, 5);
}

#[test]
fn native_threshold_reads_treasury_balance() {
    let paywall = funded(1_000);
    add_content(&paywall, 1, 0);
    paywall
        .set_gating_rule(&ctx(CREATOR, 1), 1, RuleDraft::native(1_000))
        .expect("rule");

    assert_eq!(paywall.check_access(&ctx(ALICE, 2), 1, &ALICE), Ok(true));
    add_content(&paywall, 2, 1);
    paywall.purchase(&ctx(ALICE, 3), 2, 1).expect("spend one");
    assert_eq!(paywall.check_access(&ctx(ALICE, 4), 1, &ALICE), Ok(false));
}

#[test]
fn fungible_and_nft_rules() {
    let mut oracle = StubOracle::new();
    oracle.set_balance(TOKEN, ALICE, 100);
    oracle.set_balance(TOKEN, BOB, 99);
    oracle.set_owner(COLLECTION, 7, BOB);
    oracle.set_balance(COLLECTION, ALICE, 7);
    let paywall = paywall(
        InMemoryTreasury::new(),
        oracle,
        Box::new(InMemoryLegacySource::new()),
    );
    add_content(&paywall, 1, 0);
    add_content(&paywall, 2, 0);
    paywall
        .set_gating_rule(&ctx(CREATOR, 1), 1, RuleDraft::fungible(TOKEN, 100))
        .expect("ft");
    paywall
        .set_gating_rule(&ctx(CREATOR, 1), 2, RuleDraft::non_fungible(COLLECTION, 7))
        .expect("nft");

    assert_eq!(paywall.check_access(&ctx(ALICE, 2), 1, &ALICE), Ok(true));
    assert_eq!(paywall.check_access(&ctx(BOB, 2), 1, &BOB), Ok(false));

    assert_eq!(paywall.check_access(&ctx(BOB, 2), 2, &BOB), Ok(true));
    assert_eq!(paywall.check_access(&ctx(ALICE, 2), 2, &ALICE), Ok(false));
}

#[test]
fn token_rule_without_token_never_passes() {
    let paywall = funded(0);
    add_content(&paywall, 1, 0);
    paywall
        .set_gating_rule_coded(
            &ctx(CREATOR, 1),
            1,
            None,
            0,
            GatingKind::Ft.code(),
            None,
            Vec::new(),
        )
        .expect("ft without token");
    assert_eq!(paywall.check_access(&ctx(ALICE, 2), 1, &ALICE), Ok(false));
}

#[test]
fn set_rule_blocked_during_upgrade() {
    let paywall = funded(0);
    add_content(&paywall, 1, 0);
    add_content(&paywall, 2, 0);
    paywall
        .set_gating_rule(&ctx(CREATOR, 1), 1, RuleDraft::native(0))
        .expect("before upgrade");

    paywall.start_upgrade(&ctx(OWNER, 2)).expect("start");
    let err = paywall
        .set_gating_rule(&ctx(CREATOR, 3), 2, RuleDraft::native(0))
        .expect_err("mid upgrade");
    assert_eq!(err.kind(), ErrorKind::UpgradeInProgress);
    assert!(paywall.gating_rule(2).is_none());
    assert_eq!(paywall.check_access(&ctx(ALICE, 3), 1, &ALICE), Ok(true));

    paywall.complete_upgrade(&ctx(OWNER, 4)).expect("complete");
    paywall
        .set_gating_rule(&ctx(CREATOR, 5), 2, RuleDraft::native(0))
        .expect("after upgrade");
}

#[test]
fn decision_prefers_cheapest_path() {
    let mut oracle = StubOracle::new();
    oracle.mark_unreachable(TOKEN);
    let paywall = paywall(
        InMemoryTreasury::new().with_balance(ALICE, 1_000),
        oracle,
        Box::new(InMemoryLegacySource::new()),
    );
    add_content(&paywall, 1, 100);
    paywall
        .set_gating_rule(&ctx(CREATOR, 1), 1, RuleDraft::fungible(TOKEN, 1))
        .expect("rule");

    // The gating path is reached and the oracle is down.
    let err = paywall
        .decide_access(&ctx(ALICE, 2), 1, &ALICE)
        .expect_err("oracle down");
    assert_eq!(err.kind(), ErrorKind::GatingCheckFailed);

    // A purchase short-circuits the oracle.
    paywall.purchase(&ctx(ALICE, 3), 1, 100).expect("buy");
    assert_eq!(
        paywall.decide_access(&ctx(ALICE, 4), 1, &ALICE),
        Ok(AccessDecision::granted(AccessMethod::Purchase))
    );
    assert_eq!(
        paywall.decide_access(&ctx(CREATOR, 4), 1, &CREATOR),
        Ok(AccessDecision::granted(AccessMethod::Creator))
    );
}

#[test]
fn decision_on_unknown_content_is_denied() {
    let paywall = funded(0);
    assert_eq!(
        paywall.decide_access(&ctx(ALICE, 1), 404, &ALICE),
        Ok(AccessDecision::denied())
    );
}

#[test]
fn rule_update_keeps_history() {
    let paywall = funded(0);
    add_content(&paywall, 1, 0);
    paywall
        .set_gating_rule(&ctx(CREATOR, 10), 1, RuleDraft::native(0))
        .expect("rule");
    paywall.check_access(&ctx(ALICE, 11), 1, &ALICE).expect("check");

    let updated = paywall
        .set_gating_rule(
            &ctx(CREATOR, 20),
            1,
            RuleDraft::native(5).with_category("video").with_tags(["hd"]),
        )
        .expect("update");
    assert_eq!(updated.created_at, 10);
    assert_eq!(updated.updated_at, 20);
    assert_eq!(updated.access_count, 1);
    assert_eq!(updated.tags, vec!["hd".to_string()]);
}
