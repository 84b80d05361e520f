//! Integration test: concurrent callers sharing one service.
//!
//! 1. Many threads buy the same (content, account) pair; one wins
//! 2. Upgrade start races rule writes; every write either lands before the
//!    upgrade or is rejected, never half-applied
//! 3. Concurrent fee updates are broadcast in the order they were applied

use std::sync::{Arc, Barrier};
use std::thread;

use paywall_core::ErrorKind;
use paywall_gating::rule::RuleDraft;
use paywall_integration_tests::fixtures::*;
use paywall_types::events::PaywallEvent;

const THREADS: usize = 16;

#[test]
fn concurrent_purchases_grant_once() {
    let paywall = Arc::new(funded(1_000));
    add_content(&paywall, 1, 100);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let paywall = Arc::clone(&paywall);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                paywall.purchase(&ctx(ALICE, 1), 1, 100)
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.kind() == ErrorKind::AlreadyPurchased));

    assert_eq!(paywall.grant(1, &ALICE).expect("grant").purchase_count, 1);
    assert_eq!(paywall.native_balance(&ALICE), Ok(900));
    let analytics = paywall.content_analytics(1).expect("analytics");
    assert_eq!(analytics.revenue_generated, 100);
}

#[test]
fn upgrade_start_races_rule_writes() {
    for round in 0..8u64 {
        let paywall = Arc::new(funded(0));
        for id in 0..THREADS as u64 {
            add_content(&paywall, id, 0);
        }
        let barrier = Arc::new(Barrier::new(THREADS + 1));

        let writers: Vec<_> = (0..THREADS as u64)
            .map(|id| {
                let paywall = Arc::clone(&paywall);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let result =
                        paywall.set_gating_rule(&ctx(CREATOR, round), id, RuleDraft::native(1));
                    (id, result)
                })
            })
            .collect();

        barrier.wait();
        paywall.start_upgrade(&ctx(OWNER, round)).expect("start");

        for writer in writers {
            let (id, result) = writer.join().expect("thread");
            match result {
                Ok(rule) => assert_eq!(paywall.gating_rule(id), Some(rule)),
                Err(e) => {
                    assert_eq!(e.kind(), ErrorKind::UpgradeInProgress);
                    assert!(paywall.gating_rule(id).is_none());
                }
            }
        }
        assert!(paywall.migration_state().in_progress);
        let err = paywall
            .set_gating_rule(&ctx(CREATOR, round), 0, RuleDraft::native(2))
            .expect_err("upgrade running");
        assert_eq!(err.kind(), ErrorKind::UpgradeInProgress);
    }
}

#[test]
fn fee_events_follow_commit_order() {
    let paywall = Arc::new(funded(0));
    let mut rx = paywall.events().subscribe();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as u16)
        .map(|i| {
            let paywall = Arc::clone(&paywall);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                paywall.set_fee_basis_points(&ctx(OWNER, 1), i * 10 + 1)
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread").expect("fee update");
    }

    let mut last_sequence = 0;
    let mut current = 250;
    for _ in 0..THREADS {
        let event = rx.try_recv().expect("event");
        assert!(event.sequence > last_sequence);
        last_sequence = event.sequence;
        match event.payload {
            PaywallEvent::FeeUpdated {
                old_basis_points,
                new_basis_points,
            } => {
                assert_eq!(old_basis_points, current);
                current = new_basis_points;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert!(rx.try_recv().is_err());
    assert_eq!(paywall.fee_basis_points(), current);
}
