//! Integration test crate for the paywall workspace.
//!
//! Holds shared fixtures; the end-to-end flows live in `tests/` and
//! exercise `paywall-core` together with the SQLite legacy store.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p paywall-integration-tests
//! ```

pub mod fixtures {
    use paywall_core::{CallContext, InMemoryTreasury, Paywall, PaywallConfig};
    use paywall_gating::migration::{InMemoryLegacySource, LegacySource};
    use paywall_gating::oracle::StubOracle;
    use paywall_types::{AccountId, ContractRef, Tick};

    pub const OWNER: AccountId = AccountId::new([0xA0; 32]);
    pub const FEES: AccountId = AccountId::new([0xFE; 32]);
    pub const CREATOR: AccountId = AccountId::new([0xC0; 32]);
    pub const ALICE: AccountId = AccountId::new([0x01; 32]);
    pub const BOB: AccountId = AccountId::new([0x02; 32]);
    pub const TOKEN: ContractRef = ContractRef::new([0x70; 32]);
    pub const COLLECTION: ContractRef = ContractRef::new([0x71; 32]);
    pub const LEGACY: ContractRef = ContractRef::new([0x1E; 32]);

    pub fn config() -> PaywallConfig {
        let mut config = PaywallConfig::default();
        config.platform.owner = OWNER;
        config.platform.fee_account = FEES;
        config.migration.legacy_source = Some(LEGACY);
        config
    }

    pub fn ctx(caller: AccountId, now: Tick) -> CallContext {
        CallContext::new(caller, now)
    }

    /// Service with the given collaborators and the default test config.
    pub fn paywall(
        treasury: InMemoryTreasury,
        oracle: StubOracle,
        legacy: Box<dyn LegacySource>,
    ) -> Paywall {
        Paywall::new(&config(), Box::new(treasury), Box::new(oracle), legacy).expect("paywall")
    }

    /// Service where ALICE and BOB each hold `balance`.
    pub fn funded(balance: u128) -> Paywall {
        paywall(
            InMemoryTreasury::new()
                .with_balance(ALICE, balance)
                .with_balance(BOB, balance),
            StubOracle::new(),
            Box::new(InMemoryLegacySource::new()),
        )
    }

    /// Register content `id` by CREATOR.
    pub fn add_content(paywall: &Paywall, id: u64, price: u128) {
        paywall
            .add_content(&ctx(CREATOR, 0), id, price, CREATOR, "ipfs://content")
            .expect("add content");
    }
}
