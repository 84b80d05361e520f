//! # paywall-types
//!
//! Shared domain types used across the paywall workspace: identifiers,
//! gating kinds, access methods, field limits and the event vocabulary.

pub mod events;
pub mod ids;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use ids::{AccountId, ContractRef, ParseIdError};

/// Content identifier.
pub type ContentId = u64;

/// Subscription tier identifier, scoped to a creator.
pub type TierId = u32;

/// Logical clock unit used for expiry and refund-window arithmetic.
pub type Tick = u64;

/// Maximum content locator length in bytes.
pub const MAX_LOCATOR_LEN: usize = 256;

/// Maximum gating rule category length in bytes.
pub const MAX_CATEGORY_LEN: usize = 64;

/// Maximum length of a single gating rule tag in bytes.
pub const MAX_TAG_LEN: usize = 32;

/// Maximum number of tags per gating rule.
pub const MAX_TAGS: usize = 10;

/// Denominator for basis-point arithmetic (10,000 bps = 100%).
pub const BASIS_POINTS_DENOMINATOR: u16 = 10_000;

/// Platform fee cap in basis points (10%).
pub const MAX_FEE_BASIS_POINTS: u16 = 1_000;

/// Platform fee applied when none is configured (2.5%).
pub const DEFAULT_FEE_BASIS_POINTS: u16 = 250;

/// Schema version label of legacy gating rules.
pub const LEGACY_SCHEMA_VERSION: &str = "1.0.0";

/// Schema version label of extended gating rules (category, tags, analytics).
pub const EXTENDED_SCHEMA_VERSION: &str = "2.0.0";

/// How a gating rule decides access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingKind {
    /// Fungible token balance at or above a threshold.
    Ft,
    /// Ownership of one specific non-fungible token.
    Nft,
    /// Native currency balance at or above a threshold.
    Native,
}

impl GatingKind {
    /// Wire code used by the legacy rule store.
    pub fn code(self) -> u8 {
        match self {
            GatingKind::Ft => 0,
            GatingKind::Nft => 1,
            GatingKind::Native => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GatingKind::Ft => "ft",
            GatingKind::Nft => "nft",
            GatingKind::Native => "native",
        }
    }
}

/// A gating kind outside `{FT, NFT, NATIVE}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid gating kind: {0}")]
pub struct InvalidGatingKind(pub String);

impl TryFrom<u8> for GatingKind {
    type Error = InvalidGatingKind;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(GatingKind::Ft),
            1 => Ok(GatingKind::Nft),
            2 => Ok(GatingKind::Native),
            other => Err(InvalidGatingKind(other.to_string())),
        }
    }
}

impl FromStr for GatingKind {
    type Err = InvalidGatingKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ft" => Ok(GatingKind::Ft),
            "nft" => Ok(GatingKind::Nft),
            "native" => Ok(GatingKind::Native),
            _ => Err(InvalidGatingKind(s.to_string())),
        }
    }
}

impl fmt::Display for GatingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The path through which an access decision was granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum AccessMethod {
    /// A pay-per-view grant exists.
    Purchase,
    /// The account is the content's creator.
    Creator,
    /// An unexpired subscription to the content's creator.
    Subscription { creator: AccountId, tier_id: TierId },
    /// A gating rule was satisfied.
    Gated { kind: GatingKind },
}

impl AccessMethod {
    /// Short tag reported to callers.
    pub fn tag(&self) -> &'static str {
        match self {
            AccessMethod::Purchase => "purchase",
            AccessMethod::Creator => "creator",
            AccessMethod::Subscription { .. } => "subscription",
            AccessMethod::Gated { .. } => "gated",
        }
    }
}
