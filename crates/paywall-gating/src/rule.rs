//! Gating rule schemas.
//!
//! `threshold` means different things per kind: a minimum balance for
//! [`GatingKind::Ft`] and [`GatingKind::Native`], and a token id for
//! [`GatingKind::Nft`]. [`GatingRule::requirement`] resolves that overload
//! into a [`Requirement`] instead of letting callers guess.

use paywall_types::{
    AccountId, ContractRef, GatingKind, Tick, MAX_CATEGORY_LEN, MAX_TAGS, MAX_TAG_LEN,
};
use serde::{Deserialize, Serialize};

use crate::{GatingError, Result};

/// Rule in the extended schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatingRule {
    /// Token contract for FT/NFT rules. Ignored for NATIVE.
    pub token_ref: Option<ContractRef>,
    /// Minimum balance (FT, NATIVE) or token id (NFT).
    pub threshold: u128,
    pub kind: GatingKind,
    pub active: bool,
    pub created_at: Tick,
    pub updated_at: Tick,
    pub access_count: u64,
    /// Max 64 bytes.
    pub category: Option<String>,
    /// Max 10 tags of 32 bytes each.
    pub tags: Vec<String>,
}

/// Rule in the legacy schema: no category, tags or active flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyGatingRule {
    pub token_ref: Option<ContractRef>,
    pub threshold: u128,
    /// Raw kind code; may be invalid in stores written by old clients.
    pub kind_code: u8,
    pub created_at: Tick,
    pub updated_at: Tick,
    pub access_count: u64,
}

/// Caller-supplied fields for creating or replacing a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub token_ref: Option<ContractRef>,
    pub threshold: u128,
    pub kind: GatingKind,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// What an account must hold to pass a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Native { min_balance: u128 },
    Fungible { token: ContractRef, min_balance: u128 },
    NonFungible { token: ContractRef, token_id: u128 },
}

impl RuleDraft {
    /// Shorthand for a native-balance rule with no metadata.
    pub fn native(min_balance: u128) -> Self {
        Self {
            token_ref: None,
            threshold: min_balance,
            kind: GatingKind::Native,
            category: None,
            tags: Vec::new(),
        }
    }

    /// Shorthand for a fungible-token rule with no metadata.
    pub fn fungible(token: ContractRef, min_balance: u128) -> Self {
        Self {
            token_ref: Some(token),
            threshold: min_balance,
            kind: GatingKind::Ft,
            category: None,
            tags: Vec::new(),
        }
    }

    /// Shorthand for an NFT-ownership rule with no metadata.
    pub fn non_fungible(token: ContractRef, token_id: u128) -> Self {
        Self {
            token_ref: Some(token),
            threshold: token_id,
            kind: GatingKind::Nft,
            category: None,
            tags: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Check category and tag limits.
    ///
    /// # Errors
    ///
    /// - [`GatingError::InvalidInput`] if category > 64 bytes, more than
    ///   10 tags, or any tag > 32 bytes
    pub fn validate(&self) -> Result<()> {
        if let Some(category) = &self.category {
            if category.len() > MAX_CATEGORY_LEN {
                return Err(GatingError::InvalidInput(format!(
                    "category is {} bytes, max {MAX_CATEGORY_LEN}",
                    category.len()
                )));
            }
        }
        if self.tags.len() > MAX_TAGS {
            return Err(GatingError::InvalidInput(format!(
                "{} tags, max {MAX_TAGS}",
                self.tags.len()
            )));
        }
        if let Some(tag) = self.tags.iter().find(|t| t.len() > MAX_TAG_LEN) {
            return Err(GatingError::InvalidInput(format!(
                "tag '{tag}' exceeds {MAX_TAG_LEN} bytes"
            )));
        }
        Ok(())
    }
}

impl GatingRule {
    /// Build a fresh active rule from a validated draft.
    pub fn from_draft(draft: RuleDraft, now: Tick) -> Self {
        Self {
            token_ref: draft.token_ref,
            threshold: draft.threshold,
            kind: draft.kind,
            active: true,
            created_at: now,
            updated_at: now,
            access_count: 0,
            category: draft.category,
            tags: draft.tags,
        }
    }

    /// Convert a legacy rule. Legacy rules were always live, so the result
    /// is active; category and tags start empty.
    ///
    /// # Errors
    ///
    /// - [`GatingError::InvalidGatingKind`] if the legacy kind code is unknown
    pub fn from_legacy(legacy: &LegacyGatingRule) -> Result<Self> {
        let kind = GatingKind::try_from(legacy.kind_code)?;
        Ok(Self {
            token_ref: legacy.token_ref,
            threshold: legacy.threshold,
            kind,
            active: true,
            created_at: legacy.created_at,
            updated_at: legacy.updated_at,
            access_count: legacy.access_count,
            category: None,
            tags: Vec::new(),
        })
    }

    /// Overwrite the caller-controlled fields, keeping `created_at` and
    /// `access_count`. Reactivates a deactivated rule.
    pub fn apply_draft(&mut self, draft: RuleDraft, now: Tick) {
        self.token_ref = draft.token_ref;
        self.threshold = draft.threshold;
        self.kind = draft.kind;
        self.category = draft.category;
        self.tags = draft.tags;
        self.active = true;
        self.updated_at = now;
    }

    /// The holding requirement, or `None` for a token rule with no token
    /// reference (which can never pass).
    pub fn requirement(&self) -> Option<Requirement> {
        match (self.kind, self.token_ref) {
            (GatingKind::Native, _) => Some(Requirement::Native {
                min_balance: self.threshold,
            }),
            (GatingKind::Ft, Some(token)) => Some(Requirement::Fungible {
                token,
                min_balance: self.threshold,
            }),
            (GatingKind::Nft, Some(token)) => Some(Requirement::NonFungible {
                token,
                token_id: self.threshold,
            }),
            (GatingKind::Ft | GatingKind::Nft, None) => None,
        }
    }
}

/// Holder of an NFT satisfies a rule if it is exactly `account`.
pub(crate) fn owns(owner: Option<AccountId>, account: &AccountId) -> bool {
    owner.as_ref() == Some(account)
}
