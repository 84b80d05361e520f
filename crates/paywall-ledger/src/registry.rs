//! Content registry.
//!
//! Holds price, creator and locator per content id. Grants are never looked
//! up through the registry, so removing a content record does not revoke
//! access that was already sold.

use std::collections::BTreeMap;

use paywall_types::{AccountId, ContentId, MAX_LOCATOR_LEN};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// A priced unit of content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    pub creator: AccountId,
    /// Pay-per-view price in native currency units.
    pub price: u128,
    /// Where the content lives. Max 256 bytes.
    pub locator: String,
}

/// Registry of all priced content.
#[derive(Clone, Debug, Default)]
pub struct ContentRegistry {
    items: BTreeMap<ContentId, Content>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new content item.
    ///
    /// # Arguments
    ///
    /// * `caller` - Account invoking the operation
    /// * `owner` - Platform owner, who may register on a creator's behalf
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] if the locator exceeds 256 bytes
    /// - [`LedgerError::NotAuthorized`] if `caller` is neither `creator` nor `owner`
    /// - [`LedgerError::ContentExists`] if `id` is taken
    pub fn add(
        &mut self,
        caller: &AccountId,
        owner: &AccountId,
        id: ContentId,
        price: u128,
        creator: AccountId,
        locator: &str,
    ) -> Result<&Content> {
        if locator.len() > MAX_LOCATOR_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "locator is {} bytes, max {MAX_LOCATOR_LEN}",
                locator.len()
            )));
        }
        if caller != &creator && caller != owner {
            return Err(LedgerError::NotAuthorized(
                "only the creator or platform owner may add content".to_string(),
            ));
        }
        if self.items.contains_key(&id) {
            return Err(LedgerError::ContentExists(id));
        }

        tracing::info!(content_id = id, %creator, price, "content added");

        let content = Content {
            id,
            creator,
            price,
            locator: locator.to_string(),
        };
        Ok(self.items.entry(id).or_insert(content))
    }

    /// Look up a content item.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContentNotFound`] if absent
    pub fn get(&self, id: ContentId) -> Result<&Content> {
        self.items.get(&id).ok_or(LedgerError::ContentNotFound(id))
    }

    /// Creator of a content item, if registered.
    pub fn creator_of(&self, id: ContentId) -> Option<AccountId> {
        self.items.get(&id).map(|c| c.creator)
    }

    /// Change the price. Returns the previous price.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContentNotFound`] if absent
    /// - [`LedgerError::NotAuthorized`] if `caller` is not the creator
    pub fn update_price(
        &mut self,
        caller: &AccountId,
        id: ContentId,
        new_price: u128,
    ) -> Result<u128> {
        let content = self
            .items
            .get_mut(&id)
            .ok_or(LedgerError::ContentNotFound(id))?;
        if &content.creator != caller {
            return Err(LedgerError::NotAuthorized(
                "only the creator may change the price".to_string(),
            ));
        }

        let old_price = std::mem::replace(&mut content.price, new_price);
        tracing::info!(content_id = id, old_price, new_price, "content price updated");
        Ok(old_price)
    }

    /// Remove a content item's pricing record.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ContentNotFound`] if absent
    /// - [`LedgerError::NotAuthorized`] if `caller` is neither creator nor `owner`
    pub fn remove(
        &mut self,
        caller: &AccountId,
        owner: &AccountId,
        id: ContentId,
    ) -> Result<Content> {
        let content = self.get(id)?;
        if &content.creator != caller && caller != owner {
            return Err(LedgerError::NotAuthorized(
                "only the creator or platform owner may remove content".to_string(),
            ));
        }

        tracing::info!(content_id = id, removed_by = %caller, "content removed");
        self.items.remove(&id).ok_or(LedgerError::ContentNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All content ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Content> {
        self.items.values()
    }
}
