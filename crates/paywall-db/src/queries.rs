//! Database query functions organized by table.

pub mod gating_rules;
pub mod legacy_rules;

use paywall_types::ContractRef;

use crate::{DbError, Result};

/// Encode a `u128` amount as stored TEXT.
pub(crate) fn amount_to_sql(amount: u128) -> String {
    amount.to_string()
}

/// Decode a stored TEXT amount.
pub(crate) fn amount_from_sql(text: &str) -> Result<u128> {
    text.parse()
        .map_err(|_| DbError::Serialization(format!("invalid amount '{text}'")))
}

/// Decode a stored 32-byte reference.
pub(crate) fn contract_from_sql(bytes: Option<Vec<u8>>) -> Result<Option<ContractRef>> {
    bytes
        .map(|b| {
            <[u8; 32]>::try_from(b.as_slice())
                .map(ContractRef::from)
                .map_err(|_| DbError::Serialization(format!("reference is {} bytes", b.len())))
        })
        .transpose()
}
