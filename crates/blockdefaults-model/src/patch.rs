//! Pure updates of a configuration map.
//!
//! ## Learning: Persistent Updates with `Arc`
//!
//! Cloning a `BTreeMap<_, Arc<_>>` copies the tree nodes but only bumps the
//! reference count of each entry. Replacing one key in the clone therefore
//! leaves every other entry pointing at the same allocation as before, which
//! is what lets callers detect "this block changed" with `Arc::ptr_eq`.

use crate::value::{BlockSettings, BlockTypeId, ConfigurationMap, FieldKey, FieldValue};

/// Returns a copy of `map` with one field of one block type updated.
///
/// `Some(value)` sets the field; `None` removes it so reads fall back to the
/// default again. The block type gets an entry even if it had none before.
pub fn apply_field(
    map: &ConfigurationMap,
    block_type: impl Into<BlockTypeId>,
    field: impl Into<FieldKey>,
    value: Option<FieldValue>,
) -> ConfigurationMap {
    let block_type = block_type.into();
    let field = field.into();

    let mut settings = map
        .settings(block_type.as_str())
        .cloned()
        .unwrap_or_default();
    match value {
        Some(value) => {
            settings.insert(field, value);
        }
        None => {
            settings.remove(&field);
        }
    }

    replace_block(map, block_type, settings)
}

/// Returns a copy of `map` with one block type's settings replaced wholesale.
pub fn replace_block(
    map: &ConfigurationMap,
    block_type: impl Into<BlockTypeId>,
    settings: BlockSettings,
) -> ConfigurationMap {
    let mut next = map.clone();
    next.put(block_type.into(), settings);
    next
}
