//! Configuration value types.
//!
//! ## Learning: Newtypes and `Borrow`
//!
//! `BlockTypeId` wraps a `String` so a block type can't be confused with a
//! field key. Implementing `Borrow<str>` lets a `BTreeMap<BlockTypeId, _>` be
//! queried with a plain `&str`, the same way `HashMap<String, _>` can.
//!
//! ## Learning: `#[serde(untagged)]`
//!
//! Stored values are plain JSON with no type tag. An untagged enum tries each
//! variant in order and keeps the first one that fits, so `true` becomes
//! `Bool`, `4` becomes `Number` and `[0, 0, 0, 0]` becomes `Numbers`. Anything
//! else lands in `Opaque` untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifies a block type, e.g. `"kadence/advancedheading"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockTypeId(String);

impl BlockTypeId {
    /// Creates a block type identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BlockTypeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BlockTypeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockTypeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockTypeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&BlockTypeId> for BlockTypeId {
    fn from(id: &BlockTypeId) -> Self {
        id.clone()
    }
}

impl fmt::Display for BlockTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Names one property inside a block type's settings.
pub type FieldKey = String;

/// A single stored property value.
///
/// The store never inspects these; the presentation layer decides what a
/// field's value means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(Number),
    Text(String),
    /// Ordered numbers, e.g. a `[top, right, bottom, left]` padding.
    Numbers(Vec<Number>),
    /// Any other JSON shape found in a stored blob, kept verbatim.
    Opaque(Value),
}

impl FieldValue {
    /// Builds a number sequence value.
    pub fn numbers<I, N>(values: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Number>,
    {
        Self::Numbers(values.into_iter().map(Into::into).collect())
    }

    /// Returns the text if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the number as `f64` if this is a numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the flag if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts into a plain JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(text) => Value::String(text.clone()),
            Self::Numbers(numbers) => {
                Value::Array(numbers.iter().cloned().map(Value::Number).collect())
            }
            Self::Opaque(value) => value.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        Self::Number(n.into())
    }
}

/// Non-finite floats have no JSON form and become `null`.
impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Self::Opaque(Value::Null), Self::Number)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Field values for one block type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockSettings(BTreeMap<FieldKey, FieldValue>);

impl BlockSettings {
    /// Creates empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a field's value if present.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Returns true if the field is present, whatever its value.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<FieldKey>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(field.into(), value)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<FieldKey>> FromIterator<(K, FieldValue)> for BlockSettings {
    fn from_iter<T: IntoIterator<Item = (K, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Settings for every configured block type.
///
/// This is the unit of persistence: the whole map is encoded and saved at
/// once. Entries sit behind `Arc` so cloning the map (for a save snapshot or
/// a patch) shares every entry instead of copying it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationMap(BTreeMap<BlockTypeId, Arc<BlockSettings>>);

impl ConfigurationMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the settings for a block type, if it has any.
    pub fn settings(&self, block_type: &str) -> Option<&BlockSettings> {
        self.0.get(block_type).map(Arc::as_ref)
    }

    /// Returns the shared entry for a block type.
    ///
    /// Useful for identity checks with `Arc::ptr_eq`.
    pub fn entry(&self, block_type: &str) -> Option<&Arc<BlockSettings>> {
        self.0.get(block_type)
    }

    /// Iterates configured block types in order.
    pub fn block_types(&self) -> impl Iterator<Item = &BlockTypeId> {
        self.0.keys()
    }

    /// Iterates entries in block type order.
    pub fn iter(&self) -> impl Iterator<Item = (&BlockTypeId, &BlockSettings)> {
        self.0.iter().map(|(id, settings)| (id, settings.as_ref()))
    }

    pub fn contains(&self, block_type: &str) -> bool {
        self.0.contains_key(block_type)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replaces one entry. Only the patch module builds new maps.
    pub(crate) fn put(&mut self, block_type: BlockTypeId, settings: BlockSettings) {
        self.0.insert(block_type, Arc::new(settings));
    }
}
