//! Blob encoding for persistence.
//!
//! The whole map travels as one JSON string stored under a single setting
//! key. Block types and fields are kept in sorted order, so the same map
//! always produces the same blob.

use crate::value::ConfigurationMap;
use crate::{EncodingError, LoadError};

/// Encodes the full map as a JSON blob.
pub fn encode(map: &ConfigurationMap) -> Result<String, EncodingError> {
    Ok(serde_json::to_string(map)?)
}

/// Decodes a stored blob.
///
/// An empty blob or a JSON `null` means nothing has been saved yet.
pub fn decode(blob: &str) -> Result<ConfigurationMap, LoadError> {
    if blob.trim().is_empty() {
        return Ok(ConfigurationMap::new());
    }
    let map: Option<ConfigurationMap> = serde_json::from_str(blob)?;
    Ok(map.unwrap_or_default())
}
