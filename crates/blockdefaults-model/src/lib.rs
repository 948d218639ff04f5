//! # Block Defaults Model
//!
//! Data types and pure transforms for per-block-type default settings.
//!
//! ## Key Concepts for Learning Rust
//!
//! ### Immutable Updates
//! - `apply_field` never mutates its input; it returns a new `ConfigurationMap`
//! - Untouched block entries are shared through `Arc`, so a patch only
//!   allocates the one entry it changes
//! - Callers detect changes with `Arc::ptr_eq` instead of deep comparison
//!
//! ### Presence, not Truthiness
//! - `resolve` falls back only when a field is missing
//! - `0`, `false` and `""` are real overrides

mod codec;
mod patch;
mod resolve;
mod value;

pub use codec::{decode, encode};
pub use patch::{apply_field, replace_block};
pub use resolve::{lookup, resolve};
pub use value::{BlockSettings, BlockTypeId, ConfigurationMap, FieldKey, FieldValue};

/// Errors raised while fetching or decoding a stored configuration.
///
/// The store never treats these as fatal; a failed load starts the session
/// from an empty map.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Setting {key} does not hold a string blob")]
    NotABlob { key: String },
}

/// Errors raised by a single save attempt.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Save rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// The configuration map could not be serialized.
///
/// Well-typed field values always encode, so this signals a broken contract
/// rather than a runtime condition worth retrying.
#[derive(Debug, thiserror::Error)]
#[error("Failed to encode configuration: {0}")]
pub struct EncodingError(#[from] serde_json::Error);
