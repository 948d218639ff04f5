//! # Block Defaults Core
//!
//! Session state and persistence for per-block-type default settings.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   ConfigurationStore                      │
//! │  ┌──────────────┐ ┌──────────────┐ ┌───────────────────┐ │
//! │  │ Session state│ │   EventBus   │ │ ConfigurationMap  │ │
//! │  └──────────────┘ └──────────────┘ └───────────────────┘ │
//! │         │                                  │              │
//! │  ┌──────┴───────────────────┐    apply_field / resolve   │
//! │  │   PersistenceGateway     │    (blockdefaults-model)   │
//! │  │  ┌────────┐ ┌─────────┐  │                            │
//! │  │  │ Memory │ │  File   │  │                            │
//! │  │  └────────┘ └─────────┘  │                            │
//! │  └──────────────────────────┘                            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Learning: Injected Capabilities
//!
//! The store never knows where settings live. It receives an
//! `Arc<dyn PersistenceGateway>` at construction, so tests hand it an
//! in-memory gateway and the CLI hands it a file-backed one.

pub mod config;
pub mod event;
pub mod gateway;
pub mod schema;
pub mod store;

pub use blockdefaults_model::{
    BlockSettings, BlockTypeId, ConfigurationMap, EncodingError, FieldKey, FieldValue, LoadError,
    SaveError,
};
pub use config::AppConfig;
pub use event::{EventBus, StoreEvent};
pub use gateway::{FileGateway, MemoryGateway, PersistenceGateway};
pub use schema::{BlockSchema, FieldSpec, SchemaRegistry};
pub use store::{
    ConfigurationStore, SaveCompletion, SaveId, SaveOutcome, SaveRequest, SessionState,
    StoreState,
};

/// Result type for store operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("The editing surface is not open")]
    NotOpen,

    #[error("Save {0} is not the save in flight")]
    UnknownSave(SaveId),

    #[error("Save failed: {0}")]
    Save(#[from] SaveError),
}
