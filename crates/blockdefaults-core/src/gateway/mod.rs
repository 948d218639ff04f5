//! Persistence gateways.
//!
//! ## Learning: `async_trait` and Trait Objects
//!
//! Native `async fn` in traits can't be called through `dyn Trait` yet.
//! `#[async_trait]` rewrites each method to return a boxed future, which
//! makes `Arc<dyn PersistenceGateway>` possible and keeps the futures `Send`
//! so a save can run on a spawned task.

mod file;
mod memory;

pub use file::FileGateway;
pub use memory::MemoryGateway;

use async_trait::async_trait;
use blockdefaults_model::{ConfigurationMap, LoadError, SaveError};

/// Setting key the configuration blob is stored under.
pub const DEFAULT_SETTING_KEY: &str = "kadence_blocks_config_blocks";

/// Where the configuration map lives between sessions.
///
/// Implementations encode the whole map into one blob on every save and
/// decode it on every load. There is no partial-field protocol and no retry.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Fetches the stored map, or `None` if nothing has been saved yet.
    async fn load(&self) -> Result<Option<ConfigurationMap>, LoadError>;

    /// Stores the full map as one atomic payload.
    async fn save(&self, map: &ConfigurationMap) -> Result<(), SaveError>;
}
