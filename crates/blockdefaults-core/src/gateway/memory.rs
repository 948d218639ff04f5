use async_trait::async_trait;
use blockdefaults_model::{ConfigurationMap, EncodingError, LoadError, SaveError, decode, encode};
use tokio::sync::Mutex;

use super::PersistenceGateway;

/// Gateway that keeps the encoded blob in memory.
///
/// Goes through the same encode/decode path as a real backend, so what a
/// test reads back is what a server would have received.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    blob: Option<String>,
    saves: usize,
    fail_next_save: Option<String>,
}

impl MemoryGateway {
    /// Creates a gateway with nothing stored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway holding a raw blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                blob: Some(blob.into()),
                ..MemoryState::default()
            }),
        }
    }

    /// Creates a gateway holding an encoded map.
    pub fn with_map(map: &ConfigurationMap) -> Result<Self, EncodingError> {
        Ok(Self::with_blob(encode(map)?))
    }

    /// Returns the stored blob.
    pub async fn blob(&self) -> Option<String> {
        self.state.lock().await.blob.clone()
    }

    /// Returns how many saves have been attempted.
    pub async fn save_count(&self) -> usize {
        self.state.lock().await.saves
    }

    /// Makes the next save fail with the given reason.
    pub async fn fail_next_save(&self, reason: impl Into<String>) {
        self.state.lock().await.fail_next_save = Some(reason.into());
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn load(&self) -> Result<Option<ConfigurationMap>, LoadError> {
        match self.state.lock().await.blob.as_deref() {
            Some(blob) => decode(blob).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, map: &ConfigurationMap) -> Result<(), SaveError> {
        let mut state = self.state.lock().await;
        state.saves += 1;
        if let Some(reason) = state.fail_next_save.take() {
            return Err(SaveError::Rejected(reason));
        }
        state.blob = Some(encode(map)?);
        Ok(())
    }
}
