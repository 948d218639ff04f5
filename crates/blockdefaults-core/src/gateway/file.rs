//! Settings document on disk.
//!
//! The document is a JSON object of setting keys to values, the same shape a
//! site settings endpoint exposes. The configuration map is one string entry
//! in it; other entries are left alone.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use blockdefaults_model::{ConfigurationMap, EncodingError, LoadError, SaveError, decode, encode};
use serde_json::{Map, Value};

use super::{DEFAULT_SETTING_KEY, PersistenceGateway};

/// Gateway backed by a JSON settings file.
#[derive(Debug, Clone)]
pub struct FileGateway {
    path: PathBuf,
    setting_key: String,
}

impl FileGateway {
    /// Creates a gateway using the default setting key.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_setting_key(path, DEFAULT_SETTING_KEY)
    }

    /// Creates a gateway storing the blob under a custom key.
    pub fn with_setting_key(path: impl Into<PathBuf>, setting_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            setting_key: setting_key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn setting_key(&self) -> &str {
        &self.setting_key
    }

    /// Reads the settings document. A missing or empty file is an empty document.
    async fn read_document(&self) -> Result<Map<String, Value>, LoadError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    async fn load(&self) -> Result<Option<ConfigurationMap>, LoadError> {
        let document = self.read_document().await?;
        match document.get(&self.setting_key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(blob)) => decode(blob).map(Some),
            Some(_) => Err(LoadError::NotABlob {
                key: self.setting_key.clone(),
            }),
        }
    }

    async fn save(&self, map: &ConfigurationMap) -> Result<(), SaveError> {
        let mut document = self.read_document().await.map_err(|e| match e {
            LoadError::Io(io) => SaveError::Io(io),
            other => SaveError::Rejected(format!(
                "settings file {} is unreadable: {}",
                self.path.display(),
                other
            )),
        })?;
        document.insert(self.setting_key.clone(), Value::String(encode(map)?));
        let content = serde_json::to_string_pretty(&document).map_err(EncodingError::from)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write beside the target and rename, so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), key = %self.setting_key, "Wrote settings file");
        Ok(())
    }
}
