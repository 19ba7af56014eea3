//! File-backed adapter for the `CredentialStore` port.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ports::credentials::{CredentialStore, Credentials};
use crate::ports::filesystem::FileSystem;

/// Stores credentials as YAML at a fixed path through the `FileSystem` port.
pub struct FileCredentialStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store persisting to `path`.
    pub fn new(fs: Arc<dyn FileSystem>, path: &Path) -> Self {
        Self { fs, path: path.to_path_buf() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Credentials, Box<dyn std::error::Error + Send + Sync>> {
        if !self.fs.exists(&self.path) {
            return Ok(Credentials::default());
        }
        let contents = self.fs.read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Credentials::default());
        }
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse credentials {}: {e}", self.path.display()).into())
    }

    fn save(
        &self,
        credentials: &Credentials,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let yaml = serde_yaml::to_string(credentials)
            .map_err(|e| format!("Failed to serialize credentials: {e}"))?;
        self.fs.write(&self.path, &yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::filesystem::LiveFileSystem;
    use crate::ports::credentials::ModelConfig;

    #[test]
    fn missing_file_loads_defaults() {
        let store = FileCredentialStore::new(
            Arc::new(LiveFileSystem),
            Path::new("/nonexistent/gitdiagram/credentials.yaml"),
        );
        assert_eq!(store.load().unwrap(), Credentials::default());
    }

    #[test]
    fn save_then_load_keeps_all_fields() {
        let dir = std::env::temp_dir().join("gitdiagram_credentials_test");
        let _ = std::fs::remove_dir_all(&dir);
        let store = FileCredentialStore::new(Arc::new(LiveFileSystem), &dir.join("credentials.yaml"));

        let creds = Credentials {
            github_pat: Some("ghp_123".into()),
            api_key: Some("sk-or-456".into()),
            model_config: Some(ModelConfig {
                provider: "openrouter".into(),
                model: "deepseek/deepseek-chat-v3-0324:free".into(),
                api_key: String::new(),
            }),
        };
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), creds);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn legacy_openrouter_key_is_read_as_api_key() {
        let creds: Credentials = serde_yaml::from_str("openrouter_key: sk-or-legacy\n").unwrap();
        assert_eq!(creds.api_key.as_deref(), Some("sk-or-legacy"));
    }
}
