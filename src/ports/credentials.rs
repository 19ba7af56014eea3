//! Credential storage port for user-supplied keys and tokens.

use serde::{Deserialize, Serialize};

/// Model selection saved alongside the credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name (e.g. `"openrouter"`).
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Provider-specific key.
    #[serde(default)]
    pub api_key: String,
}

/// Keys and tokens the user has supplied.
///
/// These only ever leave the process as request body fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// GitHub personal access token for private repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_pat: Option<String>,
    /// Model API key.
    #[serde(default, alias = "openrouter_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Saved model selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_config: Option<ModelConfig>,
}

/// Loads and saves [`Credentials`].
pub trait CredentialStore: Send + Sync {
    /// Reads the saved credentials; an absent store yields the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read or parsed.
    fn load(&self) -> Result<Credentials, Box<dyn std::error::Error + Send + Sync>>;

    /// Replaces the saved credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, credentials: &Credentials) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
