//! Application configuration for DeepCut.
//!
//! User config lives at `~/.deepcut/deepcut.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never written to the file; it only names the environment
//! variables that hold them, and [`Secrets::resolve`] reads them once at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeepCutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "deepcut.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".deepcut";

// ---------------------------------------------------------------------------
// Config structs (matching deepcut.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Idea database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Text-generation service settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Scheduled-trigger settings.
    #[serde(default)]
    pub cron: CronConfig,

    /// Email notifier settings.
    #[serde(default)]
    pub email: EmailConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the libSQL database file (`~` is expanded).
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.deepcut/deepcut.db".into()
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_generation_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Model used for every stage.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on completion tokens per stage.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_generation_key_env(),
            base_url: default_generation_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_generation_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_generation_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_max_tokens() -> u32 {
    4096
}

/// `[cron]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    /// Name of the env var holding the shared secret for the daily trigger.
    #[serde(default = "default_cron_secret_env")]
    pub secret_env: String,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            secret_env: default_cron_secret_env(),
        }
    }
}

fn default_cron_secret_env() -> String {
    "CRON_SECRET".into()
}

/// `[email]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Name of the env var holding the Resend API key. Unset disables email.
    #[serde(default = "default_email_key_env")]
    pub api_key_env: String,

    /// Base URL of the Resend API.
    #[serde(default = "default_email_base_url")]
    pub base_url: String,

    /// Sender, e.g. `DeepCut <onboarding@resend.dev>`.
    #[serde(default = "default_from")]
    pub from: String,

    /// Recipients of the daily digest.
    #[serde(default)]
    pub to: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_email_key_env(),
            base_url: default_email_base_url(),
            from: default_from(),
            to: Vec::new(),
        }
    }
}

fn default_email_key_env() -> String {
    "RESEND_API_KEY".into()
}
fn default_email_base_url() -> String {
    "https://api.resend.com".into()
}
fn default_from() -> String {
    "DeepCut <onboarding@resend.dev>".into()
}

// ---------------------------------------------------------------------------
// Secrets (runtime, resolved once from the environment)
// ---------------------------------------------------------------------------

/// Secret values resolved from the environment variables named in [`AppConfig`].
///
/// Constructed once at startup and handed to the collaborators that need it,
/// so nothing downstream reads process environment ad hoc.
#[derive(Clone, Default)]
pub struct Secrets {
    /// API key for the generation service.
    pub generation_api_key: String,
    /// Shared secret for the automated trigger. `None` rejects every automated call.
    pub cron_secret: Option<String>,
    /// Resend API key. `None` disables email.
    pub email_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("generation_api_key", &"<redacted>")
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "<redacted>"))
            .field("email_api_key", &self.email_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    /// Read all secrets from the process environment.
    ///
    /// Fails only when the generation API key is missing; the optional
    /// secrets resolve to `None` when their variable is unset or empty.
    pub fn resolve(config: &AppConfig) -> Result<Self> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve secrets through an arbitrary lookup (tests, alternative sources).
    pub fn resolve_with(
        config: &AppConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let var_name = &config.generation.api_key_env;
        let generation_api_key = non_empty(var_name).ok_or_else(|| {
            DeepCutError::config(format!(
                "generation API key not found. Set the {var_name} environment variable."
            ))
        })?;

        let cron_secret = non_empty(&config.cron.secret_env);
        if cron_secret.is_none() {
            tracing::warn!(
                var = %config.cron.secret_env,
                "cron secret not set; the daily trigger will reject all requests"
            );
        }

        Ok(Self {
            generation_api_key,
            cron_secret,
            email_api_key: non_empty(&config.email.api_key_env),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.deepcut/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DeepCutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.deepcut/deepcut.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| DeepCutError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DeepCutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DeepCutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DeepCutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DeepCutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DeepCutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
