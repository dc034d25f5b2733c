//! Application configuration for ceofinder.
//!
//! User config lives at `~/.ceofinder/ceofinder.toml`. The file stores the
//! *names* of the environment variables holding provider API keys, never
//! the keys themselves. [`Credentials::from_env`] resolves them once at
//! process start into an explicit object that is passed by reference into
//! the run controller and provider construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CeoFinderError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "ceofinder.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ceofinder";

// ---------------------------------------------------------------------------
// Config structs (matching ceofinder.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Environment variable names for provider API keys.
    #[serde(default)]
    pub provider_keys: ProviderKeysConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Suffix appended to the input filename for the output file.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Attempts per provider call (1 initial + retries) for transient errors.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before a transient retry, in ms.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Minimum ms between calls to the same provider.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Consecutive permanent errors before a provider is disabled for the
    /// rest of the run.
    #[serde(default = "default_auth_failure_threshold")]
    pub auth_failure_threshold: u32,

    /// Persist the table after every N processed rows.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_suffix: default_output_suffix(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            rate_limit_ms: default_rate_limit(),
            auth_failure_threshold: default_auth_failure_threshold(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

fn default_output_suffix() -> String {
    "_with_ceos".into()
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_retry_backoff() -> u64 {
    500
}
fn default_rate_limit() -> u64 {
    1000
}
fn default_auth_failure_threshold() -> u32 {
    3
}
fn default_checkpoint_every() -> usize {
    3
}

/// `[provider_keys]` section — env var name per provider. The primary
/// model key is required to run; every other provider participates only
/// when its variable is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderKeysConfig {
    #[serde(default = "default_openai_env")]
    pub openai_env: String,
    #[serde(default = "default_anthropic_env")]
    pub anthropic_env: String,
    #[serde(default = "default_gemini_env")]
    pub gemini_env: String,
    #[serde(default = "default_google_search_env")]
    pub google_search_env: String,
    #[serde(default = "default_google_search_cx_env")]
    pub google_search_cx_env: String,
    #[serde(default = "default_hunter_env")]
    pub hunter_env: String,
    #[serde(default = "default_apollo_env")]
    pub apollo_env: String,
    #[serde(default = "default_rocketreach_env")]
    pub rocketreach_env: String,
}

impl Default for ProviderKeysConfig {
    fn default() -> Self {
        Self {
            openai_env: default_openai_env(),
            anthropic_env: default_anthropic_env(),
            gemini_env: default_gemini_env(),
            google_search_env: default_google_search_env(),
            google_search_cx_env: default_google_search_cx_env(),
            hunter_env: default_hunter_env(),
            apollo_env: default_apollo_env(),
            rocketreach_env: default_rocketreach_env(),
        }
    }
}

fn default_openai_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_anthropic_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_gemini_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_google_search_env() -> String {
    "GOOGLE_SEARCH_API_KEY".into()
}
fn default_google_search_cx_env() -> String {
    "GOOGLE_SEARCH_CX".into()
}
fn default_hunter_env() -> String {
    "HUNTER_API_KEY".into()
}
fn default_apollo_env() -> String {
    "APOLLO_API_KEY".into()
}
fn default_rocketreach_env() -> String {
    "ROCKETREACH_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Credentials (runtime, resolved once from the environment)
// ---------------------------------------------------------------------------

/// Resolved API keys for this process. Built once at startup; provider
/// adapters and the run controller receive this by reference and never
/// read the environment themselves.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub gemini: Option<String>,
    pub google_search: Option<String>,
    pub google_search_cx: Option<String>,
    pub hunter: Option<String>,
    pub apollo: Option<String>,
    pub rocketreach: Option<String>,
}

impl Credentials {
    /// Resolve every configured env var. Absent or empty variables become
    /// `None`, which excludes that provider from the priority order.
    pub fn from_env(config: &AppConfig) -> Self {
        let keys = &config.provider_keys;
        Self {
            openai: read_var(&keys.openai_env),
            anthropic: read_var(&keys.anthropic_env),
            gemini: read_var(&keys.gemini_env),
            google_search: read_var(&keys.google_search_env),
            google_search_cx: read_var(&keys.google_search_cx_env),
            hunter: read_var(&keys.hunter_env),
            apollo: read_var(&keys.apollo_env),
            rocketreach: read_var(&keys.rocketreach_env),
        }
    }

    /// Check the required primary model key is present.
    pub fn validate(&self, config: &AppConfig) -> Result<()> {
        if self.openai.is_none() {
            return Err(CeoFinderError::config(format!(
                "primary model API key not found. Set the {} environment variable.",
                config.provider_keys.openai_env
            )));
        }
        Ok(())
    }

    /// Number of resolved keys, for startup logging.
    pub fn active_count(&self) -> usize {
        [
            &self.openai,
            &self.anthropic,
            &self.gemini,
            &self.google_search,
            &self.google_search_cx,
            &self.hunter,
            &self.apollo,
            &self.rocketreach,
        ]
        .iter()
        .filter(|key| key.is_some())
        .count()
    }
}

fn read_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.ceofinder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CeoFinderError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.ceofinder/ceofinder.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
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
    let content = std::fs::read_to_string(path).map_err(|e| CeoFinderError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CeoFinderError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CeoFinderError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CeoFinderError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CeoFinderError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_suffix"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.retry_attempts, 2);
        assert_eq!(parsed.defaults.checkpoint_every, 3);
        assert_eq!(parsed.provider_keys.anthropic_env, "ANTHROPIC_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
rate_limit_ms = 250

[provider_keys]
openai_env = "MY_OPENAI_KEY"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.rate_limit_ms, 250);
        assert_eq!(config.defaults.retry_backoff_ms, 500);
        assert_eq!(config.provider_keys.openai_env, "MY_OPENAI_KEY");
        assert_eq!(config.provider_keys.hunter_env, "HUNTER_API_KEY");
    }

    #[test]
    fn credentials_require_primary_key() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.provider_keys.openai_env = "CEOFINDER_TEST_NONEXISTENT_KEY_12345".into();
        let creds = Credentials::from_env(&config);
        let result = creds.validate(&config);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("CEOFINDER_TEST_NONEXISTENT_KEY_12345")
        );
    }

    #[test]
    fn active_count_counts_present_keys() {
        let creds = Credentials {
            openai: Some("sk-test".into()),
            hunter: Some("h-test".into()),
            ..Default::default()
        };
        assert_eq!(creds.active_count(), 2);
    }
}
