//! Persisted key/value configuration.
//!
//! Configuration is a flat TOML table stored at `~/.mdai/config.toml`
//! (overridable with `--config`). It is loaded once per command invocation
//! into a [`ConfigStore`] and turned into typed [`Settings`], which are then
//! passed explicitly to whatever needs them.
//!
//! ```toml
//! provider = "anthropic"
//! model = "claude-3-5-haiku-latest"
//! token_budget = "8000"
//! ```
//!
//! Values are kept as strings. Non-string TOML scalars (`token_budget = 8000`)
//! are accepted on load and stringified.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A configuration key known to mdai.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Default shown by `config list`; `None` when the default depends on
    /// another key (e.g. the provider).
    pub default: Option<&'static str>,
    /// Secret values are masked when listed.
    pub secret: bool,
}

const fn key(
    name: &'static str,
    description: &'static str,
    default: Option<&'static str>,
    secret: bool,
) -> KeySpec {
    KeySpec {
        name,
        description,
        default,
        secret,
    }
}

/// Every key accepted by `mdai config set`.
pub const KEYS: &[KeySpec] = &[
    key("provider", "LLM provider: openai, anthropic, gemini, ollama", Some("openai"), false),
    key("model", "Model identifier (defaults per provider)", None, false),
    key("base_url", "Endpoint override (defaults per provider)", None, false),
    key("openai_api_key", "OpenAI API key (or OPENAI_API_KEY)", None, true),
    key("anthropic_api_key", "Anthropic API key (or ANTHROPIC_API_KEY)", None, true),
    key("gemini_api_key", "Gemini API key (or GEMINI_API_KEY)", None, true),
    key("temperature", "Sampling temperature, 0.0 to 2.0", Some("0.3"), false),
    key("max_output_tokens", "Maximum tokens per response", Some("4096"), false),
    key("timeout_secs", "HTTP timeout per request", Some("180"), false),
    key("token_budget", "Estimated tokens above which input is chunked", Some("8000"), false),
    key("chunk_delay_ms", "Pause between chunk requests", Some("1000"), false),
    key("file_delay_ms", "Pause between files", Some("500"), false),
    key(
        "max_file_bytes",
        "Files larger than this are skipped in multi-file runs",
        Some("1048576"),
        false,
    ),
    key("combine_threshold", "File count above which summaries are combined", Some("5"), false),
    key("backup", "Back up files before edit replaces them", Some("true"), false),
];

/// Look up a key specification by name.
pub fn key_spec(name: &str) -> Option<&'static KeySpec> {
    KEYS.iter().find(|k| k.name == name)
}

/// Default configuration file location: `~/.mdai/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".mdai").join("config.toml"))
}

/// The flat key/value store, tied to the file it was loaded from.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    /// An empty store that is never written to disk (used by tests).
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                values: BTreeMap::new(),
            });
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let table: BTreeMap<String, toml::Value> = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let mut values = BTreeMap::new();
        for (name, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => bail!(
                    "config key '{}' must be a string, number, or boolean, found {}",
                    name,
                    other.type_str()
                ),
            };
            values.insert(name, value);
        }

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// Write the store back to the file it was loaded from.
    pub fn save(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            bail!("in-memory configuration cannot be saved");
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }
        let content = toml::to_string(&self.values)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Set a known key after checking that the resulting configuration is valid.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        if key_spec(name).is_none() {
            let known: Vec<&str> = KEYS.iter().map(|k| k.name).collect();
            bail!("Unknown config key: '{}'. Known keys: {}", name, known.join(", "));
        }

        let mut candidate = self.clone();
        candidate.values.insert(name.to_string(), value.to_string());
        Settings::from_store_with_env(&candidate, |_| None)
            .with_context(|| format!("Invalid value for '{}': {}", name, value))?;

        self.values = candidate.values;
        Ok(())
    }

    /// Remove a key. Returns whether it was present.
    pub fn unset(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-haiku-latest",
            Provider::Gemini => "gemini-1.5-flash",
            Provider::Ollama => "llama3.1",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com",
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::Ollama => "http://localhost:11434",
        }
    }

    /// Config key and environment variable holding the API key, if one is needed.
    pub fn api_key_source(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Provider::OpenAi => Some(("openai_api_key", "OPENAI_API_KEY")),
            Provider::Anthropic => Some(("anthropic_api_key", "ANTHROPIC_API_KEY")),
            Provider::Gemini => Some(("gemini_api_key", "GEMINI_API_KEY")),
            Provider::Ollama => None,
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "gemini" | "google" => Ok(Provider::Gemini),
            "ollama" => Ok(Provider::Ollama),
            other => bail!(
                "Unknown provider: '{}'. Must be openai, anthropic, gemini, or ollama.",
                other
            ),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for the LLM access layer.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

/// Settings for chunked and multi-file summarization.
#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub token_budget: usize,
    pub chunk_delay_ms: u64,
    pub file_delay_ms: u64,
    pub max_file_bytes: u64,
    pub combine_threshold: usize,
}

/// Typed, validated view of a [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub summary: SummarySettings,
    pub backup: bool,
}

impl Settings {
    /// Build settings from the store, reading API keys from the process
    /// environment when the store does not hold one.
    pub fn from_store(store: &ConfigStore) -> Result<Self> {
        Self::from_store_with_env(store, |name| std::env::var(name).ok())
    }

    /// Build settings from the store with an injected environment lookup.
    pub fn from_store_with_env(
        store: &ConfigStore,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let provider: Provider = store.get("provider").unwrap_or("openai").parse()?;

        let model = non_empty(store.get("model"))
            .unwrap_or(provider.default_model())
            .to_string();
        let base_url = non_empty(store.get("base_url"))
            .unwrap_or(provider.default_base_url())
            .trim_end_matches('/')
            .to_string();
        let api_key = provider.api_key_source().and_then(|(config_key, env_var)| {
            non_empty(store.get(config_key))
                .map(str::to_string)
                .or_else(|| env(env_var).filter(|v| !v.is_empty()))
        });

        let temperature: f32 = parse_key(store, "temperature", 0.3)?;
        let max_output_tokens: u32 = parse_key(store, "max_output_tokens", 4096)?;
        let timeout_secs: u64 = parse_key(store, "timeout_secs", 180)?;
        let token_budget: usize = parse_key(store, "token_budget", 8000)?;
        let chunk_delay_ms: u64 = parse_key(store, "chunk_delay_ms", 1000)?;
        let file_delay_ms: u64 = parse_key(store, "file_delay_ms", 500)?;
        let max_file_bytes: u64 = parse_key(store, "max_file_bytes", 1_048_576)?;
        let combine_threshold: usize = parse_key(store, "combine_threshold", 5)?;
        let backup: bool = parse_key(store, "backup", true)?;

        if !(0.0..=2.0).contains(&temperature) {
            bail!("temperature must be in [0.0, 2.0]");
        }
        if max_output_tokens == 0 {
            bail!("max_output_tokens must be > 0");
        }
        if timeout_secs == 0 {
            bail!("timeout_secs must be > 0");
        }
        if token_budget == 0 {
            bail!("token_budget must be > 0");
        }
        if max_file_bytes == 0 {
            bail!("max_file_bytes must be > 0");
        }

        Ok(Self {
            llm: LlmSettings {
                provider,
                model,
                base_url,
                api_key,
                temperature,
                max_output_tokens,
                timeout_secs,
            },
            summary: SummarySettings {
                token_budget,
                chunk_delay_ms,
                file_delay_ms,
                max_file_bytes,
                combine_threshold,
            },
            backup,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_key<T>(store: &ConfigStore, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match non_empty(store.get(name)) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a valid value ('{}'): {}", name, raw, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_store_with_env(&ConfigStore::in_memory(), no_env).unwrap();
        assert_eq!(settings.llm.provider, Provider::OpenAi);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.base_url, "https://api.openai.com");
        assert!(settings.llm.api_key.is_none());
        assert_eq!(settings.summary.token_budget, 8000);
        assert_eq!(settings.summary.combine_threshold, 5);
        assert!(settings.backup);
    }

    #[test]
    fn test_provider_changes_defaults() {
        let mut store = ConfigStore::in_memory();
        store.set("provider", "ollama").unwrap();
        let settings = Settings::from_store_with_env(&store, no_env).unwrap();
        assert_eq!(settings.llm.provider, Provider::Ollama);
        assert_eq!(settings.llm.model, "llama3.1");
        assert_eq!(settings.llm.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_api_key_prefers_store_over_env() {
        let mut store = ConfigStore::in_memory();
        store.set("provider", "anthropic").unwrap();
        let env = |name: &str| (name == "ANTHROPIC_API_KEY").then(|| "from-env".to_string());

        let settings = Settings::from_store_with_env(&store, env).unwrap();
        assert_eq!(settings.llm.api_key.as_deref(), Some("from-env"));

        store.set("anthropic_api_key", "from-store").unwrap();
        let settings = Settings::from_store_with_env(&store, env).unwrap();
        assert_eq!(settings.llm.api_key.as_deref(), Some("from-store"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut store = ConfigStore::in_memory();
        store.set("base_url", "http://127.0.0.1:8080/").unwrap();
        let settings = Settings::from_store_with_env(&store, no_env).unwrap();
        assert_eq!(settings.llm.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let mut store = ConfigStore::in_memory();
        let err = store.set("colour", "blue").unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut store = ConfigStore::in_memory();
        assert!(store.set("provider", "mystery").is_err());
        assert!(store.set("token_budget", "0").is_err());
        assert!(store.set("token_budget", "lots").is_err());
        assert!(store.set("temperature", "3.5").is_err());
        assert!(store.set("backup", "maybe").is_err());
        // Rejected values leave the store untouched.
        assert!(store.get("provider").is_none());
        assert!(store.get("token_budget").is_none());
    }

    #[test]
    fn test_unset() {
        let mut store = ConfigStore::in_memory();
        store.set("model", "gpt-4o").unwrap();
        assert!(store.unset("model"));
        assert!(!store.unset("model"));
        assert!(store.get("model").is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.iter().count(), 0);
        store.set("provider", "gemini").unwrap();
        store.set("token_budget", "1200").unwrap();
        store.save().unwrap();

        let loaded = ConfigStore::load(&path).unwrap();
        assert_eq!(loaded.get("provider"), Some("gemini"));
        assert_eq!(loaded.get("token_budget"), Some("1200"));
    }

    #[test]
    fn test_load_accepts_non_string_scalars() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "token_budget = 500\nbackup = false\ntemperature = 0.7\n").unwrap();

        let store = ConfigStore::load(&path).unwrap();
        let settings = Settings::from_store_with_env(&store, no_env).unwrap();
        assert_eq!(settings.summary.token_budget, 500);
        assert!(!settings.backup);
        assert!((settings.llm.temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_load_rejects_tables() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[llm]\nprovider = \"openai\"\n").unwrap();
        assert!(ConfigStore::load(&path).is_err());
    }

    #[test]
    fn test_in_memory_store_cannot_be_saved() {
        assert!(ConfigStore::in_memory().save().is_err());
    }
}
