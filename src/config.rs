use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct WikiConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API, without the trailing `/chat/completions`.
    pub api_base: String,
    pub model: String,
    /// File holding the API key. Takes precedence over `OPENAI_API_KEY`.
    pub api_key_file: String,
    /// Upper bound for one whole generation, retries included.
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    /// Ask the model for a short search digest after each article.
    pub summarize: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub context_articles: usize,
    pub home_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_wiki_dir()
            .join("articles.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            model: "gpt-4o".into(),
            api_key_file: "~/.openai".into(),
            timeout_secs: 90,
            max_retries: 1,
            temperature: 0.7,
            max_tokens: 2000,
            presence_penalty: 0.6,
            frequency_penalty: 0.6,
            summarize: true,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            context_articles: 3,
            home_limit: 50,
        }
    }
}

/// Returns `~/.wikiofbabel/`
pub fn default_wiki_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wikiofbabel")
}

/// Returns the default config file path: `~/.wikiofbabel/config.toml`
pub fn default_config_path() -> PathBuf {
    default_wiki_dir().join("config.toml")
}

impl WikiConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            WikiConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.storage.db_path = database_url_to_path(&val);
        }
        if let Ok(val) = std::env::var("WIKI_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("WIKI_PORT") {
            self.server.port = val
                .parse()
                .with_context(|| format!("WIKI_PORT is not a port number: {val}"))?;
        }
        if let Ok(val) = std::env::var("WIKI_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("OPENAI_BASE_URL") {
            self.generation.api_base = val;
        }
        if let Ok(val) = std::env::var("OPENAI_MODEL") {
            self.generation.model = val;
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl GenerationConfig {
    /// Resolve the API credential: the key file first, then `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        let key_file = expand_tilde(&self.api_key_file);
        if let Ok(contents) = std::fs::read_to_string(&key_file) {
            let key = contents.trim();
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
        std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Accepts `sqlite://path`, `sqlite:path` or a bare filesystem path.
fn database_url_to_path(url: &str) -> String {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
        .to_string()
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
