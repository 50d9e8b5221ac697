mod env_manager;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GeneratorError, Result};

pub use env_manager::{get_env_value, ApiKeys};

/// Main configuration struct for the application
///
/// Every section falls back to its defaults when absent from the TOML file,
/// and API keys plus a few deployment knobs can be overridden through the
/// environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub API settings
    pub github: GitHubSettings,
    /// Generative language API settings
    pub generator: GeneratorSettings,
    /// Ingestion limits and file allowlist
    pub ingestion: IngestionSettings,
    /// Prompt section policy
    pub prompt: PromptSettings,
    /// Result cache settings
    pub cache: CacheSettings,
    /// Document store settings
    pub storage: StorageSettings,
    /// Web server settings
    pub server: ServerSettings,
}

/// GitHub API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// REST API base URL
    pub api_base: String,
    /// Personal access token, required for publishing
    pub token: Option<String>,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request timeout for metadata and tree calls
    pub timeout_secs: u64,
}

/// Generative language API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// API base URL
    pub api_base: String,
    /// Model name
    pub model: String,
    /// API key
    pub api_key: Option<String>,
    /// Timeout for a single generation call
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Maximum output length in tokens
    pub max_output_tokens: u32,
}

/// Ingestion limits and file allowlist
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Maximum number of file previews per repository
    pub max_files: usize,
    /// Maximum characters kept from each file
    pub max_chars_per_file: usize,
    /// Extensions (without dot) or exact file names worth previewing
    pub allowlist: Vec<String>,
    /// Maximum repositories summarized for a profile
    pub profile_repo_limit: usize,
}

/// Section lists embedded into prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Sections a repository README must contain, in order
    pub required_sections: Vec<String>,
    /// Sections the generator must leave out
    pub excluded_sections: Vec<String>,
    /// Sections a profile README must contain, in order
    pub profile_sections: Vec<String>,
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Time-to-live of a cached document in seconds
    pub ttl_secs: u64,
}

/// Document store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database file
    pub database_path: PathBuf,
}

/// Web server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub bind: String,
    /// Number of recent documents shown on the home page
    pub recent_limit: u32,
    /// Origins allowed to call the JSON endpoints from a browser
    pub allowed_origins: Vec<String>,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: None,
            user_agent: concat!("readmegen/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            timeout_secs: 60,
            temperature: 0.7,
            top_p: 0.9,
            max_output_tokens: 2000,
        }
    }
}

impl Default for IngestionSettings {
    fn default() -> Self {
        let allowlist = [
            "py", "js", "ts", "json", "html", "css", "md", "txt", "yml", "yaml",
            "Dockerfile", "Makefile", "requirements.txt", "setup.py", "package.json",
            "docker-compose.yml", "config.json", ".env.example",
        ];
        Self {
            max_files: 25,
            max_chars_per_file: 1500,
            allowlist: allowlist.iter().map(|s| s.to_string()).collect(),
            profile_repo_limit: 30,
        }
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            required_sections: strings(&[
                "Project title",
                "Description",
                "Features",
                "Folder structure",
                "Build and installation steps",
                "Run and usage steps",
                "Technologies used (as a table)",
            ]),
            excluded_sections: strings(&["Badges", "License", "Contributing", "External links"]),
            profile_sections: strings(&[
                "Introduction",
                "About me",
                "Tech stack (as a table)",
                "Featured projects",
                "GitHub stats",
                "Contact",
            ]),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 24 * 60 * 60 }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { database_path: PathBuf::from("data/readmegen.db") }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            recent_limit: 5,
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the default config file location
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error. Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| GeneratorError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// `<config dir>/readmegen/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("readmegen").join("config.toml"))
    }

    /// Applies environment overrides on top of the file values
    pub fn apply_env(&mut self) {
        // Environment wins over the file for secrets.
        let mut keys = ApiKeys::from_env();
        keys.merge_missing(ApiKeys {
            github_token: self.github.token.take(),
            gemini_api_key: self.generator.api_key.take(),
        });
        self.github.token = keys.github_token;
        self.generator.api_key = keys.gemini_api_key;

        if let Some(base) = get_env_value("GITHUB_API_BASE_URL") {
            self.github.api_base = base;
        }
        if let Some(base) = get_env_value("GEMINI_API_BASE_URL") {
            self.generator.api_base = base;
        }
        if let Some(model) = get_env_value("GEMINI_MODEL") {
            self.generator.model = model;
        }
        if let Some(path) = get_env_value("READMEGEN_DATABASE") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(bind) = get_env_value("READMEGEN_BIND") {
            self.server.bind = bind;
        }
    }

    /// Rejects limits that would make the pipeline useless
    pub fn validate(&self) -> Result<()> {
        if self.ingestion.max_files == 0 {
            return Err(GeneratorError::Config("ingestion.max_files must be greater than zero".into()));
        }
        if self.ingestion.max_chars_per_file == 0 {
            return Err(GeneratorError::Config(
                "ingestion.max_chars_per_file must be greater than zero".into(),
            ));
        }
        if self.ingestion.allowlist.is_empty() {
            return Err(GeneratorError::Config("ingestion.allowlist must not be empty".into()));
        }
        if self.cache.ttl_secs == 0 {
            return Err(GeneratorError::Config("cache.ttl_secs must be greater than zero".into()));
        }
        if let Some(token) = &self.github.token {
            if token.trim().is_empty() {
                return Err(GeneratorError::Config("GitHub token is empty".into()));
            }
        }
        Ok(())
    }

    /// Cache entry lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}
