// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::{Error, Result};

/// Model names with this prefix select the Groq provider.
pub const GROQ_MODEL_PREFIX: &str = "groq:";

/// How the first character of a generated message is cased
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageFormat {
    #[default]
    Lowercase,
    #[serde(alias = "sentence case")]
    SentenceCase,
    Original,
}

impl std::fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lowercase => write!(f, "lowercase"),
            Self::SentenceCase => write!(f, "sentence-case"),
            Self::Original => write!(f, "original"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    Groq,
    #[value(name = "openai")]
    OpenAI,
}

impl Provider {
    /// Environment variable holding this provider's API key, if it needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Ollama => None,
            Self::Groq => Some("GROQ_API_KEY"),
            Self::OpenAI => Some("OPENAI_API_KEY"),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Groq => write!(f, "groq"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: Provider,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_ollama_host")]
    pub ollama_host: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for OpenAI-compatible APIs (overrides the Groq/OpenAI default)
    #[serde(default)]
    pub openai_base_url: Option<String>,

    /// LLM temperature (0.0-2.0, default 0.7)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate (default 256)
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,

    /// Request timeout in seconds (default 120)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient cloud provider failures (default 2)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Diff characters sent to the model; the rest is cut off
    #[serde(default = "default_max_diff_chars")]
    pub max_diff_chars: usize,

    #[serde(default)]
    pub message_format: MessageFormat,

    /// Strip trailing periods from the generated message (default: true)
    #[serde(default = "default_true")]
    pub rstrip_period: bool,

    /// Custom prompt template; must contain `{diff}`
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,

    #[serde(default)]
    pub github_token: Option<String>,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Remote used for tag pushes and GitHub repository detection
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_true() -> bool {
    true
}
fn default_model() -> String {
    "llama3.1:8b".into()
}
fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_num_predict() -> u32 {
    256
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    2
}
fn default_max_diff_chars() -> usize {
    32_000
}
fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_remote() -> String {
    "origin".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: default_model(),
            ollama_host: default_ollama_host(),
            api_key: None,
            openai_base_url: None,
            temperature: default_temperature(),
            num_predict: default_num_predict(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            max_diff_chars: default_max_diff_chars(),
            message_format: MessageFormat::default(),
            rstrip_period: true,
            prompt_file: None,
            github_token: None,
            github_api_url: default_github_api_url(),
            remote: default_remote(),
        }
    }
}

impl Config {
    /// Load with priority: CLI > ENV > user config > project config > defaults
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Project-level config (.lazym.toml in the working directory)
        if let Ok(cwd) = std::env::current_dir() {
            let project_config = cwd.join(".lazym.toml");
            if project_config.exists() {
                figment = figment.merge(Toml::file(&project_config));
            }
        }

        if let Some(path) = Self::config_path()
            && path.exists()
        {
            figment = figment.merge(Toml::file(&path));
        }

        // LAZYM_PROVIDER and LAZYM_MODEL arrive through clap's `env` instead
        figment = figment.merge(
            Env::prefixed("LAZYM_")
                .ignore(&["provider", "model"])
                .split("__"),
        );

        let mut config: Config = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.apply_cli(cli);
        config.apply_model_prefix();

        if config.api_key.is_none() {
            config.api_key = config
                .provider
                .api_key_env()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.is_empty());
        }

        #[cfg(feature = "secure-storage")]
        if config.api_key.is_none() && config.provider != Provider::Ollama {
            config.api_key = keychain_secret(&config.provider.to_string());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lazym").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(provider) = cli.provider {
            self.provider = provider;
        }
        if let Some(ref m) = cli.model {
            self.model = m.clone();
        }
    }

    /// `groq:<model>` selects Groq and strips the prefix from the model name.
    pub fn apply_model_prefix(&mut self) {
        if let Some(model) = self.model.strip_prefix(GROQ_MODEL_PREFIX) {
            self.model = model.to_string();
            self.provider = Provider::Groq;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Config("model cannot be empty".into()));
        }

        if !(1..=3600).contains(&self.timeout_secs) {
            return Err(Error::Config(format!(
                "timeout_secs must be 1–3600, got {}",
                self.timeout_secs
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be 0.0–2.0, got {}",
                self.temperature
            )));
        }

        if self.max_retries > 10 {
            return Err(Error::Config(format!(
                "max_retries must be 0–10, got {}",
                self.max_retries
            )));
        }

        if !(1_000..=500_000).contains(&self.max_diff_chars) {
            return Err(Error::Config(format!(
                "max_diff_chars must be 1000–500000, got {}",
                self.max_diff_chars
            )));
        }

        validate_http_url("ollama_host", &self.ollama_host)?;
        validate_http_url("github_api_url", &self.github_api_url)?;
        if let Some(ref base) = self.openai_base_url {
            validate_http_url("openai_base_url", base)?;
        }

        if self.remote.trim().is_empty() {
            return Err(Error::Config("remote cannot be empty".into()));
        }

        Ok(())
    }

    /// Cloud providers need a key before any request is made. Only checked
    /// when a provider is built, so tag, release and key commands work without one.
    pub fn require_api_key(&self) -> Result<()> {
        if let Some(var) = self.provider.api_key_env()
            && self.api_key.as_deref().is_none_or(str::is_empty)
        {
            return Err(Error::Config(format!(
                "{} requires an API key. Set LAZYM_API_KEY or {var}",
                self.provider
            )));
        }
        Ok(())
    }

    /// Create default config file with secure permissions
    pub fn create_default() -> Result<PathBuf> {
        let Some(dir) = Self::config_dir() else {
            return Err(Error::Config("Cannot determine config directory".into()));
        };

        fs::create_dir_all(&dir)?;

        let path = dir.join("config.toml");
        let content = r#"# lazym configuration

# LLM provider: ollama, groq, openai
provider = "ollama"

# Model name. `groq:<model>` also selects the groq provider.
model = "llama3.1:8b"

# Ollama server URL
ollama_host = "http://localhost:11434"

# Sampling temperature (0.0-2.0)
temperature = 0.7

# Casing of the generated message: lowercase, sentence-case, original
message_format = "lowercase"

# Strip trailing periods from the message
rstrip_period = true

# Diff characters sent to the model
# max_diff_chars = 32000

# Custom prompt template (must contain {diff})
# prompt_file = "/path/to/prompt.txt"

# Remote used for tag pushes and release detection
remote = "origin"

# GitHub token for `lazym release` (GITHUB_TOKEN / GH_TOKEN / gh CLI also work)
# github_token = "ghp_..."
"#;

        fs::write(&path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        Ok(path)
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::Config(format!("{key} is not a valid URL ('{value}'): {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "{key} must start with http:// or https://, got '{value}'"
        )));
    }
    Ok(())
}

/// Read a stored token from the OS keychain.
#[cfg(feature = "secure-storage")]
pub fn keychain_secret(service: &str) -> Option<String> {
    let entry = keyring::Entry::new("lazym", service).ok()?;
    entry.get_password().ok()
}
