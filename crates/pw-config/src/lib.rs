//! Configuration management for Pagewright.
//!
//! Parses `pw.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `generator.api_key`
//! - `generator.base_url`
//! - `storage.public_base_url`
//! - `storage.s3.bucket`, `storage.s3.region`, `storage.s3.endpoint`
//! - `storage.sql.url`

mod expand;

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override storage backend.
    pub backend: Option<StorageBackend>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "pw.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Generation provider configuration.
    pub generator: GeneratorConfig,
    /// Page composition configuration.
    pub pages: PagesConfig,
    /// Storage backend configuration.
    pub storage: StorageConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7878,
        }
    }
}

/// Generation provider configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Provider API key.
    pub api_key: String,
    /// Provider base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Maximum output tokens per call.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Provider calls per generation, including the first.
    pub max_attempts: u32,
    /// Pause between overload retries, in milliseconds.
    pub retry_delay_ms: u64,
    /// Timeout for a single provider call, in seconds.
    pub http_timeout_secs: u64,
    /// Timeout for a whole generate request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY:-}".to_owned(),
            base_url: "https://api.anthropic.com".to_owned(),
            model: "claude-3-5-haiku-20241022".to_owned(),
            max_tokens: 8192,
            temperature: 0.7,
            max_attempts: 3,
            retry_delay_ms: 2000,
            http_timeout_secs: 120,
            request_timeout_secs: 180,
        }
    }
}

impl GeneratorConfig {
    /// Pause between overload retries.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Timeout for a single provider call.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Timeout for a whole generate request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Page composition configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PagesConfig {
    /// Kind of page requested in create prompts (e.g. "landing").
    pub kind: String,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            kind: "landing".to_owned(),
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map; lost on restart.
    #[default]
    Memory,
    /// Local directory.
    Fs,
    /// S3 or S3-compatible bucket.
    S3,
    /// Relational table (`SQLite`).
    Sql,
}

impl StorageBackend {
    /// Lowercase name as used in `pw.toml`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Fs => "fs",
            Self::S3 => "s3",
            Self::Sql => "sql",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "fs" => Ok(Self::Fs),
            "s3" => Ok(Self::S3),
            "sql" => Ok(Self::Sql),
            other => Err(format!(
                "unknown storage backend '{other}' (expected memory, fs, s3 or sql)"
            )),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: StorageBackend,
    /// Base URL reported for stored objects instead of the backend default.
    pub public_base_url: Option<String>,
    /// Filesystem backend settings.
    pub fs: FsStorageConfig,
    /// S3 backend settings. Required when `backend = "s3"`.
    pub s3: Option<S3StorageConfig>,
    /// Relational backend settings.
    pub sql: SqlStorageConfig,
}

/// Filesystem backend configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FsStorageConfig {
    /// Root directory; relative paths resolve against the config file directory.
    pub dir: PathBuf,
}

impl Default for FsStorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("generated-pages"),
        }
    }
}

/// S3 backend configuration.
#[derive(Debug, Deserialize)]
pub struct S3StorageConfig {
    /// Bucket name.
    pub bucket: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// S3-compatible endpoint URL.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Prefix within the bucket.
    #[serde(default)]
    pub root_path: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

/// Relational backend configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SqlStorageConfig {
    /// Database URL.
    pub url: String,
}

impl Default for SqlStorageConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://pagewright.db?mode=rwc".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`generator.api_key`").
        field: String,
        /// Error message (e.g., "${`ANTHROPIC_API_KEY`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn expand_optional(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(v) = value {
        *v = expand::expand_env(v, field)?;
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `pw.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated again afterwards.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// an environment reference cannot be resolved, or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            let mut config = Self::default_with_cwd();
            config.expand_env_vars()?;
            config
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(backend) = settings.backend {
            self.storage.backend = backend;
        }
    }

    /// Get validated generator configuration.
    ///
    /// Use this instead of accessing the `generator` field directly when the
    /// command calls the provider.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if no API key is configured.
    pub fn require_generator(&self) -> Result<&GeneratorConfig, ConfigError> {
        if self.generator.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "generator.api_key is not set (set ANTHROPIC_API_KEY or [generator] api_key)"
                    .to_owned(),
            ));
        }
        Ok(&self.generator)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let mut storage = StorageConfig::default();
        storage.fs.dir = base.join(&storage.fs.dir);
        Self {
            server: ServerConfig::default(),
            generator: GeneratorConfig::default(),
            pages: PagesConfig::default(),
            storage,
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file. The API key is not
    /// checked here; see [`Config::require_generator`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_generator()?;
        self.validate_storage()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_generator(&self) -> Result<(), ConfigError> {
        let generator = &self.generator;
        require_non_empty(&generator.base_url, "generator.base_url")?;
        require_http_url(&generator.base_url, "generator.base_url")?;
        require_non_empty(&generator.model, "generator.model")?;

        if generator.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "generator.max_tokens must be greater than 0".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&generator.temperature) {
            return Err(ConfigError::Validation(
                "generator.temperature must be between 0.0 and 1.0".to_owned(),
            ));
        }
        if generator.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "generator.max_attempts must be at least 1".to_owned(),
            ));
        }
        if generator.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "generator.request_timeout_secs must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_storage(&self) -> Result<(), ConfigError> {
        let storage = &self.storage;
        if let Some(ref url) = storage.public_base_url {
            require_http_url(url, "storage.public_base_url")?;
        }

        match storage.backend {
            StorageBackend::Memory => {}
            StorageBackend::Fs => {
                if storage.fs.dir.as_os_str().is_empty() {
                    return Err(ConfigError::Validation(
                        "storage.fs.dir cannot be empty".to_owned(),
                    ));
                }
            }
            StorageBackend::S3 => {
                let s3 = storage.s3.as_ref().ok_or_else(|| {
                    ConfigError::Validation(
                        "[storage.s3] section required when storage.backend = \"s3\"".to_owned(),
                    )
                })?;
                require_non_empty(&s3.bucket, "storage.s3.bucket")?;
                require_non_empty(&s3.region, "storage.s3.region")?;
                if let Some(ref endpoint) = s3.endpoint {
                    require_http_url(endpoint, "storage.s3.endpoint")?;
                }
            }
            StorageBackend::Sql => {
                require_non_empty(&storage.sql.url, "storage.sql.url")?;
                if !storage.sql.url.starts_with("sqlite:") {
                    return Err(ConfigError::Validation(
                        "storage.sql.url must be a sqlite: URL".to_owned(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        self.generator.api_key = expand::expand_env(&self.generator.api_key, "generator.api_key")?;
        self.generator.base_url =
            expand::expand_env(&self.generator.base_url, "generator.base_url")?;

        expand_optional(&mut self.storage.public_base_url, "storage.public_base_url")?;
        if let Some(ref mut s3) = self.storage.s3 {
            s3.bucket = expand::expand_env(&s3.bucket, "storage.s3.bucket")?;
            s3.region = expand::expand_env(&s3.region, "storage.s3.region")?;
            expand_optional(&mut s3.endpoint, "storage.s3.endpoint")?;
        }
        self.storage.sql.url = expand::expand_env(&self.storage.sql.url, "storage.sql.url")?;

        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.storage.fs.dir = config_dir.join(&self.storage.fs.dir);
    }
}
