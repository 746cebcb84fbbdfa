use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Default GroqCloud chat-completions endpoint (OpenAI-compatible).
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Top-level configuration loaded from `config.yaml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Where agent records and chat logs live.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Local HTTP API settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Settings for the OpenAI-compatible model provider.
///
/// Built once by the entry point and handed to whichever component
/// needs it (the runner); there is no process-wide instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Chat-completions URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key (plain text or env-var reference like `$GROQ_API_KEY`).
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Model used when an agent names an unsupported one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Maximum tool-call iterations per chat turn.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_key() -> String {
    "$GROQ_API_KEY".to_string()
}

fn default_model() -> String {
    crate::models::DEFAULT_MODEL.to_string()
}

fn default_max_tool_iterations() -> usize {
    3
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: default_api_key(),
            default_model: default_model(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

impl ProviderConfig {
    /// The API key with env-var references resolved.
    pub fn resolved_api_key(&self) -> String {
        crate::utils::resolve_env_ref(self.api_key.trim())
    }

    /// True when a non-empty credential is available.
    pub fn is_configured(&self) -> bool {
        !self.resolved_api_key().is_empty()
    }

    /// Human-readable credential status (never prints the full key).
    pub fn api_key_status(&self) -> String {
        let key = self.resolved_api_key();
        if key.is_empty() {
            "No API key found. Set GROQ_API_KEY or provider.api_key in config.yaml.".to_string()
        } else {
            let tail: String = key
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("API key configured (ends with ...{tail})")
        }
    }
}

/// Storage locations.  Relative paths are resolved against the home
/// directory by [`Config::load`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding all data files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Primary agent store file name.
    #[serde(default = "default_agents_file")]
    pub agents_file: String,
    /// Seed file consulted when the primary store is empty.
    #[serde(default = "default_seed_file")]
    pub seed_file: String,
    /// Subdirectory for saved chat transcripts.
    #[serde(default = "default_chats_dir")]
    pub chats_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_agents_file() -> String {
    "agents.json".to_string()
}

fn default_seed_file() -> String {
    "example_agents.json".to_string()
}

fn default_chats_dir() -> String {
    "chats".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            agents_file: default_agents_file(),
            seed_file: default_seed_file(),
            chats_dir: default_chats_dir(),
        }
    }
}

impl StorageConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn agents_path(&self) -> PathBuf {
        self.data_path().join(&self.agents_file)
    }

    pub fn seed_path(&self) -> PathBuf {
        self.data_path().join(&self.seed_file)
    }

    pub fn chats_path(&self) -> PathBuf {
        self.data_path().join(&self.chats_dir)
    }

    /// Sandbox root for the file-operations tool.
    pub fn workspace_path(&self) -> PathBuf {
        self.data_path().join("workspace")
    }
}

/// Local HTTP API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Listen address.
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Optional directory of static UI assets served as a fallback.
    #[serde(default)]
    pub static_dir: Option<String>,
}

fn default_addr() -> String {
    "127.0.0.1:8501".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            static_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.addr
            .parse()
            .with_context(|| format!("invalid gateway.addr: {}", self.addr))
    }
}

impl Config {
    /// Read and parse a YAML configuration file.
    ///
    /// Falls back to `<path>.bak` when the primary file is missing.
    pub async fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut bak_name = path.as_os_str().to_os_string();
                bak_name.push(".bak");
                let bak_path = PathBuf::from(bak_name);
                match tokio::fs::read_to_string(&bak_path).await {
                    Ok(c) => {
                        tracing::warn!(
                            path = %path.display(),
                            bak = %bak_path.display(),
                            "config file not found, falling back to .bak"
                        );
                        c
                    }
                    Err(_) => {
                        return Err(e).with_context(|| {
                            format!("failed to read config file: {}", path.display())
                        });
                    }
                }
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read config file: {}", path.display()));
            }
        };

        let mut config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&contents).context("failed to parse config YAML")?
        };
        config.validate()?;
        config.resolve_paths(&crate::market_home());

        tracing::debug!(
            data_dir = %config.storage.data_dir,
            model = %config.provider.default_model,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Like [`Config::load`], but a missing file (and missing `.bak`)
    /// yields the defaults instead of an error.  Parse and validation
    /// errors are still reported.
    pub async fn load_or_default(path: &Path) -> anyhow::Result<Config> {
        let mut bak_name = path.as_os_str().to_os_string();
        bak_name.push(".bak");
        if !path.exists() && !Path::new(&bak_name).exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            let mut config = Config::default();
            config.resolve_paths(&crate::market_home());
            return Ok(config);
        }
        Self::load(path).await
    }

    /// Resolve relative storage and static paths against `home`.
    pub fn resolve_paths(&mut self, home: &Path) {
        self.storage.data_dir = crate::utils::resolve_against(home, &self.storage.data_dir)
            .to_string_lossy()
            .to_string();
        if let Some(ref dir) = self.gateway.static_dir {
            self.gateway.static_dir = Some(
                crate::utils::resolve_against(home, dir)
                    .to_string_lossy()
                    .to_string(),
            );
        }
    }

    /// Validate semantic constraints that serde cannot enforce.
    fn validate(&self) -> anyhow::Result<()> {
        if !crate::models::is_supported(&self.provider.default_model) {
            anyhow::bail!(
                "config: provider.default_model '{}' is not a supported model",
                self.provider.default_model
            );
        }
        if self.provider.max_tool_iterations == 0 {
            anyhow::bail!("config: provider.max_tool_iterations must be at least 1");
        }
        if self.provider.endpoint.trim().is_empty() {
            anyhow::bail!("config: provider.endpoint is empty");
        }
        for (field, value) in [
            ("agents_file", &self.storage.agents_file),
            ("seed_file", &self.storage.seed_file),
            ("chats_dir", &self.storage.chats_dir),
        ] {
            if value.trim().is_empty() || value.contains('/') || value.contains('\\') {
                anyhow::bail!("config: storage.{field} must be a plain file name, got '{value}'");
            }
        }
        self.gateway.socket_addr()?;
        Ok(())
    }

    /// Serialize and write the configuration back to a YAML file.
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_yaml::to_string(self).context("serialize config YAML")?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        tokio::fs::write(path, &contents)
            .await
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}
