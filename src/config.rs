use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Channel that receives relayed files when nothing else is configured.
pub const DEFAULT_TARGET_CHANNEL_ID: i64 = -1002550483559;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_target_channel_id")]
    pub target_channel_id: i64,
    /// Per-request timeout for Bot API calls, uploads included.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_supported_domains")]
    pub supported_domains: Vec<String>,
    #[serde(default = "default_resolver_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Directory for in-flight downloads. The system temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlayerConfig {
    #[serde(default = "default_player_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub serve: bool,
    #[serde(default = "default_player_bind")]
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

fn default_target_channel_id() -> i64 {
    DEFAULT_TARGET_CHANNEL_ID
}

fn default_request_timeout() -> u64 {
    600
}

fn default_endpoint() -> String {
    "https://terabox-pro-api.vercel.app/api".to_string()
}

fn default_supported_domains() -> Vec<String> {
    vec!["teraboxlink.com".to_string(), "1024terabox.com".to_string()]
}

fn default_resolver_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_player_base_url() -> String {
    "http://localhost:8000/player.html".to_string()
}

fn default_player_bind() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            target_channel_id: default_target_channel_id(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            supported_domains: default_supported_domains(),
            timeout_secs: default_resolver_timeout(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            base_url: default_player_base_url(),
            serve: false,
            bind_address: default_player_bind(),
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl TelegramConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RelayConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl StartupConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Config {
    /// Load the config file, then apply `BOT_TOKEN` and `TARGET_CHANNEL_ID`
    /// from the environment. A missing file is an error when `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let mut config = Self::read_file(path, required)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() {
            if required {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Override file values with environment variables fetched through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token.trim().to_string();
        }

        if let Some(raw) = lookup("TARGET_CHANNEL_ID").filter(|v| !v.trim().is_empty()) {
            self.telegram.target_channel_id = raw
                .trim()
                .parse()
                .with_context(|| format!("TARGET_CHANNEL_ID is not an integer: {raw}"))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!("Bot token missing: set BOT_TOKEN or [telegram] bot_token");
        }
        if self.resolver.supported_domains.is_empty() {
            anyhow::bail!("[resolver] supported_domains must not be empty");
        }
        if self.startup.max_attempts == 0 {
            anyhow::bail!("[startup] max_attempts must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        let err = Config::read_file(&path, true).unwrap_err();
        assert!(err.to_string().contains("relay.toml"), "{err}");
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::read_file(&dir.path().join("config.toml"), false).unwrap();
        assert_eq!(config.telegram.target_channel_id, DEFAULT_TARGET_CHANNEL_ID);
    }

    #[test]
    fn test_existing_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[telegram]\ntarget_channel_id = -7\n").unwrap();
        for required in [true, false] {
            let config = Config::read_file(&path, required).unwrap();
            assert_eq!(config.telegram.target_channel_id, -7);
        }
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.telegram.target_channel_id, DEFAULT_TARGET_CHANNEL_ID);
        assert_eq!(
            config.resolver.endpoint,
            "https://terabox-pro-api.vercel.app/api"
        );
        assert_eq!(
            config.resolver.supported_domains,
            vec!["teraboxlink.com", "1024terabox.com"]
        );
        assert_eq!(config.startup.max_attempts, 3);
        assert_eq!(config.startup.retry_delay(), Duration::from_secs(5));
        assert!(!config.player.serve);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = Config::parse(
            r#"
            [telegram]
            bot_token = "123:abc"
            target_channel_id = -10042

            [resolver]
            supported_domains = ["terabox.app"]
            timeout_secs = 5

            [player]
            serve = true
            bind_address = "0.0.0.0:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.telegram.target_channel_id, -10042);
        assert_eq!(config.resolver.supported_domains, vec!["terabox.app"]);
        assert_eq!(config.resolver.timeout(), Duration::from_secs(5));
        assert!(config.player.serve);
        assert_eq!(config.player.bind_address, "0.0.0.0:9000");
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(include_str!("../config.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.telegram.request_timeout(), Duration::from_secs(600));
        assert_eq!(config.relay.temp_dir, None);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::parse("[telegram]\nbot_token = \"file\"").unwrap();
        config
            .apply_env(env(&[("BOT_TOKEN", "env-token"), ("TARGET_CHANNEL_ID", "-1001")]))
            .unwrap();
        assert_eq!(config.telegram.bot_token, "env-token");
        assert_eq!(config.telegram.target_channel_id, -1001);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = Config::parse("[telegram]\nbot_token = \"file\"").unwrap();
        config.apply_env(env(&[("BOT_TOKEN", "  ")])).unwrap();
        assert_eq!(config.telegram.bot_token, "file");
    }

    #[test]
    fn test_bad_channel_id_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("TARGET_CHANNEL_ID", "channel")]))
            .unwrap_err();
        assert!(err.to_string().contains("TARGET_CHANNEL_ID"));
    }

    #[test]
    fn test_missing_token_fails_validation() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.apply_env(env(&[("BOT_TOKEN", "t")])).unwrap();
        assert!(config.validate().is_ok());
    }
}
