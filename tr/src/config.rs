//! toolrelay configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::r#loop::LoopConfig;
use crate::session::LaunchSpec;

const LOCAL_CONFIG: &str = ".toolrelay.yml";

/// Main toolrelay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Query loop behaviour
    pub agent: AgentConfig,

    /// Tool host to launch when none is given on the command line
    pub host: Option<LaunchSpec>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variable is set. Call this early in
    /// startup to fail fast with a clear error message.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key().is_none() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed: a broken config file is reported later by `load`.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let paths = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::search_paths(),
        };

        paths
            .into_iter()
            .filter(|p| p.exists())
            .find_map(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    /// Build the query loop settings from this config
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            system_prompt: self.agent.system_prompt.clone(),
            max_tokens: self.llm.max_tokens,
            max_turns: self.agent.max_turns,
            refresh_catalog: self.agent.refresh_catalog,
        }
    }

    /// Project-local config first, then the user config
    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("toolrelay").join("toolrelay.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 300_000,
        }
    }
}

/// Query loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// System prompt sent with every model call
    #[serde(rename = "system-prompt")]
    pub system_prompt: Option<String>,

    /// Upper bound on model calls per query; unbounded when unset
    #[serde(rename = "max-turns")]
    pub max_turns: Option<u32>,

    /// Re-list tools from the host at the start of every query
    #[serde(rename = "refresh-catalog")]
    pub refresh_catalog: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_turns: None,
            refresh_catalog: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "anthropic");
        assert!(config.agent.refresh_catalog);
        assert!(config.agent.max_turns.is_none());
        assert!(config.host.is_none());
    }

    #[test]
    fn test_llm_config_defaults() {
        let config = LlmConfig::default();

        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.model, "claude-sonnet-4-5");
        assert_eq!(config.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
llm:
  provider: anthropic
  model: claude-opus-4
  api-key-env: MY_API_KEY
  base-url: https://api.example.com
  max-tokens: 8192
  timeout-ms: 60000

agent:
  system-prompt: "Use tools when arithmetic is involved."
  max-turns: 8
  refresh-catalog: false

host:
  command: python
  args: [simple_server.py]
  env:
    CALC_MODE: strict

log-level: debug
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "claude-opus-4");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.max_tokens, 8192);
        assert_eq!(config.agent.max_turns, Some(8));
        assert!(!config.agent.refresh_catalog);

        let host = config.host.unwrap();
        assert_eq!(host.command, "python");
        assert_eq!(host.args, vec!["simple_server.py"]);
        assert_eq!(host.env.unwrap().get("CALC_MODE").map(String::as_str), Some("strict"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: claude-haiku
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "claude-haiku");
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
        assert!(config.agent.refresh_catalog);
    }

    #[test]
    fn test_loop_config_from_config() {
        let mut config = Config::default();
        config.agent.max_turns = Some(3);
        config.agent.system_prompt = Some("be brief".to_string());

        let loop_config = config.loop_config();
        assert_eq!(loop_config.max_turns, Some(3));
        assert_eq!(loop_config.max_tokens, 4096);
        assert_eq!(loop_config.system_prompt.as_deref(), Some("be brief"));
        assert!(loop_config.refresh_catalog);
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "llm:\n  model: from-file\nlog-level: trace").unwrap();
        let path = file.path().to_path_buf();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.llm.model, "from-file");
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("trace"));
    }

    #[test]
    fn test_load_explicit_path_missing() {
        let path = PathBuf::from("/nonexistent/toolrelay.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_load_explicit_path_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "llm: [not, a, map").unwrap();
        let path = file.path().to_path_buf();

        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    #[serial]
    fn test_validate_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "TOOLRELAY_TEST_API_KEY".to_string();

        unsafe { std::env::remove_var("TOOLRELAY_TEST_API_KEY") };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("TOOLRELAY_TEST_API_KEY"));

        unsafe { std::env::set_var("TOOLRELAY_TEST_API_KEY", "sk-test") };
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.api_key().as_deref(), Some("sk-test"));

        unsafe { std::env::remove_var("TOOLRELAY_TEST_API_KEY") };
    }
}
