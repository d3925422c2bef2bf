//! Configuration loading from concierge.toml and the environment.

use runtime::providers::Auth;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE: &str = "concierge.toml";

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

/// Settings as written in the config file. Every field is optional here;
/// required ones are checked after the environment is merged in.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// URL of the hosted agent runtime's streaming messages endpoint.
    pub endpoint: Option<String>,

    /// Model or deployment name.
    pub model: Option<String>,

    /// Sent as `x-api-key`. Mutually exclusive with bearer_token.
    pub api_key: Option<String>,

    /// Sent as `Authorization: Bearer`. Mutually exclusive with api_key.
    pub bearer_token: Option<String>,

    pub max_tokens: Option<u32>,

    pub max_tool_rounds: Option<u32>,

    /// Overrides the agent profile's instructions.
    pub system: Option<String>,
}

impl FileConfig {
    /// Load a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub endpoint: String,
    pub model: String,
    pub auth: Auth,
    pub max_tokens: u32,
    pub max_tool_rounds: u32,
    pub system: Option<String>,
}

impl Config {
    /// Load from `path` (or `concierge.toml` if present) and the process
    /// environment.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::load(path)?,
            None if Path::new(CONFIG_FILE).exists() => FileConfig::load(CONFIG_FILE)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge `file` with environment variables read through `env`.
    ///
    /// Environment values take precedence; empty values count as unset.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let endpoint = env("CONCIERGE_ENDPOINT")
            .or(file.endpoint)
            .ok_or(ConfigError::Missing {
                key: "endpoint",
                env: "CONCIERGE_ENDPOINT",
            })?;
        let model = env("CONCIERGE_MODEL")
            .or(file.model)
            .ok_or(ConfigError::Missing {
                key: "model",
                env: "CONCIERGE_MODEL",
            })?;

        let auth = match (
            env("CONCIERGE_API_KEY").or(file.api_key),
            env("CONCIERGE_BEARER_TOKEN").or(file.bearer_token),
        ) {
            (Some(key), None) => Auth::ApiKey(key),
            (None, Some(token)) => Auth::Bearer(token),
            (None, None) => Auth::None,
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousAuth),
        };

        let max_tokens = match env("CONCIERGE_MAX_TOKENS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "CONCIERGE_MAX_TOKENS",
                value,
            })?,
            None => file.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };

        Ok(Self {
            endpoint,
            model,
            auth,
            max_tokens,
            max_tool_rounds: file.max_tool_rounds.unwrap_or(DEFAULT_MAX_TOOL_ROUNDS),
            system: file.system,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("missing required setting '{key}': set {env} or '{key}' in concierge.toml")]
    Missing {
        key: &'static str,
        env: &'static str,
    },

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("ambiguous authentication: set either api_key OR bearer_token, not both")]
    AmbiguousAuth,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn resolves_from_environment() {
        let config = Config::resolve(
            FileConfig::default(),
            env(&[
                ("CONCIERGE_ENDPOINT", "https://agents.example.com/v1/messages"),
                ("CONCIERGE_MODEL", "assistant-1"),
            ]),
        )
        .unwrap();
        assert_eq!(config.endpoint, "https://agents.example.com/v1/messages");
        assert_eq!(config.model, "assistant-1");
        assert_eq!(config.auth, Auth::None);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.max_tool_rounds, 8);
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let err = Config::resolve(
            FileConfig::default(),
            env(&[("CONCIERGE_MODEL", "assistant-1")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "endpoint", .. }));
    }

    #[test]
    fn blank_model_counts_as_missing() {
        let err = Config::resolve(
            FileConfig::default(),
            env(&[("CONCIERGE_ENDPOINT", "http://localhost"), ("CONCIERGE_MODEL", " ")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "model", .. }));
    }

    #[test]
    fn environment_overrides_file() {
        let file = FileConfig::parse(
            r#"
            endpoint = "http://file"
            model = "file-model"
            max_tokens = 1024
            max_tool_rounds = 3
            system = "Be terse."
            "#,
        )
        .unwrap();
        let config = Config::resolve(file, env(&[("CONCIERGE_MODEL", "env-model")])).unwrap();
        assert_eq!(config.endpoint, "http://file");
        assert_eq!(config.model, "env-model");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.max_tool_rounds, 3);
        assert_eq!(config.system.as_deref(), Some("Be terse."));
    }

    #[test]
    fn auth_from_either_source() {
        let file = FileConfig::parse(
            r#"
            endpoint = "http://file"
            model = "m"
            bearer_token = "tok"
            "#,
        )
        .unwrap();
        let config = Config::resolve(file, env(&[])).unwrap();
        assert_eq!(config.auth, Auth::Bearer("tok".into()));

        let file = FileConfig::parse("endpoint = \"e\"\nmodel = \"m\"\napi_key = \"k\"").unwrap();
        let err = Config::resolve(file, env(&[("CONCIERGE_BEARER_TOKEN", "t")])).unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousAuth));
    }

    #[test]
    fn rejects_bad_max_tokens() {
        let err = Config::resolve(
            FileConfig::default(),
            env(&[
                ("CONCIERGE_ENDPOINT", "e"),
                ("CONCIERGE_MODEL", "m"),
                ("CONCIERGE_MAX_TOKENS", "lots"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            FileConfig::parse("endpont = \"typo\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
