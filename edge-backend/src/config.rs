use std::env;
use std::path::PathBuf;

const PLACEHOLDER_OPENAI_KEY: &str = "sk-placeholder_key";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// SQLite database path. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub workspace_root: PathBuf,
    pub openai: Option<OpenAiConfig>,
    pub task_poll_interval_secs: u64,
    pub email: Option<EmailConfig>,
    pub search_api_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_number("PORT", get("PORT"), 8080u16)?;
        let task_poll_interval_secs =
            parse_number("TASK_POLL_INTERVAL_SECS", get("TASK_POLL_INTERVAL_SECS"), 30u64)?;

        let openai = get("OPENAI_API_KEY")
            .filter(|key| key != PLACEHOLDER_OPENAI_KEY)
            .map(|api_key| OpenAiConfig {
                api_key,
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            });

        let email = match (get("EMAIL_API_URL"), get("EMAIL_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(EmailConfig {
                api_url,
                api_key,
                from: get("EMAIL_FROM").unwrap_or_else(|| "edge@localhost".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            workspace_root: PathBuf::from(
                get("EDGE_WORKSPACE").unwrap_or_else(|| "/tmp/edge_workspace".to_string()),
            ),
            openai,
            task_poll_interval_secs,
            email,
            search_api_key: get("SEARCH_API_KEY"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.task_poll_interval_secs, 30);
        assert_eq!(config.workspace_root, PathBuf::from("/tmp/edge_workspace"));
        assert!(config.database_url.is_none());
        assert!(config.openai.is_none());
        assert!(config.email.is_none());
    }

    #[test]
    fn test_placeholder_key_means_offline() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-placeholder_key")]).unwrap();
        assert!(config.openai.is_none());

        let config = config_from(&[("OPENAI_API_KEY", "sk-real"), ("OPENAI_MODEL", "gpt-4o")]).unwrap();
        let openai = config.openai.unwrap();
        assert_eq!(openai.api_key, "sk-real");
        assert_eq!(openai.model, "gpt-4o");
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_email_requires_url_and_key() {
        let config = config_from(&[("EMAIL_API_URL", "https://mail.example")]).unwrap();
        assert!(config.email.is_none());

        let config = config_from(&[
            ("EMAIL_API_URL", "https://mail.example"),
            ("EMAIL_API_KEY", "k"),
        ])
        .unwrap();
        assert_eq!(config.email.unwrap().from, "edge@localhost");
    }
}
