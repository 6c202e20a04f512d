//! Configuration for carebot.
//!
//! Provides the [`CarebotConfig`] struct. Users construct it directly (starting from
//! [`Default`]) or read it from the process environment with [`CarebotConfig::from_env`].
//! No config-file parsing dependencies are required.
//!
//! # Example
//!
//! ```rust
//! use carebot::CarebotConfig;
//! use std::path::PathBuf;
//!
//! let config = CarebotConfig {
//!     session_dir: PathBuf::from("/var/lib/carebot/sessions"),
//!     history_limit: Some(40),
//!     ..CarebotConfig::default()
//! };
//! assert_eq!(config.max_cycles, 8);
//! ```

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::carebot::clients::openai::DEFAULT_OPENAI_BASE_URL;
use crate::carebot::tools::DEFAULT_TAVILY_BASE_URL;

/// Model identifier plus sampling temperature for one agent kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
        }
    }
}

/// A configuration value that could not be interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Invalid { key: String, value: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value, reason } => {
                write!(f, "invalid value '{}' for {}: {}", value, key, reason)
            }
        }
    }
}

impl Error for ConfigError {}

/// Global configuration for the service.
#[derive(Debug, Clone)]
pub struct CarebotConfig {
    pub openai_api_key: String,
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`.
    pub openai_base_url: String,
    /// Endpoint the `create_reminder` tool POSTs to. Calls fail softly when unset.
    pub reminder_url: Option<String>,
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: String,
    pub search_max_results: usize,
    pub chat_model: ModelSettings,
    pub symptom_model: ModelSettings,
    /// Upper bound on model calls per request.
    pub max_cycles: usize,
    /// Maximum turns kept per session after each request; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Root of the file session store.
    pub session_dir: PathBuf,
    pub bind_addr: String,
    pub tool_timeout_secs: u64,
}

impl Default for CarebotConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            reminder_url: None,
            tavily_api_key: None,
            tavily_base_url: DEFAULT_TAVILY_BASE_URL.to_string(),
            search_max_results: 3,
            chat_model: ModelSettings::new("gpt-4o", 0.1),
            symptom_model: ModelSettings::new("gpt-3.5-turbo", 0.3),
            max_cycles: 8,
            history_limit: None,
            session_dir: PathBuf::from("sessions"),
            bind_addr: "127.0.0.1:8000".to_string(),
            tool_timeout_secs: 30,
        }
    }
}

impl CarebotConfig {
    /// Read the configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup (the environment, a map in tests).
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_cycles: usize = parse_or(&get, "CAREBOT_MAX_CYCLES", defaults.max_cycles)?;
        if max_cycles == 0 {
            return Err(ConfigError::Invalid {
                key: "CAREBOT_MAX_CYCLES".into(),
                value: "0".into(),
                reason: "at least one model call is required".into(),
            });
        }

        let history_limit = match get("CAREBOT_HISTORY_LIMIT") {
            Some(raw) => Some(parse_value("CAREBOT_HISTORY_LIMIT", &raw)?),
            None => None,
        };

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            reminder_url: get("REMINDER_URL"),
            tavily_api_key: get("TAVILY_API_KEY"),
            tavily_base_url: get("TAVILY_BASE_URL").unwrap_or(defaults.tavily_base_url),
            search_max_results: parse_or(
                &get,
                "CAREBOT_SEARCH_MAX_RESULTS",
                defaults.search_max_results,
            )?,
            chat_model: ModelSettings::new(
                get("CAREBOT_CHAT_MODEL").unwrap_or(defaults.chat_model.model),
                parse_or(
                    &get,
                    "CAREBOT_CHAT_TEMPERATURE",
                    defaults.chat_model.temperature,
                )?,
            ),
            symptom_model: ModelSettings::new(
                get("CAREBOT_SYMPTOM_MODEL").unwrap_or(defaults.symptom_model.model),
                parse_or(
                    &get,
                    "CAREBOT_SYMPTOM_TEMPERATURE",
                    defaults.symptom_model.temperature,
                )?,
            ),
            max_cycles,
            history_limit,
            session_dir: get("CAREBOT_SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_dir),
            bind_addr: get("CAREBOT_BIND_ADDR").unwrap_or(defaults.bind_addr),
            tool_timeout_secs: parse_or(
                &get,
                "CAREBOT_TOOL_TIMEOUT_SECS",
                defaults.tool_timeout_secs,
            )?,
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
        reason: err.to_string(),
    })
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = CarebotConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.search_max_results, 3);
        assert_eq!(config.chat_model, ModelSettings::new("gpt-4o", 0.1));
        assert_eq!(config.symptom_model, ModelSettings::new("gpt-3.5-turbo", 0.3));
        assert_eq!(config.max_cycles, 8);
        assert_eq!(config.history_limit, None);
        assert_eq!(config.session_dir, PathBuf::from("sessions"));
        assert!(config.reminder_url.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = CarebotConfig::from_lookup(lookup(&[
            ("REMINDER_URL", "http://reminders.local/api"),
            ("CAREBOT_MAX_CYCLES", "3"),
            ("CAREBOT_HISTORY_LIMIT", "20"),
            ("CAREBOT_CHAT_MODEL", "gpt-4o-mini"),
            ("CAREBOT_SYMPTOM_TEMPERATURE", "0.7"),
            ("CAREBOT_SESSION_DIR", "/tmp/carebot"),
            ("TAVILY_API_KEY", ""),
        ]))
        .unwrap();
        assert_eq!(
            config.reminder_url.as_deref(),
            Some("http://reminders.local/api")
        );
        assert_eq!(config.max_cycles, 3);
        assert_eq!(config.history_limit, Some(20));
        assert_eq!(config.chat_model.model, "gpt-4o-mini");
        assert_eq!(config.symptom_model.temperature, 0.7);
        assert_eq!(config.session_dir, PathBuf::from("/tmp/carebot"));
        assert!(config.tavily_api_key.is_none());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = CarebotConfig::from_lookup(lookup(&[("CAREBOT_MAX_CYCLES", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "CAREBOT_MAX_CYCLES"));

        assert!(CarebotConfig::from_lookup(lookup(&[("CAREBOT_MAX_CYCLES", "0")])).is_err());
        assert!(
            CarebotConfig::from_lookup(lookup(&[("CAREBOT_CHAT_TEMPERATURE", "warm")])).is_err()
        );
    }
}
