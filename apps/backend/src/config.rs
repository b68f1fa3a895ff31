//! Service configuration read from the environment.

use std::str::FromStr;
use std::time::Duration;

use medcards_core::EngineConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("invalid engine configuration: {0}")]
    Engine(#[from] medcards_core::ConfigError),
}

/// OpenAI-compatible endpoint used for coach feedback.
#[derive(Debug, Clone)]
pub struct FeedbackSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Fixed RNG seed for reproducible selection.
    pub selection_seed: Option<u64>,
    /// Feedback is disabled when absent.
    pub feedback: Option<FeedbackSettings>,
    pub feedback_timeout: Duration,
    pub max_commit_attempts: u32,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
            selection_seed: None,
            feedback: None,
            feedback_timeout: Duration::from_millis(8_000),
            max_commit_attempts: 5,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.database_url = get("DATABASE_URL");
        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = parse(&get, "PORT")? {
            config.port = port;
        }
        config.selection_seed = parse(&get, "SELECTION_SEED")?;

        config.feedback = get("FEEDBACK_API_URL").map(|api_url| FeedbackSettings {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: get("FEEDBACK_API_KEY"),
            model: get("FEEDBACK_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        });
        if let Some(ms) = parse::<u64, _>(&get, "FEEDBACK_TIMEOUT_MS")? {
            config.feedback_timeout = Duration::from_millis(ms);
        }

        if let Some(attempts) = parse::<u32, _>(&get, "MAX_COMMIT_ATTEMPTS")? {
            if attempts == 0 {
                return Err(ConfigError::Invalid {
                    name: "MAX_COMMIT_ATTEMPTS",
                    value: attempts.to_string(),
                });
            }
            config.max_commit_attempts = attempts;
        }
        if let Some(hours) = parse(&get, "COOLDOWN_HOURS")? {
            config.engine.selection.cooldown_hours = hours;
        }
        if let Some(threshold) = parse(&get, "MASTERY_THRESHOLD")? {
            config.engine.selection.mastery_threshold = threshold;
        }

        config.engine.validate()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}
