//! Configuration for psybot.
//!
//! Everything is read from the process environment, with an optional `.env`
//! file in the working directory loaded first. The bot token is the only
//! required value; startup fails fast when it is missing or malformed.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

const DEFAULT_DATA_FILE: &str = "user_data.json";
const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Main configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    pub bot: BotConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            telegram: TelegramConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            bot: BotConfig::from_env()?,
        })
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    token: SecretString,
    pub api_url: String,
    pub poll_timeout: Duration,
}

impl TelegramConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let token = optional_env("TELEGRAM_TOKEN")?
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_TOKEN".to_string()))?;
        validate_token(&token)?;

        let api_url = optional_env("TELEGRAM_API_URL")?
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let poll_timeout_secs: u64 = parse_optional_env("TELEGRAM_POLL_TIMEOUT_SECS", 30)?;

        Ok(Self {
            token: SecretString::from(token),
            api_url,
            poll_timeout: Duration::from_secs(poll_timeout_secs),
        })
    }

    /// Build a config directly, e.g. for tests against a mock API.
    pub fn new(token: &str, api_url: impl Into<String>) -> Result<Self, ConfigError> {
        validate_token(token)?;
        Ok(Self {
            token: SecretString::from(token.to_string()),
            api_url: api_url.into(),
            poll_timeout: Duration::from_secs(30),
        })
    }

    /// The bot token. Never log this.
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// The numeric bot id, i.e. the part of the token before the colon.
    /// Safe to log.
    pub fn bot_id(&self) -> &str {
        self.token()
            .split_once(':')
            .map(|(id, _)| id)
            .unwrap_or_default()
    }
}

/// Where user data lives.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_file: PathBuf,
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let data_file = optional_env("PSYBOT_DATA_FILE")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        Ok(Self { data_file })
    }
}

/// Behavioural switches.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Record unrecognised free text as a mood diary entry.
    pub free_text_as_mood: bool,
    /// Unfinished surveys older than this are evicted.
    pub survey_session_ttl: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            free_text_as_mood: true,
            survey_session_ttl: Duration::from_secs(3600),
        }
    }
}

impl BotConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let free_text_as_mood = parse_bool_env("FREE_TEXT_AS_MOOD", true)?;
        let ttl_secs: u64 = parse_optional_env("SURVEY_SESSION_TTL_SECS", 3600)?;
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SURVEY_SESSION_TTL_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            free_text_as_mood,
            survey_session_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

/// A bot token looks like `123456789:AAH...`: a numeric bot id, a colon,
/// and a non-empty secret without whitespace.
fn validate_token(token: &str) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidValue {
        key: "TELEGRAM_TOKEN".to_string(),
        message: message.to_string(),
    };

    let (id, secret) = token
        .split_once(':')
        .ok_or_else(|| invalid("expected <bot id>:<secret>"))?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("bot id must be numeric"));
    }
    if secret.is_empty() || secret.chars().any(char::is_whitespace) {
        return Err(invalid("secret part is empty or contains whitespace"));
    }
    Ok(())
}

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.trim().is_empty() => Ok(None),
        Ok(val) => Ok(Some(val.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

pub(crate) fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match optional_env(key)? {
        None => Ok(default),
        Some(s) => match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got {s:?}"),
            }),
        },
    }
}
