//! Error types for psybot.

use std::path::PathBuf;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Survey error: {0}")]
    Survey(#[from] SurveyError),

    #[error("Reminder error: {0}")]
    Reminder(#[from] ReminderError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Whether the error was caused by bad user input rather than a failure
    /// of the bot itself. Validation errors are reported back to the user
    /// verbatim; everything else is logged and answered with an apology.
    pub fn is_validation(&self) -> bool {
        match self {
            Error::Store(e) => e.is_validation(),
            Error::Survey(_) | Error::Reminder(_) => true,
            _ => false,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// User record store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Mood text must not be empty")]
    EmptyMood,

    #[error("Mood score {score} is out of range {min}..={max}")]
    MoodScoreOutOfRange { score: i64, min: u8, max: u8 },

    #[error("Failed to read store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::EmptyName | StoreError::EmptyMood | StoreError::MoodScoreOutOfRange { .. }
        )
    }
}

/// Survey flow errors. All of them leave the session untouched.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("No survey in progress for user {user_id}")]
    NoSession { user_id: String },

    #[error("Answer for question {got} arrived out of sequence (expected {expected})")]
    OutOfSequence { expected: usize, got: usize },

    #[error("Unknown answer option: {label}")]
    UnknownAnswer { label: String },

    #[error("Survey has {answered} of {expected} answers")]
    Incomplete { answered: usize, expected: usize },
}

/// Reminder scheduling errors.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("Reminder delay must be a positive whole number, got {input:?}")]
    InvalidDelay { input: String },

    #[error("Reminder text must not be empty")]
    EmptyMessage,
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Authentication failed for channel {name}: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Score chart rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Cannot render a chart for an empty history")]
    EmptyHistory,

    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
