//! A Telegram bot for self-screening of stress and anxiety.
//!
//! Users answer a six-question survey, keep a mood diary and set simple
//! reminders. Everything a user does is kept in one JSON file.

pub mod agent;
pub mod channels;
pub mod chart;
pub mod config;
pub mod content;
pub mod error;
pub mod history;
pub mod scheduler;
pub mod survey;

pub use agent::Bot;
pub use config::Config;
pub use error::{Error, Result};
