use std::sync::Arc;

use psybot::Bot;
use psybot::channels::TelegramChannel;
use psybot::chart::PngChartRenderer;
use psybot::config::Config;
use psybot::history::UserStore;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("psybot=info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            eprintln!("psybot: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        bot_id = config.telegram.bot_id(),
        data_file = %config.storage.data_file.display(),
        free_text_as_mood = config.bot.free_text_as_mood,
        "Starting psybot"
    );

    let store = Arc::new(UserStore::new(&config.storage.data_file));
    // Fail now rather than on the first request if the file is unreadable.
    let users = store.load()?;
    tracing::info!(users = users.len(), "User data loaded");

    let channel = Arc::new(TelegramChannel::new(config.telegram.clone()));
    let bot = Arc::new(Bot::new(
        channel,
        store,
        Arc::new(PngChartRenderer::default()),
        config.bot.clone(),
    ));

    tokio::select! {
        result = Arc::clone(&bot).run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            bot.reminders().shutdown();
        }
    }
    Ok(())
}
