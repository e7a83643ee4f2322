//! The bot: receives events from a channel and routes them to handlers.

pub mod callback;
mod commands;
pub mod submission;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::channels::{Channel, IncomingEvent, UserId};
use crate::chart::ChartRenderer;
use crate::config::BotConfig;
use crate::content;
use crate::error::Error;
use crate::history::{UserRecord, UserStore};
use crate::scheduler::ReminderScheduler;
use crate::survey::SurveyEngine;

pub use callback::{AnswerPayload, answer_buttons};
pub use submission::{Submission, SubmissionParser};

/// Upper bound on how often stale survey sessions are swept.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The screening bot.
pub struct Bot {
    channel: Arc<dyn Channel>,
    store: Arc<UserStore>,
    survey: Arc<SurveyEngine>,
    reminders: ReminderScheduler,
    chart: Arc<dyn ChartRenderer>,
    config: BotConfig,
}

impl Bot {
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Arc<UserStore>,
        chart: Arc<dyn ChartRenderer>,
        config: BotConfig,
    ) -> Self {
        let survey = Arc::new(SurveyEngine::new(
            Arc::clone(&store),
            config.survey_session_ttl,
        ));
        let reminders = ReminderScheduler::new(Arc::clone(&channel));
        Self {
            channel,
            store,
            survey,
            reminders,
            chart,
            config,
        }
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    pub fn survey(&self) -> &SurveyEngine {
        &self.survey
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    /// Consume events until the channel's stream ends. Each event is handled
    /// on its own task.
    pub async fn run(self: Arc<Self>) -> Result<(), Error> {
        let mut events = self.channel.start().await?;
        tracing::info!(channel = self.channel.name(), "Bot started");

        let sweeper = {
            let survey = Arc::clone(&self.survey);
            let period = self.config.survey_session_ttl.min(MAX_SWEEP_INTERVAL);
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(period);
                loop {
                    tick.tick().await;
                    let evicted = survey.evict_expired();
                    if evicted > 0 {
                        tracing::debug!(evicted, "Evicted stale survey sessions");
                    }
                }
            })
        };

        while let Some(event) = events.next().await {
            let bot = Arc::clone(&self);
            tokio::spawn(async move { bot.handle_event(event).await });
        }

        sweeper.abort();
        self.reminders.shutdown();
        tracing::info!(channel = self.channel.name(), "Event stream ended");
        Ok(())
    }

    /// Run `f` against the store on the blocking pool. Store calls read and
    /// rewrite the whole file.
    async fn with_store<T, E, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&UserStore) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<Error> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await?
            .map_err(Into::into)
    }

    /// Like [`with_store`](Self::with_store) for survey calls, which write
    /// the result when a survey completes.
    async fn with_survey<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&SurveyEngine) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let survey = Arc::clone(&self.survey);
        tokio::task::spawn_blocking(move || f(&survey)).await?
    }

    async fn record(&self, user: UserId) -> Result<UserRecord, Error> {
        self.with_store(move |s| Ok::<_, Error>(s.get(user))).await
    }

    /// Handle one event, reporting any failure back to the user.
    pub async fn handle_event(&self, event: IncomingEvent) {
        let user_id = event.user_id();
        let chat_id = event.chat_id();

        let result = match event {
            IncomingEvent::Message(message) => self.handle_message(message).await,
            IncomingEvent::Click(click) => self.handle_click(click).await,
        };

        let Err(e) = result else {
            return;
        };
        if e.is_validation() {
            tracing::debug!(user_id, error = %e, "Rejected request");
        } else {
            tracing::error!(user_id, error = %e, "Request failed");
        }
        if let Err(send_err) = self
            .channel
            .send_text(chat_id, &content::describe_error(&e))
            .await
        {
            tracing::warn!(user_id, error = %send_err, "Failed to report error to user");
        }
    }
}
