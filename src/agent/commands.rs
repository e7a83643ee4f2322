//! Command and button handlers.

use crate::agent::callback::{AnswerPayload, answer_buttons};
use crate::agent::submission::{Submission, SubmissionParser};
use crate::agent::Bot;
use crate::channels::{ButtonClick, ChatId, IncomingMessage, UserId};
use crate::content;
use crate::error::Error;
use crate::history::DiagnosisEntry;
use crate::scheduler::parse_delay_minutes;
use crate::survey::{Outcome, Progress, Question};

impl Bot {
    pub(super) async fn handle_message(&self, message: IncomingMessage) -> Result<(), Error> {
        let submission = SubmissionParser::parse(&message.text);
        tracing::debug!(
            user_id = message.user_id,
            command = submission.kind(),
            "Handling message"
        );

        let chat = message.chat_id;
        let user = message.user_id;

        match submission {
            Submission::Start => {
                let name = self.record(user).await?.name;
                self.channel
                    .send_menu(chat, &content::greeting(name.as_deref()), &content::main_menu())
                    .await?;
            }
            Submission::Help => self.reply(chat, content::HELP_TEXT).await?,
            Submission::SetName { name } => {
                let name = self.with_store(move |s| s.set_name(user, &name)).await?;
                tracing::info!(user_id = user, "Name updated");
                self.reply(chat, &content::name_saved(&name)).await?;
            }
            Submission::Diagnosis => {
                let question = self.survey().begin(user);
                self.ask(chat, user, &question).await?;
            }
            Submission::Cancel => {
                let text = if self.survey().evict(user) {
                    content::SURVEY_CANCELLED
                } else {
                    content::NO_SURVEY
                };
                self.reply(chat, text).await?;
            }
            Submission::History => self.show_history(chat, user).await?,
            Submission::MoodPrompt => self.reply(chat, content::MOOD_PROMPT).await?,
            Submission::Mood { score, text } => {
                match score {
                    Some(score) => {
                        self.with_store(move |s| s.append_mood_scored(user, &text, score))
                            .await?
                    }
                    None => self.with_store(move |s| s.append_mood(user, &text)).await?,
                };
                tracing::info!(user_id = user, scored = score.is_some(), "Mood entry recorded");
                self.reply(chat, content::MOOD_SAVED).await?;
            }
            Submission::FreeText { text } => {
                if self.config.free_text_as_mood {
                    self.with_store(move |s| s.append_mood(user, &text)).await?;
                    tracing::info!(user_id = user, "Free text recorded as mood entry");
                    self.reply(chat, content::MOOD_SAVED).await?;
                } else {
                    self.reply(chat, content::FREE_TEXT_HINT).await?;
                }
            }
            Submission::Reminder { minutes, text } => {
                let delay_secs = parse_delay_minutes(&minutes)?;
                self.reminders()
                    .schedule(chat, delay_secs, content::reminder_message(&text))?;
                self.reply(chat, &content::reminder_set(delay_secs / 60))
                    .await?;
            }
            Submission::ReminderUsage => self.reply(chat, content::REMINDER_USAGE).await?,
            Submission::ReminderInfo => self.reply(chat, content::REMINDER_MENU).await?,
            Submission::Relax => self.reply(chat, content::RELAX_TEXT).await?,
            Submission::Quote => self.reply(chat, content::random_quote()).await?,
            Submission::Goals => self.reply(chat, content::GOALS_TEXT).await?,
            Submission::Faq => self.reply(chat, content::FAQ_TEXT).await?,
            Submission::Emergency => self.reply(chat, content::EMERGENCY_TEXT).await?,
            Submission::Unknown { command } => {
                tracing::debug!(user_id = user, command, "Ignoring unknown command");
            }
        }
        Ok(())
    }

    pub(super) async fn handle_click(&self, click: ButtonClick) -> Result<(), Error> {
        if let Err(e) = self.channel.acknowledge(&click.id).await {
            tracing::debug!(user_id = click.user_id, error = %e, "Failed to acknowledge click");
        }

        let Some(payload) = AnswerPayload::decode(&click.payload) else {
            tracing::debug!(user_id = click.user_id, payload = %click.payload, "Ignoring unknown button");
            return Ok(());
        };
        if payload.user_id != click.user_id {
            tracing::warn!(
                user_id = click.user_id,
                addressed_to = payload.user_id,
                "Ignoring answer button pressed by another user"
            );
            return Ok(());
        }

        let user = click.user_id;
        let progress = self
            .with_survey(move |survey| {
                survey.submit_answer(user, payload.question_index, &payload.label)
            })
            .await?;
        match progress {
            Progress::Next(question) => self.ask(click.chat_id, click.user_id, &question).await?,
            Progress::Completed(outcome) => {
                self.report_outcome(click.chat_id, click.message_id, &outcome)
                    .await?
            }
        }
        Ok(())
    }

    async fn reply(&self, chat: ChatId, text: &str) -> Result<(), Error> {
        self.channel.send_text(chat, text).await?;
        Ok(())
    }

    async fn ask(&self, chat: ChatId, user: UserId, question: &Question) -> Result<(), Error> {
        self.channel
            .send_choices(chat, question.prompt, &answer_buttons(user, question))
            .await?;
        Ok(())
    }

    /// Replace the last question with the result, then send the chart.
    async fn report_outcome(
        &self,
        chat: ChatId,
        message_id: Option<i64>,
        outcome: &Outcome,
    ) -> Result<(), Error> {
        let text = content::survey_result(outcome);
        let edited = match message_id {
            Some(id) => match self.channel.edit_text(chat, id, &text).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(chat_id = chat, error = %e, "Edit failed, sending instead");
                    false
                }
            },
            None => false,
        };
        if !edited {
            self.channel.send_text(chat, &text).await?;
        }

        self.send_chart(chat, &outcome.history).await;
        Ok(())
    }

    async fn show_history(&self, chat: ChatId, user: UserId) -> Result<(), Error> {
        let record = self.record(user).await?;
        if record.history.is_empty() {
            return self.reply(chat, content::NO_HISTORY).await;
        }
        self.reply(chat, &content::history_summary(&record.history))
            .await?;
        self.send_chart(chat, &record.history).await;
        Ok(())
    }

    /// A missing chart is not worth failing the request over.
    async fn send_chart(&self, chat: ChatId, history: &[DiagnosisEntry]) {
        let png = match self.chart.render(history) {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!(chat_id = chat, error = %e, "Failed to render progress chart");
                return;
            }
        };
        if let Err(e) = self
            .channel
            .send_photo(chat, png, Some(&content::progress_caption(history)))
            .await
        {
            tracing::warn!(chat_id = chat, error = %e, "Failed to send progress chart");
        }
    }
}
